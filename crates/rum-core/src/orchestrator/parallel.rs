//! Run queued sessions concurrently.
//!
//! Keeps up to `max_concurrent_uploads` sessions in flight; when one
//! finishes, the next queued session is claimed until the queue is empty.
//! Sessions are independent: one failing, pausing, or being rejected never
//! stops the others.

use anyhow::Result;
use std::sync::Arc;

use crate::config::UploadConfig;
use crate::control::UploadControl;
use crate::session_db::SessionDb;

use super::run::run_one_session;
use super::{SessionProgress, SessionRunOutcome};

/// Process queued sessions with bounded concurrency. Returns how many
/// sessions were run (to any resting state).
pub async fn run_sessions_parallel(
    db: &SessionDb,
    cfg: &UploadConfig,
    control: Arc<UploadControl>,
    progress_tx: Option<tokio::sync::mpsc::Sender<SessionProgress>>,
) -> Result<u32> {
    let max_concurrent = cfg.max_concurrent_uploads.max(1);

    let mut run_count = 0u32;
    let mut join_set = tokio::task::JoinSet::new();

    loop {
        while join_set.len() < max_concurrent {
            let Some(session_id) = db.claim_next_queued().await? else {
                break;
            };
            let db = db.clone();
            let cfg = cfg.clone();
            let control = Arc::clone(&control);
            let tx = progress_tx.clone();
            join_set.spawn(async move {
                let res = run_one_session(&db, session_id, &cfg, &control, tx.as_ref()).await;
                (session_id, res)
            });
        }

        if join_set.is_empty() {
            break;
        }

        let Some(joined) = join_set.join_next().await else {
            break;
        };
        let (session_id, res) = joined.map_err(|e| anyhow::anyhow!("session task join: {}", e))?;
        run_count += 1;
        match res {
            Ok(SessionRunOutcome::Completed { session_id }) => {
                tracing::info!(session_id, "session completed");
            }
            Ok(SessionRunOutcome::Paused { session_id, reason }) => {
                tracing::info!(session_id, %reason, "session paused");
            }
            Ok(SessionRunOutcome::Errored { session_id, reason }) => {
                tracing::warn!(session_id, %reason, "session failed");
            }
            Ok(SessionRunOutcome::Rejected { session_id, reason }) => {
                tracing::warn!(session_id, %reason, "session rejected");
            }
            Ok(SessionRunOutcome::AlreadyActive { session_id }) => {
                tracing::warn!(session_id, "session already active; skipped");
            }
            Err(e) => {
                tracing::error!(session_id, "session run error: {e:#}");
            }
        }
    }

    Ok(run_count)
}
