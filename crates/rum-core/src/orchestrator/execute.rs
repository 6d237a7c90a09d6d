//! Execute the transfer phase of one session: source, chunk loop, durable
//! progress mirroring, stats for the UI.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use crate::progress::ProgressStats;
use crate::protocol::Auth;
use crate::retry::RetryPolicy;
use crate::session_db::{SessionDb, SessionId};
use crate::source::SourceFile;
use crate::uploader::{self, UploadOutcome, UploadSummary};

use super::SessionProgress;

/// Runs the chunk loop in a blocking task while a progress worker mirrors
/// every confirmed offset to the store (durable progress for crash recovery)
/// and forwards rate/ETA stats to the caller.
#[allow(clippy::too_many_arguments)]
pub(super) async fn execute_transfer_phase(
    db: &SessionDb,
    session_id: SessionId,
    source_path: &Path,
    total_bytes: u64,
    session_url: &str,
    auth: &Auth,
    chunk_size: u64,
    start_offset: u64,
    policy: RetryPolicy,
    abort: Arc<AtomicBool>,
    progress_tx: Option<&tokio::sync::mpsc::Sender<SessionProgress>>,
) -> Result<UploadOutcome> {
    let mut source = SourceFile::open(source_path)
        .with_context(|| format!("open source {}", source_path.display()))?;

    let (offset_tx, mut offset_rx) = tokio::sync::mpsc::channel::<u64>(8);
    let db_clone = db.clone();
    let stats_tx = progress_tx.cloned();
    let transfer_start = Instant::now();
    let progress_handle = tokio::spawn(async move {
        while let Some(offset) = offset_rx.recv().await {
            if db_clone.advance_offset(session_id, offset as i64).await.is_err() {
                tracing::warn!(session_id, "durable progress update failed");
            }
            if let Some(ref tx) = stats_tx {
                let stats = ProgressStats {
                    bytes_sent: offset,
                    total_bytes,
                    elapsed_secs: transfer_start.elapsed().as_secs_f64(),
                };
                let _ = tx.try_send(SessionProgress { session_id, stats });
            }
        }
    });

    let (outcome, summary) = {
        let session_url = session_url.to_string();
        let auth = auth.clone();
        let abort = Arc::clone(&abort);
        let tx = offset_tx.clone();
        tokio::task::spawn_blocking(move || -> (UploadOutcome, UploadSummary) {
            let mut summary = UploadSummary::default();
            let outcome = uploader::run_upload(
                &session_url,
                &auth,
                &mut source,
                chunk_size,
                start_offset,
                &policy,
                &abort,
                Some(&tx),
                &mut summary,
            );
            (outcome, summary)
        })
        .await
        .context("upload task join")?
    };

    drop(offset_tx);
    progress_handle.await.context("progress worker join")?;

    tracing::debug!(
        session_id,
        chunks = summary.chunks_sent,
        bytes = summary.bytes_sent,
        retries = summary.retries,
        "transfer phase finished"
    );

    Ok(outcome)
}
