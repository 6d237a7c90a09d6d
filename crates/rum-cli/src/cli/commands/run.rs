//! `rum run` – process queued sessions.

use anyhow::Result;
use rum_core::config::UploadConfig;
use rum_core::control::UploadControl;
use rum_core::events::{self, FollowOutcome};
use rum_core::orchestrator::{self, SessionProgress};
use rum_core::progress::RateWindow;
use rum_core::protocol::Auth;
use rum_core::session_db::{SessionDb, SessionState};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::cli::control_socket;

pub async fn run_uploads(
    db: &SessionDb,
    cfg: &UploadConfig,
    jobs: Option<usize>,
    watch: bool,
) -> Result<()> {
    // Sessions a crashed run left in `uploading` come back as `paused`; the
    // user decides whether to resume them.
    let recovered = db.rehydrate_interrupted().await?;
    if recovered > 0 {
        tracing::info!("rehydrated {} interrupted session(s) as paused", recovered);
        println!("Rehydrated {recovered} interrupted session(s) as paused; use `rum resume <id>`.");
    }

    let control = Arc::new(UploadControl::new());
    if let Ok(socket_path) = rum_core::control::default_control_socket_path() {
        if control_socket::spawn_control_listener(Arc::clone(&control), &socket_path).is_ok() {
            tracing::debug!(path = %socket_path.display(), "control socket listening");
        }
    }

    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel::<SessionProgress>(16);
    const PROGRESS_INTERVAL_MS: u64 = 500;
    let progress_handle = tokio::spawn(async move {
        let mut last_print = Instant::now();
        // Per-session rolling windows so the displayed rate doesn't jump
        // around with individual chunk round-trips.
        let mut windows: HashMap<i64, RateWindow> = HashMap::new();
        while let Some(p) = progress_rx.recv().await {
            let window = windows.entry(p.session_id).or_default();
            window.record(p.stats.bytes_sent);

            let now = Instant::now();
            if now.duration_since(last_print).as_millis() as u64 >= PROGRESS_INTERVAL_MS
                || p.stats.bytes_sent >= p.stats.total_bytes
            {
                let sent_mib = p.stats.bytes_sent as f64 / 1_048_576.0;
                let total_mib = p.stats.total_bytes as f64 / 1_048_576.0;
                let rate = window.rate().unwrap_or_else(|| p.stats.bytes_per_sec());
                let eta = p
                    .stats
                    .eta_secs()
                    .map(|s| format!("{:.0}s", s))
                    .unwrap_or_else(|| "?".to_string());
                println!(
                    "  [{}] {:.1} / {:.1} MiB ({:.1}%)  {:.2} MiB/s  ETA {}",
                    p.session_id,
                    sent_mib,
                    total_mib,
                    p.stats.percent(),
                    rate / 1_048_576.0,
                    eta
                );
                last_print = now;
            }
        }
    });

    let mut run_cfg = cfg.clone();
    if let Some(jobs) = jobs {
        run_cfg.max_concurrent_uploads = jobs.max(1);
    }
    let run_count = if run_cfg.max_concurrent_uploads > 1 {
        orchestrator::run_sessions_parallel(db, &run_cfg, Arc::clone(&control), Some(progress_tx))
            .await?
    } else {
        let mut run_count = 0u32;
        while orchestrator::run_next_session(db, &run_cfg, &control, Some(&progress_tx))
            .await?
            .is_some()
        {
            run_count += 1;
        }
        drop(progress_tx);
        run_count
    };

    let _ = progress_handle.await;

    if run_count == 0 {
        println!("No queued sessions.");
        return Ok(());
    }
    tracing::info!("run processed {} session(s)", run_count);

    if watch {
        follow_post_processing(db, cfg).await?;
    }
    Ok(())
}

/// Follow the post-processing channel for byte-complete sessions that have
/// no recorded outcome yet.
async fn follow_post_processing(db: &SessionDb, cfg: &UploadConfig) -> Result<()> {
    let auth = Auth::from_env(&cfg.auth_token_env);
    let pending: Vec<i64> = db
        .list_sessions()
        .await?
        .into_iter()
        .filter(|s| {
            s.state == SessionState::Completed
                && s.result_id.is_none()
                && s.processing_error.is_none()
        })
        .map(|s| s.id)
        .collect();

    for id in pending {
        let Some(record) = db.get_session(id).await? else {
            continue;
        };
        let Some(remote_url) = record.remote_url else {
            continue;
        };
        let events_url = events::events_url_for(&remote_url);
        println!("Waiting for post-processing of session {id}...");
        let auth = auth.clone();
        let followed = tokio::task::spawn_blocking(move || {
            events::follow_events(&events_url, &auth, |event| {
                if let events::ServerEvent::Progress { percentage, .. } = event {
                    println!("  [{}] processing {:.0}%", id, percentage);
                }
            })
        })
        .await?;

        match followed {
            Ok(FollowOutcome::Terminal(event)) => {
                events::apply_terminal_event(db, id, &event).await?;
                match event {
                    events::ServerEvent::Completed { result_id, .. } => {
                        println!("  [{id}] ready: episode {result_id}");
                    }
                    events::ServerEvent::Failed { error, .. } => {
                        println!("  [{id}] post-processing failed: {error}");
                    }
                    events::ServerEvent::Progress { .. } => {}
                }
            }
            Ok(FollowOutcome::Disconnected) => {
                println!("  [{id}] event stream ended without an outcome; try `rum watch {id}`");
            }
            Err(e) => {
                tracing::warn!(session_id = id, "event stream error: {e}");
                println!("  [{id}] event stream unavailable: {e}");
            }
        }
    }
    Ok(())
}
