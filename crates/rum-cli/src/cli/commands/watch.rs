//! `rum watch <id>` – follow a session's post-processing channel.
//!
//! Byte transfer completing and the episode being ready are different
//! moments; this command bridges the gap, recording the terminal outcome
//! (episode id or post-processing failure) on the session.

use anyhow::Result;
use rum_core::config::UploadConfig;
use rum_core::events::{self, FollowOutcome, ServerEvent};
use rum_core::progress::{ProgressMerger, ProgressStats, PushedProgress};
use rum_core::protocol::Auth;
use rum_core::session_db::{SessionDb, SessionState};

pub async fn run_watch(db: &SessionDb, cfg: &UploadConfig, id: i64) -> Result<()> {
    let Some(record) = db.get_session(id).await? else {
        println!("No session {id}.");
        return Ok(());
    };
    if record.state != SessionState::Completed {
        println!(
            "Session {id} is {}; watch applies once byte transfer is complete.",
            format!("{:?}", record.state).to_lowercase()
        );
        return Ok(());
    }
    if let Some(result_id) = &record.result_id {
        println!("Session {id} already has its episode: {result_id}");
        return Ok(());
    }
    let Some(remote_url) = record.remote_url.clone() else {
        println!("Session {id} has no remote session to watch.");
        return Ok(());
    };

    let auth = Auth::from_env(&cfg.auth_token_env);
    let events_url = events::events_url_for(&remote_url);
    // Bytes are fully transferred; the server's pushes are the live source
    // and the local stats are the fallback between (or before) pushes.
    let local = ProgressStats {
        bytes_sent: record.confirmed_offset as u64,
        total_bytes: record.file_size as u64,
        elapsed_secs: 0.0,
    };
    let followed = tokio::task::spawn_blocking(move || {
        let mut merger = ProgressMerger::new();
        events::follow_events(&events_url, &auth, |event| {
            if let ServerEvent::Progress {
                seq,
                percentage,
                speed,
                eta_secs,
            } = event
            {
                merger.accept_push(PushedProgress {
                    seq: *seq,
                    percentage: *percentage,
                    bytes_per_sec: *speed,
                    eta_secs: *eta_secs,
                });
                let display = merger.display(&local);
                match display.bytes_per_sec {
                    Some(rate) => println!(
                        "  processing {:.0}% ({:.2} MiB/s)",
                        display.percent,
                        rate / 1_048_576.0
                    ),
                    None => println!("  processing {:.0}%", display.percent),
                }
            }
        })
    })
    .await?;

    match followed {
        Ok(FollowOutcome::Terminal(event)) => {
            events::apply_terminal_event(db, id, &event).await?;
            match event {
                ServerEvent::Completed { result_id, .. } => {
                    println!("Episode ready: {result_id}");
                }
                ServerEvent::Failed { error, .. } => {
                    println!("Post-processing failed: {error}");
                }
                ServerEvent::Progress { .. } => {}
            }
        }
        Ok(FollowOutcome::Disconnected) => {
            println!("Event stream ended without an outcome; try again later.");
        }
        Err(e) => {
            println!("Event stream unavailable: {e}");
        }
    }
    Ok(())
}
