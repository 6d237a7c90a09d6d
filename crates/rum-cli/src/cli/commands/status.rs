//! `rum status` – show status of all sessions.

use anyhow::Result;
use rum_core::session_db::SessionDb;

pub async fn run_status(db: &SessionDb) -> Result<()> {
    let sessions = db.list_sessions().await?;
    if sessions.is_empty() {
        println!("No upload sessions.");
        return Ok(());
    }

    println!(
        "{:<6} {:<10} {:>7} {:>12} {}",
        "ID", "STATE", "DONE", "SIZE", "NAME"
    );
    for s in sessions {
        let percent = if s.file_size > 0 {
            (s.confirmed_offset as f64 / s.file_size as f64 * 100.0).min(100.0)
        } else {
            100.0
        };
        println!(
            "{:<6} {:<10} {:>6.1}% {:>12} {}",
            s.id,
            format!("{:?}", s.state).to_lowercase(),
            percent,
            s.file_size,
            s.file_name
        );
        if let Some(result_id) = &s.result_id {
            println!("       episode ready: {result_id}");
        }
        if let Some(err) = &s.processing_error {
            println!("       post-processing failed: {err}");
        }
        if let Some(msg) = &s.error_message {
            println!("       {msg}");
        }
    }
    Ok(())
}
