//! `rum pause <id>` – pause a session. If `rum run` is active, signals it to
//! abort the in-flight chunk promptly.

use anyhow::Result;
use rum_core::session_db::{SessionDb, SessionState};

use crate::cli::control_socket;

pub async fn run_pause(db: &SessionDb, id: i64) -> Result<()> {
    let Some(record) = db.get_session(id).await? else {
        println!("No session {id}.");
        return Ok(());
    };
    match record.state {
        SessionState::Queued | SessionState::Uploading => {
            if let Ok(path) = rum_core::control::default_control_socket_path() {
                let _ = control_socket::send_pause(&path, id).await;
            }
            db.set_error_state(id, SessionState::Paused, "paused by user")
                .await?;
            println!("Paused session {id}");
        }
        state => println!(
            "Session {id} is {}; nothing to pause.",
            format!("{state:?}").to_lowercase()
        ),
    }
    Ok(())
}
