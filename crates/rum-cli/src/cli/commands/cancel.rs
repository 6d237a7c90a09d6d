//! `rum cancel <id>` – abort and remove a session; deletes the remote
//! partial data unless --keep-remote is given.

use anyhow::Result;
use rum_core::config::UploadConfig;
use rum_core::control::UploadControl;
use rum_core::orchestrator;
use rum_core::protocol::Auth;
use rum_core::session_db::SessionDb;

use crate::cli::control_socket;

pub async fn run_cancel(db: &SessionDb, cfg: &UploadConfig, id: i64, keep_remote: bool) -> Result<()> {
    // Signal a running `rum run` in another process to drop the transfer.
    if let Ok(path) = rum_core::control::default_control_socket_path() {
        let _ = control_socket::send_cancel(&path, id).await;
    }

    let auth = Auth::from_env(&cfg.auth_token_env);
    let control = UploadControl::new();
    let removed =
        orchestrator::cancel_session(db, id, &control, !keep_remote, &auth).await?;
    if removed {
        println!("Cancelled session {id}");
    } else {
        println!("No session {id}.");
    }
    Ok(())
}
