//! Control socket: server (during `rum run`) and client (for `rum pause`/`rum cancel`).
//! Protocol: one line per command: "pause <id>" or "cancel <id>".

use anyhow::Result;
use rum_core::control::UploadControl;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UnixListener;

/// Spawns a task that listens on `path` and calls `control.request_abort(id)`
/// for each "pause <id>" or "cancel <id>" line. Ignores malformed lines.
pub fn spawn_control_listener(
    control: Arc<UploadControl>,
    path: impl AsRef<Path>,
) -> Result<tokio::task::JoinHandle<()>> {
    let path = path.as_ref().to_path_buf();
    let handle = tokio::spawn(async move {
        let _ = std::fs::remove_file(&path);
        let listener = match UnixListener::bind(&path) {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!(path = %path.display(), "control socket bind: {}", e);
                return;
            }
        };
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let control = Arc::clone(&control);
                    tokio::spawn(async move {
                        let mut reader = BufReader::new(stream).lines();
                        while let Ok(Some(line)) = reader.next_line().await {
                            let line = line.trim();
                            if let Some(rest) = line.strip_prefix("pause ") {
                                if let Ok(id) = rest.trim().parse::<i64>() {
                                    control.request_abort(id);
                                }
                            } else if let Some(rest) = line.strip_prefix("cancel ") {
                                if let Ok(id) = rest.trim().parse::<i64>() {
                                    control.request_abort(id);
                                }
                            }
                        }
                    });
                }
                Err(e) => tracing::debug!("control socket accept: {}", e),
            }
        }
    });
    Ok(handle)
}

/// Sends "pause <id>\n" to the control socket. No-op if the path does not exist.
pub async fn send_pause(socket_path: &Path, session_id: i64) -> Result<()> {
    send_line(socket_path, &format!("pause {}\n", session_id)).await
}

/// Sends "cancel <id>\n" to the control socket. No-op if the path does not exist.
pub async fn send_cancel(socket_path: &Path, session_id: i64) -> Result<()> {
    send_line(socket_path, &format!("cancel {}\n", session_id)).await
}

async fn send_line(socket_path: &Path, line: &str) -> Result<()> {
    if !socket_path.exists() {
        return Ok(());
    }
    let mut stream = tokio::net::UnixStream::connect(socket_path).await?;
    tokio::io::AsyncWriteExt::write_all(&mut stream, line.as_bytes()).await?;
    Ok(())
}
