//! Cancel a session: abort any active transfer, optionally delete the
//! remote session, remove the local record.

use anyhow::Result;

use crate::control::UploadControl;
use crate::protocol::{self, Auth};
use crate::session_db::{SessionDb, SessionId};

/// Cancels and removes a session. When `delete_remote` is set, the remote
/// session is terminated best-effort: a failed DELETE is logged and the
/// local removal proceeds regardless. Returns false if no such session.
pub async fn cancel_session(
    db: &SessionDb,
    session_id: SessionId,
    control: &UploadControl,
    delete_remote: bool,
    auth: &Auth,
) -> Result<bool> {
    let Some(record) = db.get_session(session_id).await? else {
        return Ok(false);
    };

    if control.request_abort(session_id) {
        tracing::debug!(session_id, "abort requested for active transfer");
    }

    if delete_remote {
        if let Some(url) = record.remote_url.clone() {
            let auth = auth.clone();
            let res = tokio::task::spawn_blocking(move || {
                protocol::terminate_session(&url, &auth)
            })
            .await;
            match res {
                Ok(Ok(())) => tracing::debug!(session_id, "remote session deleted"),
                Ok(Err(e)) => {
                    tracing::warn!(session_id, "remote session delete failed (ignored): {e}")
                }
                Err(e) => tracing::warn!(session_id, "remote delete task join: {e}"),
            }
        }
    }

    db.remove_session(session_id).await?;
    tracing::info!(session_id, "session cancelled and removed");
    Ok(true)
}
