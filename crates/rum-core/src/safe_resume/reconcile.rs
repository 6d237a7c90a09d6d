//! Reconcile the locally stored remote session with the one the server honors.
//!
//! A resume attempt can land on a brand-new remote session (the old one
//! expired server-side). That is not an error: the old local record is
//! retired and a replacement bound to the new session takes its place, in
//! one store transaction, so exactly one record tracks the logical upload.

use anyhow::Result;

use crate::session_db::{SessionDb, SessionId, SessionRecord};

/// Outcome of comparing the stored session URL with the active one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    /// The server still honors the stored session.
    Unchanged(SessionId),
    /// The server forked; the old record was retired and replaced.
    Superseded { old_id: SessionId, new_id: SessionId },
}

impl Reconciled {
    pub fn session_id(&self) -> SessionId {
        match self {
            Reconciled::Unchanged(id) => *id,
            Reconciled::Superseded { new_id, .. } => *new_id,
        }
    }
}

/// Compare `active_url` (the session the server actually honors, with
/// `server_offset` bytes confirmed) against the record's stored URL and
/// fork the local record if they differ.
pub async fn reconcile_remote_session(
    db: &SessionDb,
    record: &SessionRecord,
    active_url: &str,
    server_offset: u64,
) -> Result<Reconciled> {
    if record.remote_url.as_deref() == Some(active_url) {
        return Ok(Reconciled::Unchanged(record.id));
    }

    let new_id = db
        .supersede_session(record.id, active_url, server_offset as i64)
        .await?;
    tracing::info!(
        old_id = record.id,
        new_id,
        active_url,
        server_offset,
        "remote session superseded; local record forked"
    );
    Ok(Reconciled::Superseded {
        old_id: record.id,
        new_id,
    })
}
