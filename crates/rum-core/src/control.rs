//! Transfer control for pause/cancel: shared abort tokens and exclusive
//! ownership of active sessions.
//!
//! Each running transfer registers its session id for an abort token; a
//! control client (e.g. `rum pause 3` via socket) can request abort, and the
//! upload loop checks the token between chunks and during backoff.
//! Registration is exclusive: a second transfer (or concurrent resume
//! attempt) for the same id is refused rather than racing the first.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Error returned when a session id is already owned by an active transfer.
#[derive(Debug)]
pub struct AlreadyActive(pub i64);

impl std::fmt::Display for AlreadyActive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session {} already has an active transfer", self.0)
    }
}

impl std::error::Error for AlreadyActive {}

/// Shared registry of session id -> abort token.
#[derive(Default)]
pub struct UploadControl {
    active: RwLock<HashMap<i64, Arc<AtomicBool>>>,
}

impl UploadControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session as actively transferring; returns the abort token
    /// to pass into the upload loop, or `AlreadyActive` if another transfer
    /// already owns this id.
    pub fn register(&self, session_id: i64) -> Result<Arc<AtomicBool>, AlreadyActive> {
        let mut active = self.active.write().unwrap();
        match active.entry(session_id) {
            Entry::Occupied(_) => Err(AlreadyActive(session_id)),
            Entry::Vacant(slot) => {
                let token = Arc::new(AtomicBool::new(false));
                slot.insert(Arc::clone(&token));
                Ok(token)
            }
        }
    }

    /// Unregister a session (call when the transfer finishes, success or failure).
    pub fn unregister(&self, session_id: i64) {
        self.active.write().unwrap().remove(&session_id);
    }

    /// Move an active registration to a new id, keeping the same abort token
    /// (used when reconciliation forks the session record mid-transfer).
    pub fn rebind(&self, old_id: i64, new_id: i64) -> Result<(), AlreadyActive> {
        let mut active = self.active.write().unwrap();
        if active.contains_key(&new_id) {
            return Err(AlreadyActive(new_id));
        }
        if let Some(token) = active.remove(&old_id) {
            active.insert(new_id, token);
        }
        Ok(())
    }

    /// Request abort for a session. Returns true if it had an active transfer.
    pub fn request_abort(&self, session_id: i64) -> bool {
        match self.active.read().unwrap().get(&session_id) {
            Some(token) => {
                token.store(true, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self, session_id: i64) -> bool {
        self.active.read().unwrap().contains_key(&session_id)
    }
}

/// Default path for the control socket (same XDG state dir as the DB).
pub fn default_control_socket_path() -> std::io::Result<PathBuf> {
    let dir = xdg::BaseDirectories::with_prefix("rum")?.get_state_home();
    Ok(dir.join("control.sock"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_exclusive() {
        let control = UploadControl::new();
        let _token = control.register(1).unwrap();
        assert!(control.is_active(1));
        assert!(control.register(1).is_err());
        control.unregister(1);
        assert!(!control.is_active(1));
        assert!(control.register(1).is_ok());
    }

    #[test]
    fn abort_sets_the_token() {
        let control = UploadControl::new();
        let token = control.register(7).unwrap();
        assert!(!token.load(Ordering::Relaxed));
        assert!(control.request_abort(7));
        assert!(token.load(Ordering::Relaxed));
    }

    #[test]
    fn abort_on_inactive_session_is_noop() {
        let control = UploadControl::new();
        assert!(!control.request_abort(99));
    }

    #[test]
    fn rebind_moves_the_same_token() {
        let control = UploadControl::new();
        let token = control.register(1).unwrap();
        control.rebind(1, 2).unwrap();
        assert!(!control.is_active(1));
        assert!(control.is_active(2));
        assert!(control.request_abort(2));
        assert!(token.load(Ordering::Relaxed));
    }
}
