//! Session orchestrator.
//!
//! Coordinates upload sessions end-to-end: source validation and identity
//! checks, remote-session open/probe with reconciliation, the transfer
//! phase with durable progress mirroring, and the mapping from transfer
//! outcomes to store states. Multiple sessions run concurrently, each owned
//! exclusively by one transfer at a time.

mod cancel;
mod execute;
mod parallel;
mod run;

pub use cancel::cancel_session;
pub use parallel::run_sessions_parallel;
pub use run::{run_next_session, run_one_session, SessionRunOutcome};

use crate::progress::ProgressStats;
use crate::session_db::SessionId;

/// Progress sample forwarded to the UI layer, tagged with its session.
#[derive(Debug, Clone)]
pub struct SessionProgress {
    pub session_id: SessionId,
    pub stats: ProgressStats,
}
