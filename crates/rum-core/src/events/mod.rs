//! Out-of-band progress channel.
//!
//! After (and during) byte transfer the server pushes post-processing status
//! as newline-delimited JSON on a per-session event stream: progress pushes,
//! then a single terminal `completed` (with the playable entity id) or
//! `failed` event. Byte completion and entity readiness are distinct; a
//! byte-complete session can still fail post-processing, and that failure
//! must reach the user.

mod follow;
mod parse;

pub use follow::{follow_events, FollowOutcome};
pub use parse::parse_event;

use serde::{Deserialize, Serialize};

use crate::session_db::{SessionDb, SessionId};

/// One event received on the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServerEvent {
    Progress {
        seq: u64,
        percentage: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        speed: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        eta_secs: Option<f64>,
    },
    Completed {
        seq: u64,
        result_id: String,
    },
    Failed {
        seq: u64,
        error: String,
    },
}

impl ServerEvent {
    pub fn seq(&self) -> u64 {
        match self {
            ServerEvent::Progress { seq, .. }
            | ServerEvent::Completed { seq, .. }
            | ServerEvent::Failed { seq, .. } => *seq,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ServerEvent::Completed { .. } | ServerEvent::Failed { .. })
    }
}

/// Drops events that are not strictly newer than the last accepted one
/// (freshness ordering for the push channel).
#[derive(Debug, Default)]
pub struct EventFilter {
    last_seq: Option<u64>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&mut self, event: &ServerEvent) -> bool {
        let seq = event.seq();
        if let Some(last) = self.last_seq {
            if seq <= last {
                return false;
            }
        }
        self.last_seq = Some(seq);
        true
    }
}

/// Event stream URL for a remote session.
pub fn events_url_for(session_url: &str) -> String {
    format!("{}/events", session_url.trim_end_matches('/'))
}

/// Record a terminal event on the session row: `completed` sets the playable
/// entity id, `failed` the post-processing error. Progress events are a no-op.
pub async fn apply_terminal_event(
    db: &SessionDb,
    session_id: SessionId,
    event: &ServerEvent,
) -> anyhow::Result<()> {
    match event {
        ServerEvent::Completed { result_id, .. } => {
            db.set_result(session_id, result_id).await?;
            tracing::info!(session_id, %result_id, "post-processing completed");
        }
        ServerEvent::Failed { error, .. } => {
            db.set_processing_error(session_id, error).await?;
            tracing::warn!(session_id, %error, "post-processing failed");
        }
        ServerEvent::Progress { .. } => {}
    }
    Ok(())
}
