//! Transfer lifecycle as an explicit state machine.
//!
//! `Opening → Transferring → {Paused, Completed, Errored}`, driven by
//! discrete events (session opened, chunk acked, abort, retries exhausted,
//! terminal response). Terminal phases absorb all further events.

/// Where a transfer is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Opening or re-attaching to the remote session.
    Opening,
    /// Sending chunks sequentially.
    Transferring,
    /// Recoverable stop: abort requested or retries exhausted. Resumable.
    Paused,
    /// All bytes acknowledged by the server.
    Completed,
    /// Terminal failure: no valid remote session remains.
    Errored,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Paused | Phase::Completed | Phase::Errored)
    }
}

/// Discrete transfer events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    SessionOpened,
    ChunkAcked,
    AllBytesAcked,
    AbortRequested,
    RetriesExhausted,
    TerminalFailure,
}

/// Apply one event to a phase, yielding the next phase.
pub fn apply(phase: Phase, event: Event) -> Phase {
    match (phase, event) {
        (Phase::Opening, Event::SessionOpened) => Phase::Transferring,
        (Phase::Opening, Event::AbortRequested) => Phase::Paused,
        (Phase::Opening, Event::RetriesExhausted) => Phase::Paused,
        (Phase::Opening, Event::TerminalFailure) => Phase::Errored,

        (Phase::Transferring, Event::ChunkAcked) => Phase::Transferring,
        (Phase::Transferring, Event::AllBytesAcked) => Phase::Completed,
        (Phase::Transferring, Event::AbortRequested) => Phase::Paused,
        (Phase::Transferring, Event::RetriesExhausted) => Phase::Paused,
        (Phase::Transferring, Event::TerminalFailure) => Phase::Errored,

        // Terminal phases absorb everything; other combinations are no-ops.
        (current, _) => current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path() {
        let mut phase = Phase::Opening;
        phase = apply(phase, Event::SessionOpened);
        assert_eq!(phase, Phase::Transferring);
        phase = apply(phase, Event::ChunkAcked);
        phase = apply(phase, Event::ChunkAcked);
        assert_eq!(phase, Phase::Transferring);
        phase = apply(phase, Event::AllBytesAcked);
        assert_eq!(phase, Phase::Completed);
    }

    #[test]
    fn abort_pauses_from_either_active_phase() {
        assert_eq!(apply(Phase::Opening, Event::AbortRequested), Phase::Paused);
        assert_eq!(
            apply(Phase::Transferring, Event::AbortRequested),
            Phase::Paused
        );
    }

    #[test]
    fn retries_exhausted_is_recoverable() {
        assert_eq!(
            apply(Phase::Transferring, Event::RetriesExhausted),
            Phase::Paused
        );
        assert!(Phase::Paused.is_terminal());
    }

    #[test]
    fn terminal_failure_errors() {
        assert_eq!(apply(Phase::Opening, Event::TerminalFailure), Phase::Errored);
        assert_eq!(
            apply(Phase::Transferring, Event::TerminalFailure),
            Phase::Errored
        );
    }

    #[test]
    fn terminal_phases_absorb_events() {
        for phase in [Phase::Paused, Phase::Completed, Phase::Errored] {
            for event in [
                Event::SessionOpened,
                Event::ChunkAcked,
                Event::AllBytesAcked,
                Event::AbortRequested,
                Event::RetriesExhausted,
                Event::TerminalFailure,
            ] {
                assert_eq!(apply(phase, event), phase);
            }
        }
    }

    #[test]
    fn chunk_ack_only_counts_while_transferring() {
        assert_eq!(apply(Phase::Opening, Event::ChunkAcked), Phase::Opening);
    }
}
