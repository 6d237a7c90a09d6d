//! Core chunked upload engine.
//!
//! Sends the source file to a remote session in fixed-size chunks,
//! strictly sequentially: chunk N+1 only goes out after the server has
//! acknowledged chunk N (the protocol tracks a single monotonic offset per
//! session). Each chunk is retried with bounded backoff; the abort token is
//! honored between chunks and mid-backoff. Every failure is folded into an
//! `UploadOutcome` here; raw transport errors never reach callers.

mod phase;
mod run;

pub use phase::{apply, Event, Phase};
pub use run::run_upload;

/// How a transfer run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    /// All bytes acknowledged. Server-side post-processing may still be pending.
    Completed,
    /// Recoverable stop (abort, or retries exhausted on a retryable failure).
    /// The remote session is intact; the transfer can resume from the
    /// confirmed offset.
    Paused { reason: String },
    /// Terminal failure; no resume path remains.
    Errored { reason: String },
}

/// Counters from one transfer run, for logging and adaptive tuning.
#[derive(Debug, Clone, Default)]
pub struct UploadSummary {
    /// Chunks the server acknowledged during this run.
    pub chunks_sent: u32,
    /// Bytes pushed over the wire during this run (excluding retries).
    pub bytes_sent: u64,
    /// Extra attempts beyond the first, summed over all chunks.
    pub retries: u32,
}
