//! Progress reporting for uploads (bytes sent, rate, ETA).
//!
//! Rate is measured since the session (re)started so pre-pause time never
//! skews it. `RateWindow` smooths per-chunk jitter; `ProgressMerger` arbitrates
//! between locally estimated progress and server-pushed progress.

mod push;
mod window;

pub use push::{DisplayProgress, ProgressMerger, ProgressSource, PushedProgress};
pub use window::RateWindow;

/// Snapshot of upload progress for one session.
#[derive(Debug, Clone)]
pub struct ProgressStats {
    /// Bytes the server has acknowledged.
    pub bytes_sent: u64,
    /// Total file size in bytes.
    pub total_bytes: u64,
    /// Elapsed time since the session (re)started (seconds).
    pub elapsed_secs: f64,
}

impl ProgressStats {
    /// Upload rate in bytes per second (0 if elapsed is 0).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_sent as f64 / self.elapsed_secs
    }

    /// Estimated seconds remaining (None if rate is 0 and bytes remain).
    pub fn eta_secs(&self) -> Option<f64> {
        let remaining = self.total_bytes.saturating_sub(self.bytes_sent);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    /// Fraction complete in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        (self.bytes_sent as f64 / self.total_bytes as f64).min(1.0)
    }

    /// Percent complete in [0.0, 100.0].
    pub fn percent(&self) -> f64 {
        self.fraction() * 100.0
    }
}
