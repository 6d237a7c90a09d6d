//! Retry loop: run a request until success, abort, or the policy says stop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::classify;
use super::error::TransferError;
use super::policy::{RetryDecision, RetryPolicy};

/// Runs a request closure until it succeeds or the retry policy says to stop.
/// On retryable failure, sleeps for the backoff duration then tries again.
///
/// The abort token is checked before every attempt and during backoff sleeps
/// so pause/cancel takes effect promptly even mid-backoff; an abort surfaces
/// as `TransferError::Aborted`.
pub fn run_with_retry<T, F>(
    policy: &RetryPolicy,
    abort: &AtomicBool,
    mut f: F,
) -> Result<T, TransferError>
where
    F: FnMut() -> Result<T, TransferError>,
{
    let mut attempt = 1u32;
    loop {
        if abort.load(Ordering::Relaxed) {
            return Err(TransferError::Aborted);
        }
        match f() {
            Ok(v) => return Ok(v),
            Err(TransferError::Aborted) => return Err(TransferError::Aborted),
            Err(e) => {
                let kind = classify::classify(&e);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(d) => {
                        tracing::debug!(attempt, kind = ?kind, delay_ms = d.as_millis() as u64, "retrying after backoff");
                        if sleep_interruptible(d, abort) {
                            return Err(TransferError::Aborted);
                        }
                        attempt += 1;
                    }
                }
            }
        }
    }
}

/// Sleep in short slices, returning true if the abort token was set.
fn sleep_interruptible(total: Duration, abort: &AtomicBool) -> bool {
    const SLICE: Duration = Duration::from_millis(100);
    let mut remaining = total;
    while remaining > Duration::ZERO {
        if abort.load(Ordering::Relaxed) {
            return true;
        }
        let step = remaining.min(SLICE);
        std::thread::sleep(step);
        remaining = remaining.saturating_sub(step);
    }
    abort.load(Ordering::Relaxed)
}
