//! Rolling rate window over cumulative byte samples.

use std::collections::VecDeque;
use std::time::Instant;

const DEFAULT_CAPACITY: usize = 8;

/// Smooths per-chunk rate jitter by measuring over the last N samples
/// instead of a single chunk interval.
#[derive(Debug)]
pub struct RateWindow {
    samples: VecDeque<(Instant, u64)>,
    capacity: usize,
}

impl Default for RateWindow {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl RateWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.max(2)),
            capacity: capacity.max(2),
        }
    }

    /// Record the cumulative bytes sent so far.
    pub fn record(&mut self, bytes_sent: u64) {
        self.record_at(Instant::now(), bytes_sent);
    }

    pub fn record_at(&mut self, at: Instant, bytes_sent: u64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back((at, bytes_sent));
    }

    /// Windowed rate in bytes per second, None until two samples exist or
    /// when no time has elapsed between them.
    pub fn rate(&self) -> Option<f64> {
        let (first_t, first_b) = *self.samples.front()?;
        let (last_t, last_b) = *self.samples.back()?;
        let secs = last_t.duration_since(first_t).as_secs_f64();
        if secs <= 0.0 || last_b <= first_b {
            return None;
        }
        Some((last_b - first_b) as f64 / secs)
    }
}
