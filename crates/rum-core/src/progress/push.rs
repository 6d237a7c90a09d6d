//! Arbitration between locally estimated and server-pushed progress.
//!
//! The server's out-of-band channel is authoritative while its pushes are
//! fresh and in order; stale or out-of-order pushes are discarded and the
//! display falls back to local estimation. Merge decisions are pure
//! functions of (now, last push, local stats), so there is no last-write-wins
//! race between the two sources.

use std::time::{Duration, Instant};

use super::ProgressStats;

const DEFAULT_FRESHNESS: Duration = Duration::from_secs(5);

/// One progress push received on the out-of-band channel.
#[derive(Debug, Clone, PartialEq)]
pub struct PushedProgress {
    /// Server-assigned sequence number; pushes must arrive strictly increasing.
    pub seq: u64,
    pub percentage: f64,
    pub bytes_per_sec: Option<f64>,
    pub eta_secs: Option<f64>,
}

/// Which source produced a displayed progress value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressSource {
    Server,
    Local,
}

/// Progress as it should be rendered to the user.
#[derive(Debug, Clone)]
pub struct DisplayProgress {
    pub percent: f64,
    pub bytes_per_sec: Option<f64>,
    pub eta_secs: Option<f64>,
    pub source: ProgressSource,
}

/// Holds the latest accepted push and decides which source wins.
#[derive(Debug, Default)]
pub struct ProgressMerger {
    freshness: Option<Duration>,
    last: Option<(Instant, PushedProgress)>,
}

impl ProgressMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_freshness(freshness: Duration) -> Self {
        Self {
            freshness: Some(freshness),
            last: None,
        }
    }

    fn freshness(&self) -> Duration {
        self.freshness.unwrap_or(DEFAULT_FRESHNESS)
    }

    /// Offer a push; returns false (and keeps the old one) when it is not
    /// strictly newer than the last accepted push.
    pub fn accept_push(&mut self, push: PushedProgress) -> bool {
        self.accept_push_at(Instant::now(), push)
    }

    pub fn accept_push_at(&mut self, at: Instant, push: PushedProgress) -> bool {
        if let Some((_, last)) = &self.last {
            if push.seq <= last.seq {
                return false;
            }
        }
        self.last = Some((at, push));
        true
    }

    /// Merge: the last accepted push wins while fresh, local estimation otherwise.
    pub fn display(&self, local: &ProgressStats) -> DisplayProgress {
        self.display_at(Instant::now(), local)
    }

    pub fn display_at(&self, now: Instant, local: &ProgressStats) -> DisplayProgress {
        if let Some((at, push)) = &self.last {
            if now.duration_since(*at) <= self.freshness() {
                return DisplayProgress {
                    percent: push.percentage.clamp(0.0, 100.0),
                    bytes_per_sec: push.bytes_per_sec,
                    eta_secs: push.eta_secs,
                    source: ProgressSource::Server,
                };
            }
        }
        DisplayProgress {
            percent: local.percent(),
            bytes_per_sec: Some(local.bytes_per_sec()),
            eta_secs: local.eta_secs(),
            source: ProgressSource::Local,
        }
    }
}
