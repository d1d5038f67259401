//! Error-rate circuit breaker.
//!
//! The breaker never rejects work. When the running error ratio is above the
//! threshold, the worker about to start an item sleeps for a short pause
//! first; intake keeps accepting items meanwhile.

use crate::stats::PipelineStats;
use std::time::Duration;

/// Pauses workers while too many items fail.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    max_error_rate: f64,
    pause: Duration,
}

impl CircuitBreaker {
    /// Creates a breaker tripping above `max_error_rate`.
    pub fn new(max_error_rate: f64, pause: Duration) -> Self {
        Self {
            max_error_rate,
            pause,
        }
    }

    /// Pause length.
    pub fn pause(&self) -> Duration {
        self.pause
    }

    /// Returns the current error rate if it is above the threshold.
    pub fn tripped(&self, stats: &PipelineStats) -> Option<f64> {
        if stats.processed() == 0 {
            return None;
        }
        let rate = stats.error_rate();
        (rate > self.max_error_rate).then_some(rate)
    }

    /// Sleeps for the pause if the breaker is tripped.
    ///
    /// Returns the error rate that caused the pause.
    pub async fn gate(&self, stats: &PipelineStats) -> Option<f64> {
        let rate = self.tripped(stats)?;
        stats.record_breaker_pause();
        tracing::warn!(
            error_rate = rate,
            failed = stats.failed(),
            processed = stats.processed(),
            "error rate too high, pausing"
        );
        if !self.pause.is_zero() {
            tokio::time::sleep(self.pause).await;
        }
        Some(rate)
    }
}
