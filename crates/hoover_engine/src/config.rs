//! Configuration for the admission pipeline.

use crate::error::{EngineError, EngineResult};
use std::time::Duration;

/// What to do with an item whose resize failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeFailurePolicy {
    /// Report failure and accept the item again on re-delivery.
    #[default]
    Retry,
    /// Report failure once and drop later re-deliveries for the process
    /// lifetime.
    Permanent,
}

/// Thresholds under which expensive resizes are skipped.
///
/// Depths are fractions of the queue capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadShedding {
    /// Queue depth above which oversized items are not resized.
    pub side_depth: f64,
    /// Longest side considered oversized under load.
    pub max_side_under_load: u32,
    /// Queue depth above which large payloads are not resized.
    pub payload_depth: f64,
    /// Payload size considered large under load.
    pub max_payload_under_load: usize,
}

impl LoadShedding {
    /// Never shed.
    pub fn disabled() -> Self {
        Self {
            side_depth: f64::INFINITY,
            max_side_under_load: u32::MAX,
            payload_depth: f64::INFINITY,
            max_payload_under_load: usize::MAX,
        }
    }

    /// Returns true if an item with a longest side of `side` should not be
    /// resized at queue `depth` out of `capacity`.
    pub fn sheds_side(&self, depth: usize, capacity: usize, side: u32) -> bool {
        load(depth, capacity) > self.side_depth && side > self.max_side_under_load
    }

    /// Returns true if a payload of `len` bytes should not be resized at
    /// queue `depth` out of `capacity`.
    pub fn sheds_payload(&self, depth: usize, capacity: usize, len: usize) -> bool {
        load(depth, capacity) > self.payload_depth && len > self.max_payload_under_load
    }
}

impl Default for LoadShedding {
    fn default() -> Self {
        Self {
            side_depth: 0.8,
            max_side_under_load: 2048,
            payload_depth: 0.5,
            max_payload_under_load: 10 * 1024 * 1024,
        }
    }
}

fn load(depth: usize, capacity: usize) -> f64 {
    if capacity == 0 {
        return 0.0;
    }
    depth as f64 / capacity as f64
}

/// Configuration for the admission pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Items that may wait for a worker.
    pub queue_capacity: usize,
    /// Items processed at once.
    pub concurrency: usize,
    /// Error ratio above which workers pause.
    pub max_error_rate: f64,
    /// Length of a breaker pause.
    pub breaker_pause: Duration,
    /// Delay before each unique item's network work.
    pub pacing_delay: Duration,
    /// Handling of failed resizes.
    pub resize_failure_policy: ResizeFailurePolicy,
    /// Resize load shedding.
    pub load_shedding: LoadShedding,
    /// Events kept for the recent-log view.
    pub event_log_capacity: usize,
}

impl PipelineConfig {
    /// Creates a configuration with default limits.
    pub fn new() -> Self {
        Self {
            queue_capacity: 50,
            concurrency: 3,
            max_error_rate: 0.3,
            breaker_pause: Duration::from_secs(5),
            pacing_delay: Duration::from_millis(100),
            resize_failure_policy: ResizeFailurePolicy::Retry,
            load_shedding: LoadShedding::default(),
            event_log_capacity: 200,
        }
    }

    /// Sets the queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Sets the number of concurrent workers.
    pub fn with_concurrency(mut self, workers: usize) -> Self {
        self.concurrency = workers;
        self
    }

    /// Sets the breaker threshold.
    pub fn with_max_error_rate(mut self, rate: f64) -> Self {
        self.max_error_rate = rate;
        self
    }

    /// Sets the breaker pause.
    pub fn with_breaker_pause(mut self, pause: Duration) -> Self {
        self.breaker_pause = pause;
        self
    }

    /// Sets the pacing delay.
    pub fn with_pacing_delay(mut self, delay: Duration) -> Self {
        self.pacing_delay = delay;
        self
    }

    /// Sets the resize failure policy.
    pub fn with_resize_failure_policy(mut self, policy: ResizeFailurePolicy) -> Self {
        self.resize_failure_policy = policy;
        self
    }

    /// Sets the load shedding thresholds.
    pub fn with_load_shedding(mut self, shedding: LoadShedding) -> Self {
        self.load_shedding = shedding;
        self
    }

    /// Sets the event log capacity.
    pub fn with_event_log_capacity(mut self, capacity: usize) -> Self {
        self.event_log_capacity = capacity;
        self
    }

    /// Configuration for tests: no pacing, no breaker pause.
    pub fn immediate() -> Self {
        Self::new()
            .with_pacing_delay(Duration::ZERO)
            .with_breaker_pause(Duration::ZERO)
    }

    /// Checks limits for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` on a zero queue or worker count, or an error
    /// rate outside `0.0..=1.0`.
    pub fn validate(&self) -> EngineResult<()> {
        if self.queue_capacity == 0 {
            return Err(EngineError::InvalidConfig("queue capacity must be positive".into()));
        }
        if self.concurrency == 0 {
            return Err(EngineError::InvalidConfig("concurrency must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.max_error_rate) {
            return Err(EngineError::InvalidConfig(format!(
                "max error rate {} is outside 0..=1",
                self.max_error_rate
            )));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}
