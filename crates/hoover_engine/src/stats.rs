//! Pipeline statistics and the status report.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Pipeline counters.
///
/// All counters are atomic and can be read while items are in flight.
#[derive(Debug, Default)]
pub struct PipelineStats {
    /// Items accepted into the queue.
    queued: AtomicU64,
    /// Items rejected because the queue was full.
    rejected: AtomicU64,
    /// Items dropped as duplicates.
    duplicates: AtomicU64,
    /// Unique items whose processing started.
    processed: AtomicU64,
    /// Items placed in a pack.
    admitted: AtomicU64,
    /// Items that failed.
    failed: AtomicU64,
    /// Packs opened.
    packs_created: AtomicU64,
    /// Vanished packs recovered from.
    recoveries: AtomicU64,
    /// Static items shrunk.
    resized: AtomicU64,
    /// Breaker pauses taken.
    breaker_pauses: AtomicU64,
}

impl PipelineStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_queued(&self) {
        self.queued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_admitted(&self, created: bool, recovered: bool) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
        if created {
            self.packs_created.fetch_add(1, Ordering::Relaxed);
        }
        if recovered {
            self.recoveries.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_resized(&self) {
        self.resized.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_breaker_pause(&self) {
        self.breaker_pauses.fetch_add(1, Ordering::Relaxed);
    }

    /// Items accepted into the queue.
    pub fn queued(&self) -> u64 {
        self.queued.load(Ordering::Relaxed)
    }

    /// Items rejected because the queue was full.
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Items dropped as duplicates.
    pub fn duplicates(&self) -> u64 {
        self.duplicates.load(Ordering::Relaxed)
    }

    /// Unique items whose processing started.
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Items placed in a pack.
    pub fn admitted(&self) -> u64 {
        self.admitted.load(Ordering::Relaxed)
    }

    /// Items that failed.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Packs opened.
    pub fn packs_created(&self) -> u64 {
        self.packs_created.load(Ordering::Relaxed)
    }

    /// Vanished packs recovered from.
    pub fn recoveries(&self) -> u64 {
        self.recoveries.load(Ordering::Relaxed)
    }

    /// Static items shrunk.
    pub fn resized(&self) -> u64 {
        self.resized.load(Ordering::Relaxed)
    }

    /// Breaker pauses taken.
    pub fn breaker_pauses(&self) -> u64 {
        self.breaker_pauses.load(Ordering::Relaxed)
    }

    /// Running error ratio, `failed / processed`; zero before any work.
    pub fn error_rate(&self) -> f64 {
        let processed = self.processed();
        if processed == 0 {
            return 0.0;
        }
        self.failed() as f64 / processed as f64
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            queued: self.queued(),
            rejected: self.rejected(),
            duplicates: self.duplicates(),
            processed: self.processed(),
            admitted: self.admitted(),
            failed: self.failed(),
            packs_created: self.packs_created(),
            recoveries: self.recoveries(),
            resized: self.resized(),
            breaker_pauses: self.breaker_pauses(),
        }
    }
}

/// A point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Items accepted into the queue.
    pub queued: u64,
    /// Items rejected because the queue was full.
    pub rejected: u64,
    /// Items dropped as duplicates.
    pub duplicates: u64,
    /// Unique items whose processing started.
    pub processed: u64,
    /// Items placed in a pack.
    pub admitted: u64,
    /// Items that failed.
    pub failed: u64,
    /// Packs opened.
    pub packs_created: u64,
    /// Vanished packs recovered from.
    pub recoveries: u64,
    /// Static items shrunk.
    pub resized: u64,
    /// Breaker pauses taken.
    pub breaker_pauses: u64,
}

/// Operator-facing status of a running pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    /// Items waiting for a worker.
    pub queue_depth: usize,
    /// Counters.
    pub stats: StatsSnapshot,
    /// `failed / processed`.
    pub error_rate: f64,
    /// Pack accepting items, if any.
    pub current_pack: Option<String>,
    /// Members in the current pack.
    pub member_count: u32,
    /// Pack naming counter.
    pub index: u64,
    /// Identities in the ledger.
    pub ledger_size: usize,
    /// Entries in the event log.
    pub log_entries: usize,
    /// Worker count.
    pub concurrency: usize,
    /// Queue capacity.
    pub queue_capacity: usize,
    /// Per-item pacing delay.
    pub pacing_delay: Duration,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Hoover status")?;
        writeln!(f)?;
        writeln!(f, "Processing:")?;
        writeln!(f, "  queue size:      {}", self.queue_depth)?;
        writeln!(f, "  total processed: {}", self.stats.processed)?;
        writeln!(
            f,
            "  errors:          {} ({:.1}%)",
            self.stats.failed,
            self.error_rate * 100.0
        )?;
        writeln!(f, "  admitted:        {}", self.stats.admitted)?;
        writeln!(f, "  duplicates:      {}", self.stats.duplicates)?;
        writeln!(f, "  rejected:        {}", self.stats.rejected)?;
        writeln!(
            f,
            "  current pack:    {}",
            self.current_pack.as_deref().unwrap_or("none")
        )?;
        writeln!(f, "  pack count:      {}", self.member_count)?;
        writeln!(f, "  pack index:      {}", self.index)?;
        writeln!(f)?;
        writeln!(f, "Memory:")?;
        writeln!(f, "  seen stickers:   {}", self.ledger_size)?;
        writeln!(f, "  log entries:     {}", self.log_entries)?;
        writeln!(f)?;
        writeln!(f, "Config:")?;
        writeln!(f, "  concurrency:     {}", self.concurrency)?;
        writeln!(f, "  max queue size:  {}", self.queue_capacity)?;
        write!(
            f,
            "  pacing delay:    {}s",
            self.pacing_delay.as_secs_f64()
        )
    }
}
