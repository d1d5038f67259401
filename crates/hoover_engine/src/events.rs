//! Structured pipeline events and the recent-events ring.

use hoover_core::{ContentId, PackKind, RolloverReason};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

/// Something the pipeline did with an item or a pack.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// Item accepted into the queue.
    Queued {
        /// Item identity.
        id: ContentId,
        /// Queue depth after the item was added.
        depth: usize,
    },
    /// Item rejected because the queue was full.
    Rejected {
        /// Item identity.
        id: ContentId,
    },
    /// Item already admitted.
    Duplicate {
        /// Item identity.
        id: ContentId,
    },
    /// Item dropped because an earlier resize of it failed permanently.
    Skipped {
        /// Item identity.
        id: ContentId,
    },
    /// Static item shrunk.
    Resized {
        /// Item identity.
        id: ContentId,
        /// Longest side before.
        from_side: u32,
        /// Side limit applied.
        max_side: u32,
    },
    /// Oversized item not resized.
    ResizeSkipped {
        /// Item identity.
        id: ContentId,
        /// Why.
        reason: String,
    },
    /// A pack was opened.
    PackCreated {
        /// Pack name.
        pack: String,
        /// Pack index.
        index: u64,
        /// Pack kind.
        kind: PackKind,
        /// Why it was opened.
        reason: RolloverReason,
    },
    /// The current pack vanished and the item went to a new one.
    PackVanished {
        /// Item identity.
        id: ContentId,
        /// Pack the item landed in.
        replacement: String,
    },
    /// Item placed in a pack.
    Admitted {
        /// Item identity.
        id: ContentId,
        /// Pack name.
        pack: String,
        /// Members after placement.
        count: u32,
    },
    /// Item failed.
    Failed {
        /// Item identity.
        id: ContentId,
        /// Error text.
        error: String,
        /// True if the item can be delivered again.
        soft: bool,
    },
    /// Workers paused because too many items failed.
    BreakerPause {
        /// Error ratio that tripped the breaker.
        error_rate: f64,
        /// Pause length.
        pause: Duration,
    },
    /// Item still queued when the pipeline shut down.
    Abandoned {
        /// Item identity.
        id: ContentId,
    },
}

impl PipelineEvent {
    /// Returns true for events reporting a problem.
    pub fn is_problem(&self) -> bool {
        matches!(
            self,
            PipelineEvent::Rejected { .. }
                | PipelineEvent::ResizeSkipped { .. }
                | PipelineEvent::PackVanished { .. }
                | PipelineEvent::Failed { .. }
                | PipelineEvent::BreakerPause { .. }
                | PipelineEvent::Abandoned { .. }
        )
    }
}

impl fmt::Display for PipelineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineEvent::Queued { id, depth } => write!(f, "queued {id} (depth {depth})"),
            PipelineEvent::Rejected { id } => write!(f, "rejected {id}: queue full"),
            PipelineEvent::Duplicate { id } => write!(f, "duplicate {id}"),
            PipelineEvent::Skipped { id } => write!(f, "skipped {id}: resize failed before"),
            PipelineEvent::Resized {
                id,
                from_side,
                max_side,
            } => write!(f, "resized {id} from {from_side}px to {max_side}px"),
            PipelineEvent::ResizeSkipped { id, reason } => {
                write!(f, "resize of {id} skipped: {reason}")
            }
            PipelineEvent::PackCreated {
                pack,
                index,
                kind,
                reason,
            } => write!(f, "created {kind} pack {pack} (#{index}, {reason})"),
            PipelineEvent::PackVanished { id, replacement } => {
                write!(f, "pack vanished, {id} moved to {replacement}")
            }
            PipelineEvent::Admitted { id, pack, count } => {
                write!(f, "admitted {id} to {pack} ({count})")
            }
            PipelineEvent::Failed { id, error, soft } => {
                let kind = if *soft { "soft" } else { "hard" };
                write!(f, "{kind} failure for {id}: {error}")
            }
            PipelineEvent::BreakerPause { error_rate, pause } => write!(
                f,
                "error rate {:.1}% too high, pausing {}ms",
                error_rate * 100.0,
                pause.as_millis()
            ),
            PipelineEvent::Abandoned { id } => write!(f, "abandoned {id} at shutdown"),
        }
    }
}

/// Receives pipeline events.
pub trait EventSink: Send + Sync {
    /// Records one event.
    fn record(&self, event: &PipelineEvent);
}

/// A recorded event with its arrival order and time.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// Arrival order, starting at 1.
    pub seq: u64,
    /// Wall-clock time of the event.
    pub at: SystemTime,
    /// The event.
    pub event: PipelineEvent,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self
            .at
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        write!(f, "[{secs}] #{} {}", self.seq, self.event)
    }
}

/// Bounded ring of the most recent events.
#[derive(Debug)]
pub struct EventLog {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
    next_seq: AtomicU64,
}

impl EventLog {
    /// Creates a ring keeping at most `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
            next_seq: AtomicU64::new(1),
        }
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Ring capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The last `n` events, oldest first.
    pub fn recent(&self, n: usize) -> Vec<LogEntry> {
        let entries = self.entries.lock();
        let skip = entries.len().saturating_sub(n);
        entries.iter().skip(skip).cloned().collect()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(200)
    }
}

impl EventSink for EventLog {
    fn record(&self, event: &PipelineEvent) {
        if self.capacity == 0 {
            return;
        }
        let entry = LogEntry {
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            at: SystemTime::now(),
            event: event.clone(),
        };
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }
}
