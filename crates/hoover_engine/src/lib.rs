//! # Hoover Engine
//!
//! Admission pipeline for the sticker hoover.
//!
//! This crate provides:
//! - Bootstrap synchronizer (seed the ledger, verify the current pack)
//! - Bounded intake queue with immediate rejection when full
//! - Worker pool with a single critical section around the rollover machine
//! - Size policy for oversized static items, behind a [`Resizer`] seam
//! - Error-rate circuit breaker
//! - Acknowledgments through a [`Notifier`] seam
//! - Structured events, a recent-events ring and a status report
//!
//! ## Architecture
//!
//! Every item goes through the same steps:
//! 1. Dedup against the ledger (duplicates are dropped silently)
//! 2. Size policy (static items only)
//! 3. Rollover decision and append, one worker at a time
//! 4. Ledger update and persist
//! 5. Acknowledgment to the originating chat
//!
//! ## Key Invariants
//!
//! - The pipeline only starts from a [`Bootstrapped`] machine
//! - Duplicates cause no directory calls and no acknowledgment
//! - A failed resize never touches the ledger
//! - Worker failures surface in the item's outcome; workers never stop

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod bootstrap;
mod breaker;
mod config;
mod error;
mod events;
mod notify;
mod pipeline;
mod resize;
mod stats;

pub use bootstrap::{bootstrap, BootstrapReport, Bootstrapped};
pub use breaker::CircuitBreaker;
pub use config::{LoadShedding, PipelineConfig, ResizeFailurePolicy};
pub use error::{EngineError, EngineResult};
pub use events::{EventLog, EventSink, LogEntry, PipelineEvent};
pub use notify::{LogNotifier, MockNotifier, Notification, Notifier, Outcome};
pub use pipeline::{PipelineBuilder, PipelineHandle, ShutdownReport};
pub use resize::{NoResizer, Prepared, Resizer, SizePolicy};
pub use stats::{PipelineStats, StatsSnapshot, StatusReport};
