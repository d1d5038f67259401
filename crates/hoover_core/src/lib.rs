//! # Hoover Core
//!
//! Pack allocation and deduplication for the sticker hoover.
//!
//! This crate provides:
//! - Identity ledger (every content identity admitted anywhere)
//! - Pack directory abstraction with an in-memory implementation
//! - Slug allocator (collision-free pack names probed against the directory)
//! - Allocator state and its JSON blob format
//! - Rollover state machine (append, roll over on capacity or kind, recover
//!   from vanished packs)
//!
//! ## Key Invariants
//!
//! - A pack never holds more members than its kind's capacity
//! - Packs are monomorphic: static and animated items never share a pack
//! - `index` only increases
//! - An identity enters the ledger only after the directory accepted it,
//!   or after it was seen in a fetched pack
//!
//! ## Example
//!
//! ```rust
//! use hoover_core::{
//!     AdmitOutcome, HooverConfig, Item, MediaKind, MemoryDirectory, OwnerId, PackEntry,
//!     RolloverMachine,
//! };
//! use hoover_storage::MemoryStore;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = HooverConfig::new(OwnerId(1), "hoover_bot");
//! let directory = Arc::new(MemoryDirectory::new());
//! let mut machine =
//!     RolloverMachine::load(config, directory, Arc::new(MemoryStore::new())).unwrap();
//!
//! let item = Item::new("AgADxyz", "file-1", MediaKind::Static);
//! let entry = PackEntry::from_item(&item, "🙂");
//! let outcome = machine.admit(&entry).await.unwrap();
//! assert!(matches!(outcome, AdmitOutcome::Admitted(_)));
//! assert_eq!(machine.admit(&entry).await.unwrap(), AdmitOutcome::Duplicate);
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod directory;
mod error;
mod ledger;
mod rollover;
mod slug;
mod state;
mod types;

pub use config::{
    parse_reference_packs, HooverConfig, DEFAULT_ANIMATED_CAPACITY, DEFAULT_BASE_NAME,
    DEFAULT_EMOJI, DEFAULT_MAX_NAME_LEN, DEFAULT_MAX_STATIC_SIDE, DEFAULT_PROBE_WINDOW,
    DEFAULT_STATIC_CAPACITY,
};
pub use directory::{DirectoryOp, MemoryDirectory, PackDirectory, PackSnapshot};
pub use error::{CoreError, CoreResult, DirectoryError, DirectoryResult};
pub use ledger::{IdentityLedger, SharedLedger};
pub use rollover::{AdmitOutcome, Admission, RolloverMachine};
pub use slug::SlugAllocator;
pub use state::{AllocatorState, PackSlot, PersistedState, Placement, RolloverReason};
pub use types::{
    ChatContext, ContentId, Dimensions, Item, MediaKind, OwnerId, PackEntry, PackKind,
    StickerSource,
};
