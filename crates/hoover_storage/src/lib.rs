//! # Hoover Storage
//!
//! Blob store trait and implementations for the sticker hoover.
//!
//! The hoover persists exactly one thing: the allocator state, written whole
//! after every mutation and read whole at startup. Stores are therefore
//! **opaque single-blob stores**: they do not interpret the bytes they keep.
//!
//! ## Design Principles
//!
//! - A store holds one blob; `store` replaces it entirely
//! - A store that has never been written loads as `None`
//! - Must be `Send + Sync` so the admission workers can share it
//! - The hoover owns the blob format
//!
//! ## Available Stores
//!
//! - [`MemoryStore`] - For testing and ephemeral runs
//! - [`FileStore`] - Crash-safe file persistence with a single-instance lock
//!
//! ## Example
//!
//! ```rust
//! use hoover_storage::{MemoryStore, StateStore};
//!
//! let store = MemoryStore::new();
//! assert!(store.load().unwrap().is_none());
//! store.store(b"{\"index\":1}").unwrap();
//! assert_eq!(store.load().unwrap().unwrap(), b"{\"index\":1}");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod memory;
mod store;

pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use store::StateStore;
