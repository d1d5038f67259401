//! In-memory blob store for testing.

use crate::error::{StorageError, StorageResult};
use crate::store::StateStore;
use parking_lot::RwLock;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// An in-memory blob store.
///
/// This store keeps the blob in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Dry runs that must not touch the real state file
///
/// Writes can be made to fail on demand to exercise persistence errors.
///
/// # Example
///
/// ```rust
/// use hoover_storage::{MemoryStore, StateStore};
///
/// let store = MemoryStore::with_data(b"seed".to_vec());
/// assert_eq!(store.load().unwrap().unwrap(), b"seed");
/// assert_eq!(store.writes(), 0);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<Option<Vec<u8>>>,
    writes: AtomicU64,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding a pre-existing blob.
    ///
    /// Useful for testing restart scenarios.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: RwLock::new(Some(data)),
            ..Self::default()
        }
    }

    /// Returns a copy of the current blob.
    #[must_use]
    pub fn data(&self) -> Option<Vec<u8>> {
        self.data.read().clone()
    }

    /// Number of successful `store` calls.
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Makes subsequent writes fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> StorageResult<Option<Vec<u8>>> {
        Ok(self
            .data
            .read()
            .as_ref()
            .filter(|data| !data.is_empty())
            .cloned())
    }

    fn store(&self, data: &[u8]) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::Other,
                "injected write failure",
            )));
        }
        *self.data.write() = Some(data.to_vec());
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_new_is_empty() {
        let store = MemoryStore::new();
        assert!(store.load().unwrap().is_none());
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn memory_store_replaces() {
        let store = MemoryStore::new();
        store.store(b"one").unwrap();
        store.store(b"two").unwrap();

        assert_eq!(store.load().unwrap().unwrap(), b"two");
        assert_eq!(store.writes(), 2);
    }

    #[test]
    fn memory_injected_failure_keeps_previous() {
        let store = MemoryStore::with_data(b"kept".to_vec());
        store.set_fail_writes(true);

        assert!(store.store(b"lost").is_err());
        assert_eq!(store.load().unwrap().unwrap(), b"kept");

        store.set_fail_writes(false);
        store.store(b"new").unwrap();
        assert_eq!(store.data().unwrap(), b"new");
    }
}
