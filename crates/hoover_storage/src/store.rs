//! Blob store trait definition.

use crate::error::StorageResult;

/// A whole-blob store for the hoover's persisted state.
///
/// Stores are **opaque**: they keep the last blob written and hand it back
/// unchanged. The hoover owns serialization.
///
/// # Invariants
///
/// - `load` returns `None` until the first successful `store`
/// - After `store(b)` returns `Ok`, `load` returns exactly `b`
/// - A failed `store` leaves the previous blob intact
/// - Stores must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::MemoryStore`] - For testing
/// - [`super::FileStore`] - For persistent storage
pub trait StateStore: Send + Sync {
    /// Reads the current blob, or `None` if nothing was ever stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob exists but cannot be read.
    fn load(&self) -> StorageResult<Option<Vec<u8>>>;

    /// Replaces the stored blob with `data`.
    ///
    /// After this returns successfully, the new blob is guaranteed to
    /// survive process termination (for durable stores).
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails. The previous blob stays intact.
    fn store(&self, data: &[u8]) -> StorageResult<()>;

    /// Human-readable location of the store, used in log lines.
    fn describe(&self) -> String;
}
