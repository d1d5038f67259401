//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Another process already holds the state lock.
    #[error("state locked: another process has exclusive access to {path:?}")]
    Locked {
        /// The lock file that could not be acquired.
        path: PathBuf,
    },

    /// The state path has no usable file name.
    #[error("invalid state path: {0:?}")]
    InvalidPath(PathBuf),
}
