//! Error types for the hoover core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Result type for pack directory calls.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Errors reported by a [`crate::PackDirectory`].
///
/// The directory distinguishes exactly one expected condition, a missing
/// pack, from everything else.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectoryError {
    /// The named pack does not exist (or no longer exists).
    #[error("pack not found: {name}")]
    NotFound {
        /// Name of the missing pack.
        name: String,
    },

    /// Any other failure from the platform.
    #[error("directory request failed: {message}")]
    Transient {
        /// Error message from the platform.
        message: String,
    },
}

impl DirectoryError {
    /// Creates a not-found error for `name`.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Creates a transient error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    /// Returns true if the pack was reported missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors that can occur in hoover core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A pack was reported missing where it was required.
    #[error("pack not found: {name}")]
    PackNotFound {
        /// Name of the missing pack.
        name: String,
    },

    /// The pack directory failed for a reason other than absence.
    #[error("pack directory error: {message}")]
    Directory {
        /// Error message from the directory.
        message: String,
    },

    /// No free pack name was found in the probe window.
    #[error("no free pack name for base {base:?} in {window} probes starting at index {start}")]
    SlugExhausted {
        /// Normalized base name.
        base: String,
        /// First index probed.
        start: u64,
        /// Number of candidates probed.
        window: u32,
    },

    /// Persisting or loading the allocator state failed.
    #[error("storage error: {0}")]
    Storage(#[from] hoover_storage::StorageError),

    /// The persisted state blob could not be encoded or decoded.
    #[error("state codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<DirectoryError> for CoreError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound { name } => Self::PackNotFound { name },
            DirectoryError::Transient { message } => Self::Directory { message },
        }
    }
}

impl CoreError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Returns true for the expected-absence case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::PackNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_error_classification() {
        assert!(DirectoryError::not_found("pack_1").is_not_found());
        assert!(!DirectoryError::transient("flood wait").is_not_found());
    }

    #[test]
    fn directory_error_conversion() {
        let err: CoreError = DirectoryError::not_found("pack_1").into();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("pack_1"));

        let err: CoreError = DirectoryError::transient("STICKERS_TOO_MUCH").into();
        assert!(matches!(err, CoreError::Directory { .. }));
        assert!(!err.is_not_found());
    }

    #[test]
    fn slug_exhausted_display() {
        let err = CoreError::SlugExhausted {
            base: "stickies".into(),
            start: 7,
            window: 1000,
        };
        let msg = err.to_string();
        assert!(msg.contains("stickies"));
        assert!(msg.contains("1000"));
        assert!(msg.contains('7'));
    }
}
