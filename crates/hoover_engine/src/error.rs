//! Error types for the admission pipeline.

use hoover_core::CoreError;
use thiserror::Error;

/// Result type for pipeline operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while admitting an item.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Allocation, directory or persistence error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// No resizer is available for an oversized item.
    #[error("resize unavailable: {0}")]
    ResizeUnavailable(String),

    /// The resizer rejected the payload.
    #[error("resize failed: {0}")]
    ResizeFailed(String),

    /// The intake queue is full.
    #[error("queue full ({capacity} items), try again later")]
    QueueFull {
        /// Queue capacity.
        capacity: usize,
    },

    /// The pipeline is shutting down.
    #[error("pipeline is shut down")]
    Shutdown,

    /// An acknowledgment could not be delivered.
    #[error("notification failed: {0}")]
    Notify(String),

    /// Invalid pipeline configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EngineError {
    /// Returns true if the failure left the ledger untouched and the item
    /// may be admitted on a later delivery.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            EngineError::ResizeUnavailable(_)
                | EngineError::ResizeFailed(_)
                | EngineError::QueueFull { .. }
        )
    }

    /// Returns true if the error is a resize failure.
    pub fn is_resize(&self) -> bool {
        matches!(
            self,
            EngineError::ResizeUnavailable(_) | EngineError::ResizeFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoover_core::DirectoryError;

    #[test]
    fn soft_errors() {
        assert!(EngineError::ResizeUnavailable("no resizer".into()).is_soft());
        assert!(EngineError::ResizeFailed("bad png".into()).is_soft());
        assert!(EngineError::QueueFull { capacity: 50 }.is_soft());
        assert!(!EngineError::Shutdown.is_soft());

        let core: EngineError = CoreError::from(DirectoryError::transient("flood")).into();
        assert!(!core.is_soft());
        assert!(!core.is_resize());
    }

    #[test]
    fn error_display() {
        let err = EngineError::QueueFull { capacity: 50 };
        assert!(err.to_string().contains("50"));
        assert!(err.to_string().contains("try again later"));
    }
}
