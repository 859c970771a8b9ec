//! Error types for context storage access.
//!
//! These errors never leave the crate: storage backings report them and the
//! guard behind [`ContextLocalCell`](crate::ContextLocalCell) recovers.

use thiserror::Error;

/// Failures raised by a storage backing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum StorageError {
    /// A per-thread slot was already destroyed (thread exit, TLS destructors)
    #[error("context storage disposed: {slot}")]
    Disposed {
        /// Which slot was unreachable
        slot: &'static str,
    },
}

impl From<std::thread::AccessError> for StorageError {
    fn from(_: std::thread::AccessError) -> Self {
        StorageError::Disposed {
            slot: "thread-local storage",
        }
    }
}

/// Result type for storage backings.
pub(crate) type Result<T> = std::result::Result<T, StorageError>;
