//! Guarded access
//!
//! Storage backings report a torn-down slot as [`StorageError::Disposed`].
//! `guarded` turns exactly that failure into the caller's fallback. Panics
//! from user code are not caught here and propagate unchanged.

use crate::error::StorageError;
use tracing::debug;

/// Run a storage access, substituting `fallback` if the storage is disposed.
pub(crate) fn guarded<R>(
    cell: Option<&str>,
    op: &'static str,
    access: impl FnOnce() -> Result<R, StorageError>,
    fallback: impl FnOnce() -> R,
) -> R {
    match access() {
        Ok(value) => value,
        Err(err @ StorageError::Disposed { .. }) => {
            debug!(cell = cell.unwrap_or("<unnamed>"), op, error = %err, "context storage unavailable, degrading");
            fallback()
        }
    }
}
