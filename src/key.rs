//! Context identity.
//!
//! A [`ContextKey`] names one logical execution context. Keys index the
//! shared value table of the propagating storage strategy.

use std::fmt;
use uuid::Uuid;

/// Unique identifier for a logical execution context
///
/// Minted lazily the first time a context touches a cell, then fixed for
/// the lifetime of that context. Uses UUID v4, so keys from different
/// contexts never collide in practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextKey(Uuid);

impl ContextKey {
    /// Mint a new random key
    ///
    /// # Examples
    ///
    /// ```
    /// use ctxcell::ContextKey;
    ///
    /// let a = ContextKey::mint();
    /// let b = ContextKey::mint();
    /// assert_ne!(a, b);
    /// ```
    pub fn mint() -> Self {
        ContextKey(Uuid::new_v4())
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
