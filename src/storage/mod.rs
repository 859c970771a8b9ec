//! Storage backings for context-local cells
//!
//! Two interchangeable strategies implement [`ContextStorage`]:
//!
//! - [`ThreadAffine`]: values live in native thread-local storage. One OS
//!   thread is one context; nothing is inherited across threads or tasks.
//! - [`Propagating`]: a per-context key (see [`crate::context`]) indexes a
//!   shared concurrent table. Contexts follow async tasks across worker
//!   threads and inherit from the context they were forked from.
//!
//! The strategy is fixed at build time through the `thread-affine` feature.

mod propagating;
mod thread_affine;

pub(crate) use propagating::Propagating;
pub(crate) use thread_affine::ThreadAffine;

use crate::error::Result;

/// Backing store for one cell's per-context values
///
/// Implementations report torn-down storage as `StorageError::Disposed` and
/// leave recovery to the caller.
pub(crate) trait ContextStorage<T>: Send + Sync {
    /// Read the calling context's value, creating it with `init` on first access
    fn load(&self, init: &dyn Fn() -> T) -> Result<T>;

    /// Replace the calling context's value
    fn store(&self, value: T) -> Result<()>;

    /// Which strategy this backing implements
    fn strategy(&self) -> Strategy;
}

/// Backing strategy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Strategy {
    /// Native thread-local storage, strict thread affinity
    ThreadAffine,
    /// Context key + shared table, inherits across forks
    Propagating,
}

impl Strategy {
    /// Strategy compiled in for this build
    pub(crate) const fn host() -> Self {
        if cfg!(feature = "thread-affine") {
            Strategy::ThreadAffine
        } else {
            Strategy::Propagating
        }
    }

    /// Open a fresh backing of this strategy
    pub(crate) fn open<T>(self, capacity: usize) -> Box<dyn ContextStorage<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        match self {
            Strategy::ThreadAffine => Box::new(ThreadAffine::<T>::new()),
            Strategy::Propagating => Box::new(Propagating::<T>::with_capacity(capacity)),
        }
    }
}
