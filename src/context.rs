//! Logical execution contexts
//!
//! Every logical context owns one lazily-minted [`ContextKey`]. Plain threads
//! get theirs from a thread-local frame. Async code gets a task-local frame
//! by entering a context through [`fork`], [`isolate`] or [`spawn`]; the
//! frame travels with the future, so the key survives a resume on another
//! worker thread.
//!
//! # Inheritance
//!
//! A forked child starts with no key of its own but remembers the lineage of
//! the context it was forked from. Storage uses that lineage to seed the
//! child's first read with the parent's value. The child's writes land under
//! its own key and never reach the parent.
//!
//! ```text
//! parent: key P ──fork──▶ child: key C, lineage [P]
//!   set(p)                  get() → p   (seeded from P)
//!                           set(c)      (stored under C)
//!   get() → p
//! ```

use crate::error::{Result, StorageError};
use crate::key::ContextKey;
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::trace;

tokio::task_local! {
    static TASK_FRAME: RefCell<Frame>;
}

thread_local! {
    static THREAD_FRAME: RefCell<Frame> = const { RefCell::new(Frame::root()) };
}

/// A minted key plus the chain of contexts it was forked from
///
/// Chains grow by one link per fork and can get arbitrarily deep, so `Drop`
/// and `Debug` walk them iteratively.
pub(crate) struct Lineage {
    key: ContextKey,
    parent: Option<Arc<Lineage>>,
}

impl Lineage {
    pub(crate) fn key(&self) -> &ContextKey {
        &self.key
    }

    /// Keys of all ancestors, nearest first
    pub(crate) fn ancestors(&self) -> impl Iterator<Item = &ContextKey> {
        std::iter::successors(self.parent.as_deref(), |l| l.parent.as_deref()).map(|l| &l.key)
    }
}

impl Drop for Lineage {
    fn drop(&mut self) {
        let mut next = self.parent.take();
        while let Some(parent) = next {
            // Stop at the first ancestor still shared with another lineage.
            next = match Arc::try_unwrap(parent) {
                Ok(mut owned) => owned.parent.take(),
                Err(_) => None,
            };
        }
    }
}

impl fmt::Debug for Lineage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lineage")
            .field("key", &self.key)
            .field("depth", &self.ancestors().count())
            .finish()
    }
}

/// Per-context key slot
#[derive(Debug)]
struct Frame {
    lineage: Option<Arc<Lineage>>,
    inherited: Option<Arc<Lineage>>,
}

impl Frame {
    const fn root() -> Self {
        Frame {
            lineage: None,
            inherited: None,
        }
    }

    fn inheriting(parent: Option<Arc<Lineage>>) -> Self {
        Frame {
            lineage: None,
            inherited: parent,
        }
    }

    /// Return this frame's lineage, minting the key on first call.
    ///
    /// The flag is true when the key was minted by this call.
    fn resolve(&mut self) -> (Arc<Lineage>, bool) {
        if let Some(lineage) = &self.lineage {
            return (Arc::clone(lineage), false);
        }
        let lineage = Arc::new(Lineage {
            key: ContextKey::mint(),
            parent: self.inherited.take(),
        });
        self.lineage = Some(Arc::clone(&lineage));
        (lineage, true)
    }
}

/// Resolve the calling context's lineage, minting its key if absent.
///
/// The task-local frame wins when the caller runs inside a context entered
/// through this module; otherwise the thread's frame is used.
pub(crate) fn current_lineage() -> Result<Arc<Lineage>> {
    let (lineage, minted) = match TASK_FRAME.try_with(|frame| frame.borrow_mut().resolve()) {
        Ok(resolved) => resolved,
        Err(_) => THREAD_FRAME
            .try_with(|frame| frame.borrow_mut().resolve())
            .map_err(|_| StorageError::Disposed {
                slot: "thread context frame",
            })?,
    };
    if minted {
        trace!(
            key = %lineage.key,
            forked = lineage.parent.is_some(),
            "minted context key"
        );
    }
    Ok(lineage)
}

/// Key of the calling context, minting one if needed.
///
/// Returns `None` only when the context's storage has already been torn down.
pub fn current_key() -> Option<ContextKey> {
    current_lineage().ok().map(|lineage| lineage.key)
}

/// A captured context that children can be run under.
///
/// # Example
///
/// ```
/// use ctxcell::{context::ContextSnapshot, ContextLocalCell};
///
/// let cell = ContextLocalCell::<u32>::new();
/// cell.set(7);
///
/// let snapshot = ContextSnapshot::capture();
/// std::thread::spawn(move || {
///     snapshot.run(|| {
///         // runs as a child of the capturing context
///     });
/// })
/// .join()
/// .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct ContextSnapshot {
    parent: Option<Arc<Lineage>>,
}

impl ContextSnapshot {
    /// Capture the calling context as a fork point.
    ///
    /// Mints the caller's key if it has none yet. If the caller's storage is
    /// already disposed the snapshot is empty and children start as roots.
    pub fn capture() -> Self {
        ContextSnapshot {
            parent: current_lineage().ok(),
        }
    }

    /// Key of the captured context, if any
    pub fn key(&self) -> Option<ContextKey> {
        self.parent.as_ref().map(|lineage| lineage.key)
    }

    /// Run a closure as a child of the captured context.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        TASK_FRAME.sync_scope(RefCell::new(Frame::inheriting(self.parent.clone())), f)
    }

    /// Run a future as a child of the captured context.
    ///
    /// Every poll of the returned future sees the child's frame, regardless
    /// of which worker thread polls it.
    pub fn scope<F: Future>(&self, fut: F) -> impl Future<Output = F::Output> {
        TASK_FRAME.scope(RefCell::new(Frame::inheriting(self.parent.clone())), fut)
    }
}

/// Wrap a future as a child of the calling context.
///
/// The fork point is the call to `fork`, not the first poll.
pub fn fork<F: Future>(fut: F) -> impl Future<Output = F::Output> {
    ContextSnapshot::capture().scope(fut)
}

/// Run a future in a fresh root context that inherits nothing.
pub fn isolate<F: Future>(fut: F) -> impl Future<Output = F::Output> {
    TASK_FRAME.scope(RefCell::new(Frame::root()), fut)
}

/// Spawn a tokio task as a child of the calling context.
pub fn spawn<F>(fut: F) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(fork(fut))
}

/// Spawn an OS thread as a child of the calling context.
pub fn spawn_thread<F, R>(f: F) -> std::thread::JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let snapshot = ContextSnapshot::capture();
    std::thread::spawn(move || snapshot.run(f))
}
