//! The context-local cell.
//!
//! [`ContextLocalCell`] gives every logical execution context its own value.
//! `get` and `set` are total: when the underlying storage has already been
//! torn down (a late access from a thread-local destructor, for example),
//! `get` returns `T::default()` and `set` does nothing.

use crate::guard::guarded;
use crate::storage::{ContextStorage, Strategy};
use std::borrow::Cow;
use std::fmt;

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;

/// A value per logical execution context.
///
/// # Example
///
/// ```
/// use ctxcell::ContextLocalCell;
///
/// let cell = ContextLocalCell::with_initial(|| "init".to_string());
/// assert_eq!(cell.get(), "init");
///
/// cell.set("A".to_string());
/// assert_eq!(cell.get(), "A");
///
/// std::thread::scope(|s| {
///     s.spawn(|| assert_eq!(cell.get(), "init"));
/// });
/// ```
///
/// # Contexts
///
/// Each OS thread is a context. With the default build, async code becomes
/// a context of its own when entered through [`crate::context::fork`],
/// [`crate::context::isolate`] or [`crate::context::spawn`]; such contexts
/// keep their value across worker threads and start from the value of the
/// context they were forked from.
///
/// # Memory
///
/// Entries are never evicted. Each distinct context that touches the cell
/// keeps one entry until the cell is dropped.
pub struct ContextLocalCell<T> {
    storage: Box<dyn ContextStorage<T>>,
    initial_value: Factory<T>,
    name: Option<Cow<'static, str>>,
}

impl<T> ContextLocalCell<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    /// Create a cell whose initial value is `T::default()`.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a cell whose initial value comes from `initial_value`.
    ///
    /// The factory runs at most once per context, on that context's first
    /// access.
    pub fn with_initial<F>(initial_value: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::builder().initial_value(initial_value).build()
    }

    /// Create a builder for cell configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use ctxcell::ContextLocalCell;
    ///
    /// let cell = ContextLocalCell::builder()
    ///     .name("request-id")
    ///     .initial_value(|| 0u64)
    ///     .capacity(64)
    ///     .build();
    /// assert_eq!(cell.get(), 0);
    /// ```
    pub fn builder() -> CellBuilder<T> {
        CellBuilder::new()
    }

    /// Read the calling context's value.
    ///
    /// Creates it with the initial-value factory on first access. Returns
    /// `T::default()` if the context's storage has been torn down.
    pub fn get(&self) -> T {
        guarded(
            self.name.as_deref(),
            "get",
            || self.storage.load(&*self.initial_value),
            T::default,
        )
    }

    /// Replace the calling context's value.
    ///
    /// Does nothing if the context's storage has been torn down.
    pub fn set(&self, value: T) {
        guarded(
            self.name.as_deref(),
            "set",
            || self.storage.store(value),
            || (),
        )
    }

    /// Label given through [`CellBuilder::name`]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl<T> Default for ContextLocalCell<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ContextLocalCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextLocalCell")
            .field("name", &self.name)
            .field("strategy", &self.storage.strategy())
            .finish_non_exhaustive()
    }
}

/// Builder for [`ContextLocalCell`].
pub struct CellBuilder<T> {
    initial_value: Option<Factory<T>>,
    name: Option<Cow<'static, str>>,
    capacity: usize,
    strategy: Strategy,
}

impl<T> CellBuilder<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    /// Create a builder with defaults: `T::default()` initial value, no
    /// name, no pre-allocation.
    pub fn new() -> Self {
        CellBuilder {
            initial_value: None,
            name: None,
            capacity: 0,
            strategy: Strategy::host(),
        }
    }

    /// Factory for each context's first value
    pub fn initial_value<F>(mut self, initial_value: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.initial_value = Some(Box::new(initial_value));
        self
    }

    /// Label attached to this cell's log events
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Expected number of contexts, used to pre-size the shared table
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    #[cfg(test)]
    pub(crate) fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Build the cell.
    pub fn build(self) -> ContextLocalCell<T> {
        ContextLocalCell {
            storage: self.strategy.open(self.capacity),
            initial_value: self
                .initial_value
                .unwrap_or_else(|| Box::new(T::default) as Factory<T>),
            name: self.name,
        }
    }
}

impl<T> Default for CellBuilder<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl<T> ContextLocalCell<T> {
    /// Cell over an arbitrary backing, for exercising the guard
    pub(crate) fn over(storage: Box<dyn ContextStorage<T>>, initial_value: Factory<T>) -> Self {
        ContextLocalCell {
            storage,
            initial_value,
            name: Some(Cow::Borrowed("test")),
        }
    }
}
