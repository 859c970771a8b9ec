//! Propagating backing
//!
//! Two levels: the calling context's [`ContextKey`] comes from
//! [`crate::context`], and values live in a `DashMap` keyed by it.
//!
//! # Thread Safety
//!
//! - load(): read through a shard read lock, insert through a shard write lock
//! - store(): only locks the shard holding the caller's key
//! - Entries are `Arc<T>`: the `Arc` is cloned under the shard lock, `T`
//!   after it is released, so neither the factory nor `T::clone` runs
//!   while a shard lock is held
//!
//! A key only ever belongs to one context, and a context runs on one thread
//! at a time, so two callers never race to create the same entry.

use super::{ContextStorage, Strategy};
use crate::context::current_lineage;
use crate::error::Result;
use crate::key::ContextKey;
use dashmap::DashMap;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;
use std::sync::Arc;
use tracing::trace;

type FxBuildHasher = BuildHasherDefault<FxHasher>;

pub(crate) struct Propagating<T> {
    table: DashMap<ContextKey, Arc<T>, FxBuildHasher>,
}

impl<T> Propagating<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Propagating {
            table: DashMap::with_capacity_and_hasher(capacity, FxBuildHasher::default()),
        }
    }

    /// Number of contexts that have an entry
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.table.len()
    }
}

impl<T> ContextStorage<T> for Propagating<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn load(&self, init: &dyn Fn() -> T) -> Result<T> {
        let lineage = current_lineage()?;
        let key = *lineage.key();

        let cached = self.table.get(&key).map(|entry| Arc::clone(entry.value()));
        if let Some(value) = cached {
            return Ok(T::clone(&value));
        }

        // First access: seed from the nearest ancestor that has a value.
        let seed = lineage.ancestors().find_map(|ancestor| {
            self.table
                .get(ancestor)
                .map(|entry| (*ancestor, Arc::clone(entry.value())))
        });
        let value = match seed {
            Some((ancestor, value)) => {
                trace!(key = %key, from = %ancestor, "seeded context entry from ancestor");
                T::clone(&value)
            }
            None => init(),
        };

        let stored = Arc::new(value.clone());
        self.table.entry(key).or_insert(stored);
        Ok(value)
    }

    fn store(&self, value: T) -> Result<()> {
        let lineage = current_lineage()?;
        let replaced = self.table.insert(*lineage.key(), Arc::new(value));
        // Old value drops after the shard lock is released.
        drop(replaced);
        Ok(())
    }

    fn strategy(&self) -> Strategy {
        Strategy::Propagating
    }
}
