//! Thread-affine backing
//!
//! All cells share one thread-local map from cell id to a boxed `Rc<T>`;
//! reads clone the `Rc` under the borrow and the value after it. Every
//! access goes through `LocalKey::try_with`, so a slot destroyed during
//! thread teardown surfaces as `StorageError::Disposed` instead of a panic.
//! Values are dropped when their thread exits.

use super::{ContextStorage, Strategy};
use crate::error::Result;
use rustc_hash::FxHashMap;
use std::any::Any;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

thread_local! {
    static SLOTS: RefCell<FxHashMap<u64, Box<dyn Any>>> = RefCell::new(FxHashMap::default());
}

/// Cell ids are never reused, so a stale slot can't be read as another type
static NEXT_CELL_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) struct ThreadAffine<T> {
    id: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ThreadAffine<T> {
    pub(crate) fn new() -> Self {
        ThreadAffine {
            id: NEXT_CELL_ID.fetch_add(1, Ordering::Relaxed),
            _marker: PhantomData,
        }
    }
}

impl<T> ContextStorage<T> for ThreadAffine<T>
where
    T: Clone + 'static,
{
    fn load(&self, init: &dyn Fn() -> T) -> Result<T> {
        let cached = SLOTS.try_with(|slots| {
            slots
                .borrow()
                .get(&self.id)
                .and_then(|slot| slot.downcast_ref::<Rc<T>>())
                .map(Rc::clone)
        })?;
        if let Some(value) = cached {
            return Ok(T::clone(&value));
        }

        // No borrow is held while the factory or `T::clone` runs.
        let value = init();
        let stored: Box<dyn Any> = Box::new(Rc::new(value.clone()));
        let replaced = SLOTS.try_with(|slots| slots.borrow_mut().insert(self.id, stored))?;
        drop(replaced);
        Ok(value)
    }

    fn store(&self, value: T) -> Result<()> {
        let stored: Box<dyn Any> = Box::new(Rc::new(value));
        let replaced = SLOTS.try_with(|slots| slots.borrow_mut().insert(self.id, stored))?;
        // Old value drops after the borrow is released.
        drop(replaced);
        Ok(())
    }

    fn strategy(&self) -> Strategy {
        Strategy::ThreadAffine
    }
}
