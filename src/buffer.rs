//! Shared flat storage.
//!
//! A [`Buffer`] is the single backing store of a base array and every view of
//! it. Sharing is reference counted: the buffer lives as long as its longest
//! holder, and cloning the handle is what makes a view alias its base. A
//! shared generation counter is bumped on every write; caches of derived
//! values record the generation they were computed at and recompute when it
//! has moved on.

use crate::element::Element;
use crate::{ArrayError, Result};
use log::error;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Reference-counted flat storage of one element type.
///
/// Deliberately `!Send`: every operation assumes exclusive access for its
/// duration, and `Rc`/`RefCell` encode that single-threaded contract in the
/// type system.
#[derive(Debug)]
pub struct Buffer<T> {
    data: Rc<RefCell<Vec<T>>>,
    generation: Rc<Cell<u64>>,
}

impl<T: Element> Buffer<T> {
    /// Allocate `len` zero-filled slots.
    ///
    /// # Errors
    /// `AllocationFailed` when the allocator refuses the request. The failure
    /// is fatal to the operation; it is never retried smaller.
    pub fn zeroed(len: usize) -> Result<Self> {
        let mut v: Vec<T> = Vec::new();
        if v.try_reserve_exact(len).is_err() {
            error!("buffer allocation of {} slots failed", len);
            return Err(ArrayError::AllocationFailed { elems: len });
        }
        v.resize(len, T::zero());
        Ok(Self::from_vec(v))
    }
}

impl<T> Buffer<T> {
    /// Wrap an existing vector, taking ownership.
    pub fn from_vec(data: Vec<T>) -> Self {
        Self {
            data: Rc::new(RefCell::new(data)),
            generation: Rc::new(Cell::new(0)),
        }
    }

    /// A second handle to the same storage. Writes through either handle are
    /// visible through both.
    pub fn share(&self) -> Self {
        Self {
            data: Rc::clone(&self.data),
            generation: Rc::clone(&self.generation),
        }
    }

    /// Number of live holders of this storage.
    pub fn holders(&self) -> usize {
        Rc::strong_count(&self.data)
    }

    /// Whether two handles alias the same storage.
    pub fn same_storage(&self, other: &Buffer<T>) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.borrow().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Generation at the last write.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    /// Record a mutation. Called once per writing operation.
    #[inline]
    pub fn bump(&self) {
        self.generation.set(self.generation.get() + 1);
    }

    /// Run `f` over the slots read-only.
    pub fn with_slice<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.data.borrow())
    }

    /// Run `f` over the slots mutably and bump the generation.
    pub fn with_slice_mut<R>(&self, f: impl FnOnce(&mut [T]) -> R) -> R {
        let r = f(&mut self.data.borrow_mut());
        self.bump();
        r
    }
}

impl<T: Copy> Buffer<T> {
    /// Read one slot.
    pub fn get(&self, slot: usize) -> Result<T> {
        let data = self.data.borrow();
        data.get(slot).copied().ok_or(ArrayError::OutOfBounds {
            index: slot,
            extent: data.len(),
        })
    }

    /// Write one slot and bump the generation.
    pub fn set(&self, slot: usize, value: T) -> Result<()> {
        let mut data = self.data.borrow_mut();
        let extent = data.len();
        let cell = data.get_mut(slot).ok_or(ArrayError::OutOfBounds {
            index: slot,
            extent,
        })?;
        *cell = value;
        drop(data);
        self.bump();
        Ok(())
    }

    /// Copy out all slots.
    pub fn snapshot(&self) -> Vec<T> {
        self.data.borrow().clone()
    }
}
