//! Table of Python objects currently referenced from the host.
//!
//! Every object handed to host code is stored here once, together with a count
//! of the [`PyObject`](crate::PyObject) leases pointing at it. The table owns the
//! single strong reference the host keeps on the object; it is given back for
//! dropping when the last lease goes away. Releasing a handle that is not in the
//! table is a double release and is reported instead of touching the refcount.

use ahash::AHashMap;

use crate::{
    Handle,
    error::{Error, Result},
};

#[derive(Debug)]
struct Slot<T> {
    object: T,
    leases: usize,
}

#[derive(Debug)]
pub(crate) struct ObjectTable<T> {
    slots: AHashMap<Handle, Slot<T>>,
}

impl<T> Default for ObjectTable<T> {
    fn default() -> Self {
        Self {
            slots: AHashMap::new(),
        }
    }
}

impl<T> ObjectTable<T> {
    /// Records one more lease on `handle`, storing the reference produced by
    /// `object` if the handle is not live yet. Returns the new lease count.
    pub fn acquire(&mut self, handle: Handle, object: impl FnOnce() -> T) -> usize {
        let slot = self
            .slots
            .entry(handle)
            .or_insert_with(|| Slot { object: object(), leases: 0 });
        slot.leases += 1;
        slot.leases
    }

    /// Adds a lease to an already live handle.
    pub fn lease(&mut self, handle: Handle) -> Result<usize> {
        match self.slots.get_mut(&handle) {
            Some(slot) => {
                slot.leases += 1;
                Ok(slot.leases)
            }
            None => Err(Error::usage(format!("handle {handle} is not a live object"))),
        }
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.slots.get(&handle).map(|slot| &slot.object)
    }

    /// Drops one lease. Yields the stored reference when it was the last one.
    pub fn release(&mut self, handle: Handle) -> Result<Option<T>> {
        let Some(slot) = self.slots.get_mut(&handle) else {
            return Err(Error::usage(format!("double release of handle {handle}")));
        };
        slot.leases -= 1;
        if slot.leases > 0 {
            return Ok(None);
        }
        Ok(self.slots.remove(&handle).map(|slot| slot.object))
    }

    /// Empties the table, returning every stored reference.
    pub fn drain(&mut self) -> Vec<T> {
        self.slots.drain().map(|(_, slot)| slot.object).collect()
    }

    pub fn leases(&self, handle: Handle) -> usize {
        self.slots.get(&handle).map_or(0, |slot| slot.leases)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
}
