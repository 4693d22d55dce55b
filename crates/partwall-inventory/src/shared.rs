#![forbid(unsafe_code)]

//! Thread-safe handle over one [`Inventory`].
//!
//! A single global mutex serializes every request, so each check-and-commit
//! runs to completion before the next one validates.

use std::sync::{Arc, Mutex, PoisonError};

use crate::inventory::Inventory;

#[derive(Debug, Clone, Default)]
pub struct SharedInventory {
    inner: Arc<Mutex<Inventory>>,
}

impl SharedInventory {
    #[must_use]
    pub fn new(inventory: Inventory) -> Self {
        Self {
            inner: Arc::new(Mutex::new(inventory)),
        }
    }

    /// Run `f` with exclusive access to the inventory.
    ///
    /// A panic in an earlier request poisons nothing: every mutation commits
    /// atomically, so the state behind a poisoned lock is still consistent.
    pub fn with<R>(&self, f: impl FnOnce(&mut Inventory) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}
