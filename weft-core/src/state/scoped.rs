//! Scoped State Registry
//!
//! A keyed store of shallow-wrapped records with explicit creation and
//! eviction, used for ephemeral per-entry state (per-row edit buffers and
//! the like) that outlives a single reconciliation pass but not the entry
//! itself.
//!
//! Eviction only drops the slot. Effects that read the slot's store are
//! not disposed here - callers dispose their own effects first; that
//! ordering is a contract, not something the registry enforces.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Error;

use super::store::{Mode, Store};
use super::value::Node;

/// Keyed registry of shallow [`Store`] slots.
#[derive(Default)]
pub struct ScopedRegistry {
    slots: RwLock<HashMap<Arc<str>, Store>>,
}

impl ScopedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the slot for `key`, creating it from `init` on first request.
    ///
    /// `init` runs only when the slot is absent and must produce a record
    /// node; the node is wrapped in shallow mode and retained until
    /// [`evict`](Self::evict).
    pub fn get_or_create(&self, key: &str, init: impl FnOnce() -> Node) -> Result<Store, Error> {
        if let Some(store) = self.slots.read().get(key) {
            return Ok(store.clone());
        }

        let store = Store::wrap(&init(), Mode::Shallow)?;

        // Re-check under the write lock; first creation wins.
        let mut slots = self.slots.write();
        Ok(slots
            .entry(Arc::from(key))
            .or_insert(store)
            .clone())
    }

    /// Remove the slot for `key`. Returns whether a slot was present;
    /// evicting an absent key is a safe no-op.
    pub fn evict(&self, key: &str) -> bool {
        self.slots.write().remove(key).is_some()
    }

    /// Check whether a slot exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.slots.read().contains_key(key)
    }

    /// Number of live slots.
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }
}

impl std::fmt::Debug for ScopedRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedRegistry")
            .field("slots", &self.len())
            .finish()
    }
}
