//! Test double for the host contract: a container of `u64` resource ids
//! that counts every mutation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::host::{Host, SlotHost};

#[derive(Default)]
pub(crate) struct CountingHost {
    entries: Mutex<Vec<u64>>,
    offsets: Mutex<HashMap<u64, f64>>,
    inserts: AtomicUsize,
    removes: AtomicUsize,
    places: AtomicUsize,
}

impl CountingHost {
    pub(crate) fn contents(&self) -> Vec<u64> {
        self.entries.lock().clone()
    }

    pub(crate) fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub(crate) fn remove_count(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }

    pub(crate) fn place_count(&self) -> usize {
        self.places.load(Ordering::SeqCst)
    }

    pub(crate) fn offset_of(&self, resource: u64) -> Option<f64> {
        self.offsets.lock().get(&resource).copied()
    }
}

impl Host<u64> for CountingHost {
    fn insert(&self, resource: &u64) {
        self.entries.lock().push(*resource);
        self.inserts.fetch_add(1, Ordering::SeqCst);
    }

    fn remove(&self, resource: &u64) {
        self.entries.lock().retain(|r| r != resource);
        self.offsets.lock().remove(resource);
        self.removes.fetch_add(1, Ordering::SeqCst);
    }
}

impl SlotHost<u64> for CountingHost {
    fn place(&self, resource: &u64, offset: f64) {
        self.offsets.lock().insert(*resource, offset);
        self.places.fetch_add(1, Ordering::SeqCst);
    }
}
