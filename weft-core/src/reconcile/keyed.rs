//! Keyed List Reconciler
//!
//! Keeps a host container's entry set in 1:1 correspondence with a
//! reactive list, reusing entries whose key persists. The whole diff is a
//! single effect: reading the source list inside it establishes the
//! subscription, so any structural change to the list re-runs the
//! reconciliation automatically.
//!
//! Per pass:
//! - a key seen for the first time ever renders a resource and inserts it
//!   into the host,
//! - a key that persists from the previous pass is left untouched -
//!   neither re-rendered nor moved (position stability, not sort-order
//!   stability, is the contract),
//! - a key that vanished has its resource disposed (via the
//!   [`DisposalRegistry`]) and removed from the host.
//!
//! # Duplicate keys
//!
//! Keys must be unique per pass; this is a caller contract, not a checked
//! error. A duplicate occurrence renders a second resource and silently
//! overwrites the cache entry, orphaning the first resource's cleanup
//! responsibility.

use std::hash::Hash;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;

use crate::reactive::Effect;
use crate::state::{ListHandle, Value};

use super::disposal::DisposalRegistry;
use super::host::Host;

/// A mounted keyed reconciliation.
///
/// Dropping the handle disposes the reconciliation effect (no further
/// passes run) but leaves current entries in the host; call
/// [`unmount`](KeyedList::unmount) to tear those down too.
pub struct KeyedList<K, R> {
    effect: Effect,
    entries: Arc<Mutex<IndexMap<K, R>>>,
    host: Arc<dyn Host<R>>,
    disposal: DisposalRegistry<R>,
}

impl<K, R> KeyedList<K, R>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    R: Clone + Eq + Hash + Send + Sync + 'static,
{
    /// Mount a keyed reconciliation of `items` into `host`.
    ///
    /// `items` is called on every pass; both that read and the snapshot
    /// of the returned list happen inside the reconciliation effect, so
    /// the subscription covers structural changes *and* reassignment of
    /// the list itself (when `items` reads a field of a deep store).
    ///
    /// `key_fn` extracts the identity of an item; `render` materializes a
    /// resource for an item whose key is new. The first pass runs before
    /// this returns.
    pub fn mount<H, IF, KF, RF>(
        host: Arc<H>,
        items: IF,
        key_fn: KF,
        render: RF,
        disposal: DisposalRegistry<R>,
    ) -> Self
    where
        H: Host<R> + 'static,
        IF: Fn() -> ListHandle + Send + Sync + 'static,
        KF: Fn(&Value) -> K + Send + Sync + 'static,
        RF: Fn(&Value) -> R + Send + Sync + 'static,
    {
        let host: Arc<dyn Host<R>> = host;
        let entries: Arc<Mutex<IndexMap<K, R>>> = Arc::new(Mutex::new(IndexMap::new()));

        let effect = {
            let entries = Arc::clone(&entries);
            let host = Arc::clone(&host);
            let disposal = disposal.clone();

            Effect::new(move || {
                // The subscription: any structural change to the current
                // list, or reassignment of the list itself, re-runs this.
                let items = items().to_vec();

                let mut entries = entries.lock();
                let mut seen: IndexSet<K> = IndexSet::with_capacity(items.len());
                let mut rendered = 0usize;

                for item in &items {
                    let key = key_fn(item);
                    let duplicate = !seen.insert(key.clone());

                    if !duplicate && entries.contains_key(&key) {
                        // Persisting entry: untouched.
                        continue;
                    }

                    // New key - or a duplicate, which overwrites (see the
                    // module docs on the uniqueness contract).
                    let resource = render(item);
                    host.insert(&resource);
                    entries.insert(key, resource);
                    rendered += 1;
                }

                let stale: Vec<K> = entries
                    .keys()
                    .filter(|key| !seen.contains(*key))
                    .cloned()
                    .collect();
                let removed = stale.len();

                for key in stale {
                    if let Some(resource) = entries.shift_remove(&key) {
                        disposal.run_and_clear(&resource);
                        host.remove(&resource);
                    }
                }

                tracing::debug!(
                    total = entries.len(),
                    rendered,
                    removed,
                    "reconciled keyed list"
                );
            })
        };

        Self {
            effect,
            entries,
            host,
            disposal,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Stop reconciling and tear down every remaining entry.
    ///
    /// The effect is disposed first, so no pass can run concurrently with
    /// the teardown; each cached resource then goes through the same
    /// dispose-and-remove path a vanished key would. No entry outlives the
    /// reconciler.
    pub fn unmount(self) {
        self.effect.dispose();

        let mut entries = self.entries.lock();
        for (_, resource) in entries.drain(..) {
            self.disposal.run_and_clear(&resource);
            self.host.remove(&resource);
        }
    }
}

impl<K, R> std::fmt::Debug for KeyedList<K, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedList")
            .field("effect", &self.effect)
            .finish()
    }
}
