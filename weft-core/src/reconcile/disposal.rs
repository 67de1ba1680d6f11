//! Disposal Registry
//!
//! An out-of-band mapping from an external resource to a cleanup
//! callback. The embedding application registers cleanups for resources
//! that need teardown (event unbinding, handle release); the reconcilers
//! call [`run_and_clear`](DisposalRegistry::run_and_clear) when they
//! remove a resource.
//!
//! The entry is removed from the map *before* the callback runs, so a
//! cleanup fires exactly once no matter how many removal paths race for
//! it, and no shard lock is held while user code executes.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;

type Cleanup<R> = Box<dyn FnOnce(&R) + Send + Sync>;

/// Shared resource → cleanup mapping.
///
/// Cheap to clone; clones share the same map.
pub struct DisposalRegistry<R> {
    cleanups: Arc<DashMap<R, Cleanup<R>>>,
}

impl<R: Eq + Hash> DisposalRegistry<R> {
    pub fn new() -> Self {
        Self {
            cleanups: Arc::new(DashMap::new()),
        }
    }

    /// Register a cleanup for a resource.
    ///
    /// Re-registering replaces the previous callback; only the latest one
    /// will run.
    pub fn register(&self, resource: R, cleanup: impl FnOnce(&R) + Send + Sync + 'static) {
        self.cleanups.insert(resource, Box::new(cleanup));
    }

    /// Invoke and remove the cleanup for a resource, if one is registered.
    ///
    /// Returns whether a cleanup ran. Unregistered resources are a safe
    /// no-op.
    pub fn run_and_clear(&self, resource: &R) -> bool {
        match self.cleanups.remove(resource) {
            Some((resource, cleanup)) => {
                cleanup(&resource);
                true
            }
            None => false,
        }
    }

    /// Number of registered cleanups.
    pub fn len(&self) -> usize {
        self.cleanups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cleanups.is_empty()
    }
}

impl<R> Clone for DisposalRegistry<R> {
    fn clone(&self) -> Self {
        Self {
            cleanups: Arc::clone(&self.cleanups),
        }
    }
}

impl<R: Eq + Hash> Default for DisposalRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Eq + Hash> std::fmt::Debug for DisposalRegistry<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisposalRegistry")
            .field("registered", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn cleanup_runs_exactly_once() {
        let registry: DisposalRegistry<u32> = DisposalRegistry::new();
        let calls = Arc::new(AtomicI32::new(0));

        let calls_clone = calls.clone();
        registry.register(7, move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(registry.run_and_clear(&7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Second call finds nothing.
        assert!(!registry.run_and_clear(&7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unregistered_resource_is_noop() {
        let registry: DisposalRegistry<u32> = DisposalRegistry::new();
        assert!(!registry.run_and_clear(&42));
    }

    #[test]
    fn reregistering_replaces_the_cleanup() {
        let registry: DisposalRegistry<u32> = DisposalRegistry::new();
        let first = Arc::new(AtomicI32::new(0));
        let second = Arc::new(AtomicI32::new(0));

        let first_clone = first.clone();
        registry.register(1, move |_| {
            first_clone.fetch_add(1, Ordering::SeqCst);
        });

        let second_clone = second.clone();
        registry.register(1, move |_| {
            second_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(registry.run_and_clear(&1));
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }
}
