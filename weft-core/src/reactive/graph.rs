//! Dependency Graph
//!
//! The graph is the substrate of the runtime: a bidirectional mapping
//! between `(target, key)` pairs and the effects subscribed to them.
//!
//! # How It Works
//!
//! 1. When a wrapped value is read inside an effect run, the wrapper calls
//!    [`track`]. The pair gains the running effect as a subscriber, and the
//!    effect records the pair so it can unsubscribe before its next run.
//!
//! 2. When a wrapped value changes, the wrapper calls [`trigger`] (or one
//!    of its sequence-aware variants). All subscribers of the affected
//!    pairs are collected into a single deduplicated set and handed to the
//!    scheduler.
//!
//! 3. Before an effect re-runs, [`unsubscribe`] removes it from every pair
//!    it subscribed to on the previous run, so dependencies dropped by a
//!    conditional read do not keep notifying it.
//!
//! Entries whose subscriber set becomes empty are retained; they are
//! harmless and will be reused on the next read of the same pair.
//!
//! # Thread Safety
//!
//! The maps are process-wide, behind `parking_lot` rwlocks. Locks are
//! never held while effects run: triggers collect subscribers first, drop
//! the lock, then dispatch to the scheduler.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use smallvec::SmallVec;

use super::effect::EffectId;
use super::scheduler;

/// Unique identifier for a tracked target (a wrapped record or list).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(u64);

impl TargetId {
    /// Generate a new unique target ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for TargetId {
    fn default() -> Self {
        Self::new()
    }
}

/// A property key within a tracked target.
///
/// Record fields and list indices are explicit variants rather than
/// stringly-typed property names, so trigger logic dispatches on the tag.
/// `Len` is the list length pseudo-property; `Items` is the reserved
/// content marker subscribed by whole-sequence reads and fired by every
/// structural list mutation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A named record field.
    Field(Arc<str>),
    /// A list index.
    Index(usize),
    /// The list length pseudo-property.
    Len,
    /// The whole-sequence content marker.
    Items,
}

impl Key {
    /// Build a field key from a name.
    pub fn field(name: &str) -> Self {
        Self::Field(Arc::from(name))
    }
}

type Pair = (TargetId, Key);

// Forward map: which effects subscribe to a (target, key) pair.
static DEPENDENTS: OnceLock<RwLock<HashMap<Pair, HashSet<EffectId>>>> = OnceLock::new();

// Reverse map: which pairs an effect subscribed to during its last run.
static SUBSCRIPTIONS: OnceLock<RwLock<HashMap<EffectId, HashSet<Pair>>>> = OnceLock::new();

fn dependents() -> &'static RwLock<HashMap<Pair, HashSet<EffectId>>> {
    DEPENDENTS.get_or_init(|| RwLock::new(HashMap::new()))
}

fn subscriptions() -> &'static RwLock<HashMap<EffectId, HashSet<Pair>>> {
    SUBSCRIPTIONS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Record that the currently running effect read `(target, key)`.
///
/// No-op when no effect is running or reads are untracked. Re-tracking a
/// pair already recorded during this run is an idempotent cheap no-op.
pub fn track(target: TargetId, key: Key) {
    let Some(effect_id) = super::context::tracking_target() else {
        return;
    };

    let pair = (target, key);

    dependents()
        .write()
        .entry(pair.clone())
        .or_default()
        .insert(effect_id);

    subscriptions()
        .write()
        .entry(effect_id)
        .or_default()
        .insert(pair);
}

/// Notify all effects subscribed to `(target, key)` that the value changed.
pub fn trigger(target: TargetId, key: Key) {
    trigger_keys(target, &[key]);
}

/// Notify subscribers of a list index write.
///
/// When the index lies outside the populated range (an append beyond the
/// end), subscribers of `Len` are notified as well, without paying that
/// cost on every in-place index write.
pub fn trigger_index(target: TargetId, index: usize, populated_len: usize) {
    if index >= populated_len {
        trigger_keys(target, &[Key::Index(index), Key::Len]);
    } else {
        trigger_keys(target, &[Key::Index(index)]);
    }
}

/// Notify subscribers of several keys of one target at once.
///
/// Subscribers found under multiple keys are collected into a single set,
/// so an effect reading both (say) an index and the length is scheduled
/// once, not once per key.
pub fn trigger_keys(target: TargetId, keys: &[Key]) {
    let affected: SmallVec<[EffectId; 8]> = {
        let map = dependents().read();
        let mut collected: SmallVec<[EffectId; 8]> = SmallVec::new();
        for key in keys {
            if let Some(set) = map.get(&(target, key.clone())) {
                for id in set {
                    if !collected.contains(id) {
                        collected.push(*id);
                    }
                }
            }
        }
        collected
    };
    // Lock released before dispatch: scheduling may flush, which re-enters
    // track/trigger from effect bodies.

    for id in affected {
        scheduler::schedule(id);
    }
}

/// Remove an effect from every pair it subscribed to.
///
/// See the effect lifecycle in [`super::effect`] for when this runs.
///
/// Called before each re-run (so the next run collects a fresh set) and on
/// disposal (so no entry retains a disposed effect).
pub(crate) fn unsubscribe(effect_id: EffectId) {
    let pairs = subscriptions().write().remove(&effect_id);

    let Some(pairs) = pairs else {
        return;
    };

    let mut map = dependents().write();
    for pair in pairs {
        if let Some(set) = map.get_mut(&pair) {
            set.remove(&effect_id);
        }
    }
}

/// Number of effects currently subscribed to a pair.
///
/// Diagnostic accessor, used by tests to observe graph state.
pub fn dependent_count(target: TargetId, key: Key) -> usize {
    dependents()
        .read()
        .get(&(target, key))
        .map(|set| set.len())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::super::context::TrackingScope;
    use super::*;

    #[test]
    fn target_ids_are_unique() {
        let a = TargetId::new();
        let b = TargetId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn track_outside_effect_is_noop() {
        let target = TargetId::new();

        track(target, Key::field("name"));

        assert_eq!(dependent_count(target, Key::field("name")), 0);
    }

    #[test]
    fn track_registers_active_effect() {
        let target = TargetId::new();
        let effect_id = EffectId::new();

        {
            let _scope = TrackingScope::enter(effect_id);
            track(target, Key::field("name"));
        }

        assert_eq!(dependent_count(target, Key::field("name")), 1);

        unsubscribe(effect_id);
        assert_eq!(dependent_count(target, Key::field("name")), 0);
    }

    #[test]
    fn retracking_same_pair_is_idempotent() {
        let target = TargetId::new();
        let effect_id = EffectId::new();

        {
            let _scope = TrackingScope::enter(effect_id);
            track(target, Key::Len);
            track(target, Key::Len);
            track(target, Key::Len);
        }

        assert_eq!(dependent_count(target, Key::Len), 1);

        unsubscribe(effect_id);
    }

    #[test]
    fn unsubscribe_clears_all_pairs() {
        let target = TargetId::new();
        let effect_id = EffectId::new();

        {
            let _scope = TrackingScope::enter(effect_id);
            track(target, Key::field("a"));
            track(target, Key::field("b"));
            track(target, Key::Index(3));
        }

        assert_eq!(dependent_count(target, Key::field("a")), 1);
        assert_eq!(dependent_count(target, Key::field("b")), 1);
        assert_eq!(dependent_count(target, Key::Index(3)), 1);

        unsubscribe(effect_id);

        assert_eq!(dependent_count(target, Key::field("a")), 0);
        assert_eq!(dependent_count(target, Key::field("b")), 0);
        assert_eq!(dependent_count(target, Key::Index(3)), 0);
    }

    #[test]
    fn unsubscribe_unknown_effect_is_noop() {
        unsubscribe(EffectId::new());
    }
}
