//! Integration Tests for the Reactive Runtime
//!
//! These tests exercise the public surface end to end: wrapped state
//! driving effects through the scheduler, batching, and the keyed and
//! windowed reconcilers projecting reactive lists onto a host container.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use weft_core::{
    batch, untrack, DisposalRegistry, Effect, Host, KeyedList, ListHandle, Mode, Node,
    ScopedRegistry, SlotHost, Store, Value, Window, WindowedList,
};

/// Test host: a container of `u64` resource ids with mutation counters.
#[derive(Default)]
struct TestHost {
    entries: Mutex<Vec<u64>>,
    offsets: Mutex<HashMap<u64, f64>>,
    inserts: AtomicUsize,
    removes: AtomicUsize,
}

impl TestHost {
    fn contents(&self) -> Vec<u64> {
        self.entries.lock().unwrap().clone()
    }

    fn offset_of(&self, resource: u64) -> Option<f64> {
        self.offsets.lock().unwrap().get(&resource).copied()
    }

    fn remove_count(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }
}

impl Host<u64> for TestHost {
    fn insert(&self, resource: &u64) {
        self.entries.lock().unwrap().push(*resource);
        self.inserts.fetch_add(1, Ordering::SeqCst);
    }

    fn remove(&self, resource: &u64) {
        self.entries.lock().unwrap().retain(|r| r != resource);
        self.offsets.lock().unwrap().remove(resource);
        self.removes.fetch_add(1, Ordering::SeqCst);
    }
}

impl SlotHost<u64> for TestHost {
    fn place(&self, resource: &u64, offset: f64) {
        self.offsets.lock().unwrap().insert(*resource, offset);
    }
}

fn item(id: i64) -> Value {
    Value::record([("id", Value::Int(id))])
}

/// Read the item's id without subscribing the caller to the field.
fn record_key(value: &Value) -> i64 {
    untrack(|| {
        value
            .as_node()
            .and_then(|n| Store::wrap(n, Mode::Shallow).ok())
            .and_then(|s| s.get_value("id").as_int())
            .expect("item is a record with an id")
    })
}

/// An effect reading a key re-runs exactly once per changed write: once
/// at registration, once after the flush that carries the write.
#[test]
fn effect_runs_once_at_registration_and_once_per_flush() {
    let node = Node::record([("count", Value::Int(0))]);
    let counter = Store::wrap(&node, Mode::Shallow).unwrap();

    let runs = Arc::new(AtomicUsize::new(0));
    let runs_clone = runs.clone();
    let observed = counter.clone();
    let _fx = Effect::new(move || {
        let _ = observed.get_value("count");
        runs_clone.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(runs.load(Ordering::SeqCst), 1);

    counter.set("count", 1);

    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

/// No-op writes are silent end to end: `x.a = x.a` triggers nothing.
#[test]
fn noop_writes_do_not_rerun_effects() {
    let node = Node::record([("a", Value::Int(5)), ("b", Value::from("keep"))]);
    let store = Store::wrap(&node, Mode::Shallow).unwrap();

    let runs = Arc::new(AtomicUsize::new(0));
    let runs_clone = runs.clone();
    let observed = store.clone();
    let _fx = Effect::new(move || {
        let _ = observed.get_value("a");
        let _ = observed.get_value("b");
        runs_clone.fetch_add(1, Ordering::SeqCst);
    });

    store.set("a", 5);
    store.set("b", "keep");
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    store.set("a", 6);
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

/// Disposal is permanent and idempotent, even while dependencies keep
/// changing.
#[test]
fn disposed_effect_ignores_future_changes() {
    let node = Node::record([("count", Value::Int(0))]);
    let counter = Store::wrap(&node, Mode::Shallow).unwrap();

    let runs = Arc::new(AtomicUsize::new(0));
    let runs_clone = runs.clone();
    let observed = counter.clone();
    let fx = Effect::new(move || {
        let _ = observed.get_value("count");
        runs_clone.fetch_add(1, Ordering::SeqCst);
    });

    counter.set("count", 1);
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    fx.dispose();
    counter.set("count", 2);
    counter.set("count", 3);
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    fx.dispose();
    assert!(fx.is_disposed());
}

/// Two effects on the same key, three mutations in one batch: each effect
/// runs exactly once after the batch.
#[test]
fn batched_mutations_run_each_effect_once() {
    let node = Node::record([("n", Value::Int(0))]);
    let store = Store::wrap(&node, Mode::Shallow).unwrap();

    let first_runs = Arc::new(AtomicUsize::new(0));
    let second_runs = Arc::new(AtomicUsize::new(0));

    let observed = store.clone();
    let first_clone = first_runs.clone();
    let _first = Effect::new(move || {
        let _ = observed.get_value("n");
        first_clone.fetch_add(1, Ordering::SeqCst);
    });

    let observed = store.clone();
    let second_clone = second_runs.clone();
    let _second = Effect::new(move || {
        let _ = observed.get_value("n");
        second_clone.fetch_add(1, Ordering::SeqCst);
    });

    batch(|| {
        store.set("n", 1);
        store.set("n", 2);
        store.set("n", 3);

        // Still suppressed inside the window.
        assert_eq!(first_runs.load(Ordering::SeqCst), 1);
        assert_eq!(second_runs.load(Ordering::SeqCst), 1);
    });

    assert_eq!(first_runs.load(Ordering::SeqCst), 2);
    assert_eq!(second_runs.load(Ordering::SeqCst), 2);
}

/// Untracked reads never establish a subscription.
#[test]
fn untracked_reads_do_not_subscribe() {
    let node = Node::record([("a", Value::Int(0)), ("b", Value::Int(0))]);
    let store = Store::wrap(&node, Mode::Shallow).unwrap();

    let runs = Arc::new(AtomicUsize::new(0));
    let runs_clone = runs.clone();
    let observed = store.clone();
    let _fx = Effect::new(move || {
        let _ = observed.get_value("a");
        let _ = untrack(|| observed.get_value("b"));
        runs_clone.fetch_add(1, Ordering::SeqCst);
    });

    store.set("b", 9);
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    store.set("a", 9);
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

/// Scenario: a deep store's `items` field is reassigned to new lists; the
/// keyed reconciler renders new keys, reuses persisting ones, and cleans
/// up vanished ones exactly once.
#[test]
fn keyed_reconciler_follows_item_set() {
    let node = Node::record([("items", Value::list([]))]);
    let root = Store::wrap(&node, Mode::Deep).unwrap();

    let host = Arc::new(TestHost::default());
    let disposal: DisposalRegistry<u64> = DisposalRegistry::new();
    let renders = Arc::new(AtomicUsize::new(0));
    let cleanups = Arc::new(AtomicUsize::new(0));

    let keyed = {
        let root = root.clone();
        let renders = renders.clone();
        let cleanups = cleanups.clone();
        let disposal_in = disposal.clone();

        KeyedList::mount(
            host.clone(),
            move || root.list("items").expect("items is a list"),
            record_key,
            move |value| {
                renders.fetch_add(1, Ordering::SeqCst);
                let id = record_key(value) as u64;
                let cleanups = cleanups.clone();
                disposal_in.register(id, move |_| {
                    cleanups.fetch_add(1, Ordering::SeqCst);
                });
                id
            },
            disposal.clone(),
        )
    };

    // Empty source: nothing rendered.
    assert_eq!(renders.load(Ordering::SeqCst), 0);
    assert!(host.contents().is_empty());

    // Two fresh items: exactly two renders, in insertion order.
    root.set("items", Value::list([item(1), item(2)]));
    assert_eq!(renders.load(Ordering::SeqCst), 2);
    assert_eq!(host.contents(), vec![1, 2]);
    assert_eq!(keyed.len(), 2);

    // Drop id 1, keep id 2 (as a brand-new record with the same key):
    // one cleanup, zero renders - the resource is reused, not re-rendered.
    root.set("items", Value::list([item(2)]));
    assert_eq!(renders.load(Ordering::SeqCst), 2);
    assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    assert_eq!(host.contents(), vec![2]);
    assert_eq!(keyed.len(), 1);

    // Writing the same list node back is a no-op write; no pass runs.
    root.set("items", root.get_value("items"));
    assert_eq!(renders.load(Ordering::SeqCst), 2);
    assert_eq!(cleanups.load(Ordering::SeqCst), 1);

    keyed.unmount();
    assert!(host.contents().is_empty());
    assert_eq!(cleanups.load(Ordering::SeqCst), 2);
}

/// Structural mutations of the same list node (push/shift) flow through
/// the reconciler's whole-sequence subscription.
#[test]
fn structural_mutations_flow_through_reconciler() {
    let node = Node::record([("items", Value::list([item(1), item(2)]))]);
    let root = Store::wrap(&node, Mode::Deep).unwrap();

    let host = Arc::new(TestHost::default());
    let renders = Arc::new(AtomicUsize::new(0));

    let keyed = {
        let root = root.clone();
        let renders = renders.clone();

        KeyedList::mount(
            host.clone(),
            move || root.list("items").expect("items is a list"),
            record_key,
            move |value| {
                renders.fetch_add(1, Ordering::SeqCst);
                record_key(value) as u64
            },
            DisposalRegistry::new(),
        )
    };

    assert_eq!(host.contents(), vec![1, 2]);

    let list = root.list("items").unwrap();

    list.push(item(3));
    assert_eq!(renders.load(Ordering::SeqCst), 3);
    assert_eq!(host.contents(), vec![1, 2, 3]);

    let removed = list.shift();
    assert_eq!(record_key(&removed.unwrap()), 1);
    assert_eq!(host.contents(), vec![2, 3]);
    assert_eq!(host.remove_count(), 1);
    assert_eq!(keyed.len(), 2);

    // Batch a churn: one pass, net effect only.
    batch(|| {
        list.push(item(4));
        list.push(item(5));
        list.pop();
    });
    assert_eq!(host.contents(), vec![2, 3, 4]);
}

/// The windowed reconciler materializes the visible range plus buffer,
/// reuses overlap on scroll, and repositions survivors without re-render.
#[test]
fn windowed_reconciler_scrolls_with_minimal_churn() {
    let node = Node::record([("rows", Value::Node(Node::list((0..200).map(item))))]);
    let root = Store::wrap(&node, Mode::Deep).unwrap();

    let host = Arc::new(TestHost::default());
    let renders = Arc::new(AtomicUsize::new(0));

    let windowed = {
        let root = root.clone();
        let renders = renders.clone();

        WindowedList::mount(
            host.clone(),
            move || root.list("rows").expect("rows is a list"),
            record_key,
            move |value| {
                renders.fetch_add(1, Ordering::SeqCst);
                record_key(value) as u64
            },
            DisposalRegistry::new(),
            Window::new(20.0, 3).unwrap(),
        )
    };

    // Viewport over rows 0..10, plus the trailing buffer.
    windowed.set_viewport(0.0, 200.0);
    assert_eq!(windowed.len(), 13);

    let rendered_before = renders.load(Ordering::SeqCst);

    // Scroll down two rows: two new entries at the tail, overlap reused.
    windowed.set_viewport(40.0, 200.0);
    assert_eq!(renders.load(Ordering::SeqCst), rendered_before + 2);
    assert_eq!(windowed.len(), 15);

    // Offsets are index-derived.
    assert_eq!(host.offset_of(10), Some(200.0));

    windowed.unmount();
    assert!(host.contents().is_empty());
}

/// Per-entry scoped state survives across passes and dies on eviction.
#[test]
fn scoped_state_is_stable_per_key() {
    let registry = ScopedRegistry::new();

    let slot = registry
        .get_or_create("entry-7", || Node::record([("draft", Value::from("x"))]))
        .unwrap();
    slot.set("draft", "edited");

    let again = registry
        .get_or_create("entry-7", || panic!("slot exists; init must not run"))
        .unwrap();
    assert_eq!(again.get_value("draft"), Value::from("edited"));

    assert!(registry.evict("entry-7"));
    assert!(!registry.contains("entry-7"));

    let fresh = registry
        .get_or_create("entry-7", || Node::record([("draft", Value::from("x"))]))
        .unwrap();
    assert_eq!(fresh.get_value("draft"), Value::from("x"));
}

/// An effect that panics is routed to the error hook; the remaining queue
/// still runs and later flushes still work.
#[test]
fn effect_panics_do_not_poison_the_runtime() {
    let node = Node::record([("n", Value::Int(0))]);
    let store = Store::wrap(&node, Mode::Shallow).unwrap();

    let runs = Arc::new(AtomicUsize::new(0));

    let observed = store.clone();
    let _bad = Effect::new(move || {
        if observed.get_value("n").as_int() == Some(1) {
            panic!("render failure");
        }
    });

    let observed = store.clone();
    let runs_clone = runs.clone();
    let _good = Effect::new(move || {
        let _ = observed.get_value("n");
        runs_clone.fetch_add(1, Ordering::SeqCst);
    });

    // The bad effect panics during this flush; the good one still runs.
    store.set("n", 1);
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    store.set("n", 2);
    assert_eq!(runs.load(Ordering::SeqCst), 3);
}

/// A reactive list read inside a windowed pass plus an external refresh:
/// both re-trigger paths land on the same reconciliation.
#[test]
fn windowed_refresh_and_data_changes_compose() {
    let list_node = Node::list((0..10).map(item));
    let list = ListHandle::wrap(&list_node, Mode::Shallow).unwrap();

    let host = Arc::new(TestHost::default());

    let windowed = {
        let list = list.clone();
        WindowedList::mount(
            host.clone(),
            move || list.clone(),
            record_key,
            |value| record_key(value) as u64,
            DisposalRegistry::new(),
            Window::new(10.0, 1).unwrap(),
        )
    };

    windowed.set_viewport(0.0, 100.0);
    assert_eq!(windowed.len(), 10);

    // Data change shrinks the list under the same viewport.
    list.set_len(4);
    windowed.refresh();
    assert_eq!(windowed.len(), 4);
}
