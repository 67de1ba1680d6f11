//! Effect Scheduler
//!
//! Two explicit queues drained by a driver loop - the event-loop
//! equivalent of microtask and idle-callback scheduling:
//!
//! - The **normal** queue is an insertion-ordered set. Scheduling an
//!   effect already pending is a no-op (coalescing), and a flush processes
//!   a snapshot of the set taken at the top of each pass, so effects
//!   scheduled *during* a pass run in the next pass, never re-entrantly.
//!
//! - The **idle** queue is drained only once the normal queue (and the
//!   task queue) is empty.
//!
//! A task queue of one-shot callbacks rides the normal tier; each pass
//! runs its snapshot of effects first, then its snapshot of tasks. Batch
//! post-flush callbacks land here.
//!
//! Outside a batch, scheduling an effect flushes immediately unless a
//! flush is already running - the flush itself is the suspension boundary.
//! Embedders that batch externally can drain explicitly with [`tick`].
//!
//! A runaway effect that keeps rescheduling itself is cut off after a
//! bounded number of passes rather than looping forever.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use indexmap::IndexSet;
use parking_lot::Mutex;

use super::batch;
use super::effect::{self, EffectId};

/// One-shot callback run on the normal tier after the effects of its pass.
pub(crate) type Task = Box<dyn FnOnce() + Send>;

/// Passes per flush before we assume an effect keeps triggering itself.
const MAX_FLUSH_PASSES: usize = 1000;

struct SchedulerState {
    pending: Mutex<IndexSet<EffectId>>,
    idle: Mutex<IndexSet<EffectId>>,
    tasks: Mutex<Vec<Task>>,
    flushing: AtomicBool,
}

static STATE: OnceLock<SchedulerState> = OnceLock::new();

fn state() -> &'static SchedulerState {
    STATE.get_or_init(|| SchedulerState {
        pending: Mutex::new(IndexSet::new()),
        idle: Mutex::new(IndexSet::new()),
        tasks: Mutex::new(Vec::new()),
        flushing: AtomicBool::new(false),
    })
}

/// Queue an effect for execution on its priority tier.
///
/// Unknown and disposed ids are dropped silently - the queues hold ids,
/// not owners, so an effect disposed while pending simply stops resolving.
pub(crate) fn schedule(id: EffectId) {
    let Some(inner) = effect::lookup(id) else {
        return;
    };
    if inner.is_disposed() {
        return;
    }

    match inner.priority() {
        effect::Priority::Normal => {
            state().pending.lock().insert(id);
        }
        effect::Priority::Idle => {
            state().idle.lock().insert(id);
        }
    }
    drop(inner);

    if batch::is_batching() {
        return;
    }

    flush();
}

/// Queue a one-shot callback behind the currently pending effects.
pub(crate) fn enqueue_task(task: Task) {
    state().tasks.lock().push(task);
}

/// Drain both queues until no work remains.
///
/// Public so embedders can force a drain at a boundary of their choosing;
/// every internal schedule outside a batch drains automatically.
pub fn tick() {
    flush();
}

pub(crate) fn flush() {
    let state = state();

    // A flush is already draining; whatever we queued will be picked up
    // by one of its later passes.
    if state.flushing.swap(true, Ordering::SeqCst) {
        return;
    }

    let mut passes = 0usize;

    loop {
        let effects: Vec<EffectId> = state.pending.lock().drain(..).collect();
        let tasks: Vec<Task> = std::mem::take(&mut *state.tasks.lock());

        if effects.is_empty() && tasks.is_empty() {
            // Normal tier drained: give the idle tier one pass.
            let idle: Vec<EffectId> = state.idle.lock().drain(..).collect();
            if idle.is_empty() {
                break;
            }

            tracing::trace!(count = idle.len(), "flushing idle effects");
            for id in idle {
                run_effect(id);
            }
            continue;
        }

        passes += 1;
        if passes > MAX_FLUSH_PASSES {
            state.flushing.store(false, Ordering::SeqCst);
            panic!(
                "maximum update depth exceeded; an effect keeps scheduling \
                 itself on every run"
            );
        }

        tracing::trace!(
            effects = effects.len(),
            tasks = tasks.len(),
            pass = passes,
            "flush pass"
        );

        for id in effects {
            run_effect(id);
        }
        for task in tasks {
            run_task(task);
        }
    }

    state.flushing.store(false, Ordering::SeqCst);
}

fn run_effect(id: EffectId) {
    if let Some(inner) = effect::lookup(id) {
        inner.run();
    }
}

fn run_task(task: Task) {
    // Same containment as effect bodies: a panicking callback is reported,
    // not propagated into the flush loop.
    if let Err(payload) = catch_unwind(AssertUnwindSafe(task)) {
        effect::report(payload);
    }
}

#[cfg(test)]
mod tests {
    use super::super::effect::Effect;
    use super::*;
    use std::sync::atomic::AtomicI32;
    use std::sync::Arc;

    #[test]
    fn schedule_unknown_id_is_noop() {
        schedule(EffectId::new());
        tick();
    }

    #[test]
    fn pending_effects_coalesce() {
        let runs = Arc::new(AtomicI32::new(0));
        let runs_clone = runs.clone();

        let fx = Effect::new(move || {
            runs_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // Queue the same effect twice inside a batch so the flush sees
        // both inserts at once; it must run once.
        batch::batch(|| {
            fx.schedule();
            fx.schedule();
        });

        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn idle_runs_after_normal() {
        let order = Arc::new(Mutex::new(Vec::new()));

        let order_idle = order.clone();
        let idle_fx = Effect::idle(move || {
            order_idle.lock().push("idle");
        });

        let order_normal = order.clone();
        let normal_fx = Effect::new(move || {
            order_normal.lock().push("normal");
        });

        order.lock().clear();

        batch::batch(|| {
            // Queue idle first; the flush must still drain normal first.
            idle_fx.schedule();
            normal_fx.schedule();
        });

        assert_eq!(*order.lock(), vec!["normal", "idle"]);
    }

    #[test]
    fn tick_is_idempotent_when_empty() {
        tick();
        tick();
    }
}
