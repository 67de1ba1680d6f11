//! Effect Implementation
//!
//! An effect is a unit of recomputation: a closure that re-runs whenever
//! the wrapped state it read during its previous run changes.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its closure immediately - once,
//!    synchronously - to collect the initial dependency set before any
//!    external trigger can occur.
//!
//! 2. When a dependency changes, the effect is handed to the scheduler
//!    and re-runs on the next flush of its priority tier.
//!
//! 3. Every run first unsubscribes the effect from all pairs recorded on
//!    the previous run, then re-executes under a tracking scope, collecting
//!    a fresh set. Dependencies dropped by a conditional read therefore
//!    stop notifying the effect.
//!
//! # Disposal
//!
//! [`Effect::dispose`] is idempotent and permanent: scheduled runs of a
//! disposed effect become no-ops, and the effect is removed from every
//! graph entry. A run already past its disposed-check completes normally.
//!
//! # Errors
//!
//! The closure runs under `catch_unwind`; a panic is routed to the
//! process-wide error hook (see [`set_error_hook`]) and never aborts the
//! scheduler or the rest of the flush.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::RwLock;

use super::context::TrackingScope;
use super::{graph, scheduler};

/// Unique identifier for an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectId(u64);

impl EffectId {
    /// Generate a new unique effect ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for EffectId {
    fn default() -> Self {
        Self::new()
    }
}

/// Scheduling tier for an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    /// Coalesced and flushed together at the next flush boundary.
    Normal,
    /// Deferred until the normal tier is fully drained.
    Idle,
}

pub(crate) struct EffectInner {
    id: EffectId,
    priority: Priority,
    func: Box<dyn Fn() + Send + Sync>,
    disposed: AtomicBool,
    run_count: AtomicUsize,
}

// Process-wide registry. The registry holds weak references: the scheduler
// queues only ids, so an effect whose last handle is dropped simply stops
// resolving.
static REGISTRY: OnceLock<RwLock<HashMap<EffectId, Weak<EffectInner>>>> = OnceLock::new();

fn registry() -> &'static RwLock<HashMap<EffectId, Weak<EffectInner>>> {
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Resolve an effect id to its live implementation, if any.
pub(crate) fn lookup(id: EffectId) -> Option<Arc<EffectInner>> {
    registry().read().get(&id).and_then(Weak::upgrade)
}

impl EffectInner {
    pub(crate) fn id(&self) -> EffectId {
        self.id
    }

    pub(crate) fn priority(&self) -> Priority {
        self.priority
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Execute one run of the effect.
    ///
    /// Disposed effects return immediately. Otherwise the previous
    /// dependency set is dropped, the closure runs under a tracking scope,
    /// and any panic is routed to the error hook.
    pub(crate) fn run(&self) {
        if self.is_disposed() {
            return;
        }

        graph::unsubscribe(self.id);

        let _scope = TrackingScope::enter(self.id);

        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| (self.func)())) {
            report(payload);
        }

        self.run_count.fetch_add(1, Ordering::SeqCst);
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        graph::unsubscribe(self.id);
        registry().write().remove(&self.id);
    }
}

impl Drop for EffectInner {
    fn drop(&mut self) {
        // Last handle gone: leave no trace in the graph or registry.
        self.dispose();
    }
}

/// Handle to a registered effect.
///
/// The handle is cheap to clone; clones share the underlying effect.
/// Dropping the last handle disposes the effect.
///
/// # Example
///
/// ```rust,ignore
/// let todo = Store::wrap(&node, Mode::Shallow)?;
///
/// let fx = Effect::new(move || {
///     println!("title is now {:?}", todo.get("title"));
/// });
///
/// todo.set("title", "write docs"); // effect re-runs on flush
/// fx.dispose();
/// ```
pub struct Effect {
    inner: Arc<EffectInner>,
}

impl Effect {
    /// Register a normal-priority effect.
    ///
    /// The closure runs once, synchronously, before this returns.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::with_priority(f, Priority::Normal)
    }

    /// Register an idle-priority effect.
    ///
    /// Idle effects still run once synchronously at registration; later
    /// re-runs are deferred until the normal tier is drained.
    pub fn idle<F>(f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::with_priority(f, Priority::Idle)
    }

    /// Register an effect with an explicit scheduling tier.
    pub fn with_priority<F>(f: F, priority: Priority) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let inner = Arc::new(EffectInner {
            id: EffectId::new(),
            priority,
            func: Box::new(f),
            disposed: AtomicBool::new(false),
            run_count: AtomicUsize::new(0),
        });

        registry()
            .write()
            .insert(inner.id, Arc::downgrade(&inner));

        // Initial synchronous run collects the first dependency set.
        inner.run();

        Self { inner }
    }

    /// Get the effect's ID.
    pub fn id(&self) -> EffectId {
        self.inner.id
    }

    /// Queue a re-run through the scheduler.
    ///
    /// This is the manual re-trigger used by callers whose inputs live
    /// outside the dependency graph (the windowed reconciler's viewport).
    pub fn schedule(&self) {
        scheduler::schedule(self.inner.id);
    }

    /// Dispose of the effect. Idempotent.
    ///
    /// After disposal the effect body never executes again, even if its
    /// former dependencies keep changing.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// Number of completed runs, including the registration run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }
}

impl Clone for Effect {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("priority", &self.inner.priority)
            .field("run_count", &self.run_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Error hook
// ----------------------------------------------------------------------------

type ErrorHook = Box<dyn Fn(&(dyn Any + Send)) + Send + Sync>;

static ERROR_HOOK: OnceLock<RwLock<ErrorHook>> = OnceLock::new();

fn error_hook() -> &'static RwLock<ErrorHook> {
    ERROR_HOOK.get_or_init(|| RwLock::new(Box::new(default_error_hook)))
}

fn default_error_hook(payload: &(dyn Any + Send)) {
    tracing::error!(panic = panic_message(payload), "effect panicked");
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "<non-string panic payload>"
    }
}

/// Replace the process-wide sink for errors escaping effect bodies.
///
/// The default hook logs through `tracing`. The hook must not panic.
pub fn set_error_hook<F>(hook: F)
where
    F: Fn(&(dyn Any + Send)) + Send + Sync + 'static,
{
    *error_hook().write() = Box::new(hook);
}

pub(crate) fn report(payload: Box<dyn Any + Send>) {
    (error_hook().read())(payload.as_ref());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn effect_runs_on_creation() {
        let runs = Arc::new(AtomicI32::new(0));
        let runs_clone = runs.clone();

        let _fx = Effect::new(move || {
            runs_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn effect_reruns_on_schedule() {
        let runs = Arc::new(AtomicI32::new(0));
        let runs_clone = runs.clone();

        let fx = Effect::new(move || {
            runs_clone.fetch_add(1, Ordering::SeqCst);
        });

        fx.schedule();
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        fx.schedule();
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn disposed_effect_never_runs_again() {
        let runs = Arc::new(AtomicI32::new(0));
        let runs_clone = runs.clone();

        let fx = Effect::new(move || {
            runs_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(runs.load(Ordering::SeqCst), 1);

        fx.dispose();
        assert!(fx.is_disposed());

        fx.schedule();
        fx.schedule();
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // Double dispose is a safe no-op.
        fx.dispose();
        assert!(fx.is_disposed());
    }

    #[test]
    fn effect_clone_shares_state() {
        let fx = Effect::new(|| {});
        let other = fx.clone();

        assert_eq!(fx.id(), other.id());

        fx.dispose();
        assert!(other.is_disposed());
    }

    #[test]
    fn panicking_effect_reports_and_scheduler_survives() {
        let seen = Arc::new(AtomicI32::new(0));
        let seen_clone = seen.clone();
        set_error_hook(move |_| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
        });

        let fx = Effect::new(|| panic!("intentional panic"));

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(fx.run_count(), 1);

        // A later effect registers and runs normally.
        let runs = Arc::new(AtomicI32::new(0));
        let runs_clone = runs.clone();
        let _ok = Effect::new(move || {
            runs_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // Restore the default hook for other tests.
        set_error_hook(super::default_error_hook);
    }
}
