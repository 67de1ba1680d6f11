//! Tracking Context
//!
//! The tracking context records which effect is currently running. This
//! enables automatic dependency collection: when a wrapped value is read,
//! the dependency graph can subscribe the current effect to that read.
//!
//! # Implementation
//!
//! We use a thread-local stack of effect ids. When an effect begins a run
//! it pushes itself onto the stack; when the run completes the entry is
//! popped. The stack shape supports nested effects (an effect body that
//! mounts another effect, as the list reconcilers do).
//!
//! The stack is manipulated through an RAII guard so the entry is popped
//! on every exit path, including panics unwinding out of an effect body.

use std::cell::{Cell, RefCell};

use super::effect::EffectId;

thread_local! {
    /// Stack of effects currently executing on this thread.
    static ACTIVE_EFFECTS: RefCell<Vec<EffectId>> = const { RefCell::new(Vec::new()) };

    /// Depth of nested `untrack` windows. While non-zero, reads are not
    /// recorded as dependencies.
    static UNTRACK_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Guard that marks an effect as the active tracking target.
///
/// Dropping the guard restores the previously active effect.
pub(crate) struct TrackingScope {
    effect_id: EffectId,
}

impl TrackingScope {
    /// Enter a tracking scope for the given effect.
    ///
    /// While the scope is alive, reads of wrapped state subscribe this
    /// effect. The scope is exited when the returned guard is dropped.
    pub(crate) fn enter(effect_id: EffectId) -> Self {
        ACTIVE_EFFECTS.with(|stack| stack.borrow_mut().push(effect_id));
        Self { effect_id }
    }
}

impl Drop for TrackingScope {
    fn drop(&mut self) {
        ACTIVE_EFFECTS.with(|stack| {
            let popped = stack.borrow_mut().pop();

            // Catches mismatched enter/exit pairs during development.
            debug_assert_eq!(
                popped,
                Some(self.effect_id),
                "TrackingScope mismatch: expected {:?}, got {:?}",
                self.effect_id,
                popped
            );
        });
    }
}

/// The effect reads should subscribe, if any.
///
/// Returns `None` outside any effect run and inside an `untrack` window.
pub(crate) fn tracking_target() -> Option<EffectId> {
    if is_untracking() {
        return None;
    }
    ACTIVE_EFFECTS.with(|stack| stack.borrow().last().copied())
}

/// Check whether any effect is currently executing on this thread.
pub fn is_tracking() -> bool {
    ACTIVE_EFFECTS.with(|stack| !stack.borrow().is_empty())
}

/// Check whether reads are currently exempt from dependency collection.
pub fn is_untracking() -> bool {
    UNTRACK_DEPTH.with(|depth| depth.get() > 0)
}

/// Read wrapped state without subscribing the current effect.
///
/// Useful when an effect needs to peek at a value without re-running when
/// it changes. Nested calls are allowed; the window closes when the
/// outermost call returns, even if `f` panics.
pub fn untrack<T>(f: impl FnOnce() -> T) -> T {
    struct UntrackGuard;

    impl Drop for UntrackGuard {
        fn drop(&mut self) {
            UNTRACK_DEPTH.with(|depth| depth.set(depth.get() - 1));
        }
    }

    UNTRACK_DEPTH.with(|depth| depth.set(depth.get() + 1));
    let _guard = UntrackGuard;
    f()
}
