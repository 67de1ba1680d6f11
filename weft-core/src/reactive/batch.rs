//! Batching Coordinator
//!
//! A batch suppresses per-mutation flushing: triggers that occur inside
//! the batch window accumulate affected effects in the scheduler's pending
//! sets (deduplicated), and one flush runs when the outermost batch exits.
//!
//! Nested batches collapse into the outermost one - there is no stacked
//! suppression, only a depth counter. The window closes even if the
//! mutating closure panics; the drop guard clears the flag and flushes
//! whatever was deferred.

use std::cell::Cell;

use super::scheduler::{self, Task};

thread_local! {
    /// Depth of nested batch windows on this thread.
    static BATCH_DEPTH: Cell<u32> = const { Cell::new(0) };
}

/// Check if currently inside a batch window.
pub fn is_batching() -> bool {
    BATCH_DEPTH.with(|depth| depth.get() > 0)
}

/// Run `f` with effect flushing suppressed.
///
/// An effect whose dependencies are mutated N times inside `f` runs at
/// most once after `f` completes, never once per mutation.
///
/// # Example
///
/// ```rust,ignore
/// batch(|| {
///     todos.push(item_a);
///     todos.push(item_b);
///     counts.set("total", 2);
/// });
/// // effects reading todos or counts have each run exactly once
/// ```
pub fn batch<T>(f: impl FnOnce() -> T) -> T {
    batch_inner(f, None)
}

/// Like [`batch`], with a callback enqueued after the deferred effects.
///
/// The callback is queued on the normal tier *behind* every effect the
/// batch deferred, so it observes the container state those effects
/// produced. The guarantee is "enqueued after", not "runs after every
/// transitively scheduled effect".
pub fn batch_with<T>(f: impl FnOnce() -> T, post_flush: impl FnOnce() + Send + 'static) -> T {
    batch_inner(f, Some(Box::new(post_flush)))
}

fn batch_inner<T>(f: impl FnOnce() -> T, post_flush: Option<Task>) -> T {
    BATCH_DEPTH.with(|depth| depth.set(depth.get() + 1));

    // Guard so the window closes and flushes even if `f` panics.
    struct BatchGuard {
        post_flush: Option<Task>,
    }

    impl Drop for BatchGuard {
        fn drop(&mut self) {
            // Deferred effects are already pending; the callback lines up
            // behind them before the flush starts.
            if let Some(post) = self.post_flush.take() {
                scheduler::enqueue_task(post);
            }

            let depth = BATCH_DEPTH.with(|depth| {
                depth.set(depth.get() - 1);
                depth.get()
            });

            if depth == 0 {
                scheduler::flush();
            }
        }
    }

    let _guard = BatchGuard { post_flush };
    f()
}
