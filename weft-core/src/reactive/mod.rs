//! Reactive Engine
//!
//! This module implements the core of the runtime: the dependency graph,
//! effects, the scheduler, and batching.
//!
//! # Concepts
//!
//! ## Dependency Graph
//!
//! A bidirectional mapping between `(target, key)` pairs and subscribed
//! effects. Reads of wrapped state record subscriptions ("track"); writes
//! notify subscribers ("trigger"). See [`graph`].
//!
//! ## Effects
//!
//! An Effect is a registered computation that re-runs whenever the state
//! it read during its previous run changes. Effects are the only consumers
//! of the graph: wrapped-state reads outside an effect track nothing.
//!
//! ## Scheduling
//!
//! Triggered effects are coalesced on a normal-priority queue and flushed
//! together; idle-priority effects wait until the normal queue is drained.
//! A [`batch`](batch::batch) widens the coalescing window across many
//! mutations.
//!
//! # Implementation Notes
//!
//! Dependency detection uses a thread-local tracking context: while an
//! effect runs, its id sits on a stack, and every read of wrapped state
//! subscribes the top of that stack. The same approach ("automatic
//! dependency tracking") is used by SolidJS, Vue 3, and Leptos.

pub mod batch;
mod context;
mod effect;
pub mod graph;
mod scheduler;

pub use batch::{batch, batch_with, is_batching};
pub use context::{is_tracking, is_untracking, untrack};
pub use effect::{set_error_hook, Effect, EffectId, Priority};
pub use graph::{Key, TargetId};
pub use scheduler::tick;
