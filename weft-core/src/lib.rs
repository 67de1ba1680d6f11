//! Weft Core
//!
//! This crate provides the core runtime for the Weft reactive UI
//! framework. It implements:
//!
//! - A dependency-tracking engine: effects that automatically re-run when
//!   the wrapped state they read changes
//! - Microtask-style coalescing and idle-priority scheduling, with
//!   batching across many mutations
//! - Explicit state wrappers over shared record/list nodes, with deep,
//!   shallow, and manual tracking modes
//! - Keyed and windowed list reconcilers that keep an external container
//!   in correspondence with a reactive list while preserving resource
//!   identity
//!
//! Rendering itself is out of scope: the reconcilers talk to the outside
//! world only through a render function, the [`Host`] traits, and the
//! [`DisposalRegistry`]. A resource is whatever the embedding application
//! says it is.
//!
//! # Architecture
//!
//! - `reactive`: dependency graph, effects, scheduler, batching
//! - `state`: value trees and the wrappers that observe them
//! - `reconcile`: keyed and windowed list reconciliation
//!
//! # Example
//!
//! ```rust,ignore
//! use weft_core::{Effect, ListHandle, Mode, Node, Store, Value, batch};
//!
//! let node = Node::record([("count", Value::Int(0))]);
//! let counter = Store::wrap(&node, Mode::Shallow)?;
//!
//! let observed = counter.clone();
//! let fx = Effect::new(move || {
//!     println!("count = {:?}", observed.get_value("count"));
//! });
//!
//! batch(|| {
//!     counter.set("count", 1);
//!     counter.set("count", 2);
//! });
//! // prints once more: count = Int(2)
//! ```

pub mod error;
pub mod reactive;
pub mod reconcile;
pub mod state;

pub use error::Error;
pub use reactive::{
    batch, batch_with, is_batching, set_error_hook, tick, untrack, Effect, Priority,
};
pub use reconcile::{DisposalRegistry, Host, KeyedList, SlotHost, Window, WindowedList};
pub use state::{ListHandle, Mode, Node, Reading, ScopedRegistry, Store, Value};
