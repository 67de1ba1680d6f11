//! Reactive State
//!
//! The state-wrapping model: plain shared value trees ([`Node`]/[`Value`])
//! observed through explicit wrappers ([`Store`] for records,
//! [`ListHandle`] for lists). Every wrapper read calls into the dependency
//! graph's `track`; every changed write calls `trigger`. The wrappers are
//! the only reactive surface - touching a node directly is invisible to
//! effects, which is occasionally useful and always explicit.
//!
//! [`ScopedRegistry`] layers a keyed store of shallow wrappers on top for
//! ephemeral per-entry state.

mod list;
mod scoped;
mod store;
mod value;

pub use list::ListHandle;
pub use scoped::ScopedRegistry;
pub use store::{Mode, Reading, Store};
pub use value::{Node, Value};
