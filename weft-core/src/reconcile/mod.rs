//! List Reconciliation
//!
//! Projects a reactive list onto an ordered set of opaque external
//! resources with minimal churn. The core never learns what a resource
//! is; it talks to the embedding application through two narrow
//! contracts - a render function (`item → resource`) and the
//! [`Host`]/[`SlotHost`] container traits - plus the out-of-band
//! [`DisposalRegistry`] for per-resource cleanup.
//!
//! [`KeyedList`] reconciles the whole list; [`WindowedList`] materializes
//! only the entries inside a visible index range plus a buffer.

mod disposal;
mod host;
mod keyed;
#[cfg(test)]
mod testing;
mod windowed;

pub use disposal::DisposalRegistry;
pub use host::{Host, SlotHost};
pub use keyed::KeyedList;
pub use windowed::{Window, WindowedList};
