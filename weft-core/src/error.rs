//! Error Types
//!
//! Contract violations the type system cannot rule out. Everything the
//! runtime defines as a safe no-op (double dispose, evicting an absent
//! scoped key, running cleanup for an unregistered resource) is exactly
//! that - a no-op, not an error.

use thiserror::Error;

/// Errors surfaced at the call site that detects a contract violation.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A record wrapper was requested over a value that is not a record.
    #[error("expected a record node")]
    NotARecord,

    /// A list wrapper was requested over a value that is not a list.
    #[error("expected a list node")]
    NotAList,

    /// A windowed reconciler was configured with a non-positive item extent.
    #[error("item extent must be a positive, finite number")]
    InvalidExtent,
}
