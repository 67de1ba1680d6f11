//! Host Contract
//!
//! The reconcilers never inspect a resource; they only hand it to the
//! host. The host is whatever owns the real container - a DOM subtree, a
//! terminal region, a test double collecting ids - and these traits are
//! the entire surface the core asks of it.

/// A container of opaque resources, kept in correspondence with a
/// reactive sequence by a reconciler.
pub trait Host<R>: Send + Sync {
    /// Append a freshly rendered resource to the container.
    fn insert(&self, resource: &R);

    /// Remove a resource from the container.
    ///
    /// Called exactly once per resource, after its disposal callback (if
    /// any) has run.
    fn remove(&self, resource: &R);
}

/// A host whose entries occupy positions along one axis, for the windowed
/// reconciler. `offset` is in the same unit as the window's item extent.
pub trait SlotHost<R>: Host<R> {
    /// Move a resource to the given offset without re-rendering it.
    fn place(&self, resource: &R, offset: f64);
}
