//! Record Wrapper
//!
//! [`Store`] is the reactive view over a record [`Node`]: every read goes
//! through [`track`](crate::reactive::graph::track), every changed write
//! through [`trigger`](crate::reactive::graph::trigger). The node itself
//! stays plain data - observation lives entirely in the wrapper, which is
//! the explicit-accessor replacement for proxy-trapped property access.
//!
//! # Modes
//!
//! - [`Mode::Shallow`] (default): nested nodes are returned raw; reads of
//!   them are not observed.
//! - [`Mode::Deep`]: nested nodes come back wrapped, served from a
//!   per-parent cache so repeated reads of the same field return the same
//!   child wrapper instance.
//! - [`Mode::Manual`]: like shallow, and additionally marks the node so a
//!   deep parent returns it raw instead of auto-wrapping it.
//!
//! All modes track reads at their own level; the mode only decides what
//! happens to nested nodes.
//!
//! # Identity
//!
//! Wrapping is identity-stable: a process-wide cache maps node id to its
//! wrapper, so wrapping the same node twice yields the same wrapper. The
//! first wrap's mode wins; later wraps with a different mode return the
//! cached wrapper unchanged.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;

use crate::error::Error;
use crate::reactive::graph::{self, Key};
use crate::reactive::TargetId;

use super::list::{ListHandle, ListInner};
use super::value::{Node, NodeData, Value};

/// Nested-node handling for a wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Nested nodes are returned as-is, unwrapped.
    #[default]
    Shallow,
    /// Nested nodes are recursively wrapped on access.
    Deep,
    /// Shallow, and exempt from auto-wrapping by deep parents.
    Manual,
}

/// The result of reading a wrapped field or index.
///
/// Deep mode yields child wrappers for nested nodes; every other case
/// yields the raw value.
#[derive(Debug, Clone)]
pub enum Reading {
    Value(Value),
    Record(Store),
    List(ListHandle),
}

impl Reading {
    pub fn into_value(self) -> Option<Value> {
        match self {
            Reading::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_record(self) -> Option<Store> {
        match self {
            Reading::Record(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_list(self) -> Option<ListHandle> {
        match self {
            Reading::List(l) => Some(l),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub(crate) enum ChildWrapper {
    Record(Store),
    List(ListHandle),
}

impl ChildWrapper {
    pub(crate) fn into_reading(self) -> Reading {
        match self {
            ChildWrapper::Record(s) => Reading::Record(s),
            ChildWrapper::List(l) => Reading::List(l),
        }
    }
}

pub(crate) enum CachedWrapper {
    Record(Weak<StoreInner>),
    List(Weak<ListInner>),
}

// Process-wide identity cache: node id → wrapper. Weak entries keep the
// cache from owning wrappers; a dead entry is replaced on the next wrap.
static WRAPPERS: OnceLock<Mutex<HashMap<TargetId, (Mode, CachedWrapper)>>> = OnceLock::new();

pub(crate) fn wrappers() -> &'static Mutex<HashMap<TargetId, (Mode, CachedWrapper)>> {
    WRAPPERS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// The mode a node was wrapped with, if it has a live wrapper.
pub(crate) fn wrapped_mode(id: TargetId) -> Option<Mode> {
    wrappers().lock().get(&id).map(|(mode, _)| *mode)
}

/// Wrap a nested node the way a deep parent does.
pub(crate) fn wrap_child_node(child: &Node) -> ChildWrapper {
    if child.is_record() {
        ChildWrapper::Record(Store::wrap_unchecked(child, Mode::Deep))
    } else {
        ChildWrapper::List(ListHandle::wrap_unchecked(child, Mode::Deep))
    }
}

pub(crate) struct StoreInner {
    node: Node,
    mode: Mode,
    // Deep-mode child wrappers, keyed by field, revalidated against the
    // current child node id on every hit.
    children: Mutex<HashMap<Arc<str>, (TargetId, ChildWrapper)>>,
}

/// Reactive wrapper over a record node.
///
/// Cheap to clone; clones share the wrapper. See the module docs for the
/// mode and identity rules.
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Wrap a record node.
    ///
    /// Returns [`Error::NotARecord`] for list nodes. Wrapping the same
    /// node again returns the cached wrapper; the first wrap's mode wins.
    pub fn wrap(node: &Node, mode: Mode) -> Result<Self, Error> {
        if !node.is_record() {
            return Err(Error::NotARecord);
        }
        Ok(Self::wrap_unchecked(node, mode))
    }

    pub(crate) fn wrap_unchecked(node: &Node, mode: Mode) -> Self {
        let mut cache = wrappers().lock();

        if let Some((_, CachedWrapper::Record(weak))) = cache.get(&node.id()) {
            if let Some(inner) = weak.upgrade() {
                return Self { inner };
            }
        }

        let inner = Arc::new(StoreInner {
            node: node.clone(),
            mode,
            children: Mutex::new(HashMap::new()),
        });
        cache.insert(
            node.id(),
            (mode, CachedWrapper::Record(Arc::downgrade(&inner))),
        );

        Self { inner }
    }

    /// The underlying node.
    pub fn node(&self) -> &Node {
        &self.inner.node
    }

    /// The node's target ID in the dependency graph.
    pub fn id(&self) -> TargetId {
        self.inner.node.id()
    }

    /// The mode this wrapper was created with.
    pub fn mode(&self) -> Mode {
        self.inner.mode
    }

    fn with_record<R>(&self, f: impl FnOnce(&indexmap::IndexMap<Arc<str>, Value>) -> R) -> R {
        match &*self.inner.node.read() {
            NodeData::Record(map) => f(map),
            NodeData::List(_) => unreachable!("record wrapper over a list node"),
        }
    }

    fn with_record_mut<R>(
        &self,
        f: impl FnOnce(&mut indexmap::IndexMap<Arc<str>, Value>) -> R,
    ) -> R {
        match &mut *self.inner.node.write() {
            NodeData::Record(map) => f(map),
            NodeData::List(_) => unreachable!("record wrapper over a list node"),
        }
    }

    /// Read a field.
    ///
    /// Tracks the field, then returns the raw value - or, in deep mode, a
    /// child wrapper when the value is a non-manual node. Absent fields
    /// read as [`Value::Null`].
    pub fn get(&self, key: &str) -> Reading {
        graph::track(self.id(), Key::field(key));

        let raw = self.with_record(|map| map.get(key).cloned().unwrap_or(Value::Null));

        match raw {
            Value::Node(child)
                if self.inner.mode == Mode::Deep
                    && wrapped_mode(child.id()) != Some(Mode::Manual) =>
            {
                self.cached_child(key, &child).into_reading()
            }
            v => Reading::Value(v),
        }
    }

    /// Read a field as its raw value, regardless of mode.
    pub fn get_value(&self, key: &str) -> Value {
        graph::track(self.id(), Key::field(key));
        self.with_record(|map| map.get(key).cloned().unwrap_or(Value::Null))
    }

    /// Check whether a field is present. Tracks the field.
    pub fn has(&self, key: &str) -> bool {
        graph::track(self.id(), Key::field(key));
        self.with_record(|map| map.contains_key(key))
    }

    /// Read a field as a wrapped record.
    ///
    /// In deep mode this is the cached child wrapper. In shallow or manual
    /// mode this wraps the nested node explicitly (identity-cached, so the
    /// same node still yields the same wrapper).
    pub fn record(&self, key: &str) -> Result<Store, Error> {
        match self.get(key) {
            Reading::Record(store) => Ok(store),
            Reading::Value(Value::Node(node)) => Store::wrap(&node, Mode::Shallow),
            _ => Err(Error::NotARecord),
        }
    }

    /// Read a field as a wrapped list. Counterpart of [`Store::record`].
    pub fn list(&self, key: &str) -> Result<ListHandle, Error> {
        match self.get(key) {
            Reading::List(list) => Ok(list),
            Reading::Value(Value::Node(node)) => ListHandle::wrap(&node, Mode::Shallow),
            _ => Err(Error::NotARecord),
        }
    }

    fn cached_child(&self, key: &str, child: &Node) -> ChildWrapper {
        let mut children = self.inner.children.lock();

        if let Some((cached_id, wrapper)) = children.get(key) {
            if *cached_id == child.id() {
                return wrapper.clone();
            }
        }

        let wrapper = wrap_child_node(child);
        children.insert(Arc::from(key), (child.id(), wrapper.clone()));
        wrapper
    }

    /// Write a field.
    ///
    /// The write always lands; the trigger fires only when the new value
    /// differs from the old one (primitive equality, node identity).
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();

        let changed = self.with_record_mut(|map| {
            let changed = match map.get(key) {
                Some(old) => *old != value,
                None => true,
            };
            map.insert(Arc::from(key), value);
            changed
        });

        if changed {
            graph::trigger(self.id(), Key::field(key));
        }
    }

    /// Remove a field. Triggers the field if it was present.
    pub fn remove(&self, key: &str) {
        let existed = self.with_record_mut(|map| map.shift_remove(key).is_some());

        if existed {
            self.inner.children.lock().remove(key);
            graph::trigger(self.id(), Key::field(key));
        }
    }
}

impl Clone for Store {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl PartialEq for Store {
    /// Wrapper identity, consistent with node identity.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Store {}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.id())
            .field("mode", &self.inner.mode)
            .finish()
    }
}
