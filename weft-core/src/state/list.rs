//! List Wrapper
//!
//! [`ListHandle`] is the reactive view over a list [`Node`]. Reads have
//! three granularities, mirroring what effects actually subscribe to:
//!
//! - [`get`](ListHandle::get) tracks one index,
//! - [`len`](ListHandle::len) tracks the length pseudo-property,
//! - [`to_vec`](ListHandle::to_vec) tracks the whole-sequence content
//!   marker (plus the length) - the subscription the list reconcilers use.
//!
//! # Write semantics
//!
//! An index write triggers that index *and* the length key: index writes
//! can change iteration results observed by effects reading length-derived
//! views. A length write (`set_len`) triggers only the length. Every
//! structural mutation (`push`, `pop`, `shift`, `unshift`, `splice`,
//! `sort_by`, `reverse`) triggers both the length and the content marker
//! after the mutation completes, so whole-sequence readers are notified
//! regardless of which indices moved. No-op writes are silent.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Error;
use crate::reactive::graph::{self, Key};
use crate::reactive::TargetId;

use super::store::{
    wrap_child_node, wrapped_mode, wrappers, CachedWrapper, ChildWrapper, Mode, Reading, Store,
};
use super::value::{Node, NodeData, Value};

pub(crate) struct ListInner {
    node: Node,
    mode: Mode,
    // Deep-mode child wrappers keyed by index. Structural mutations shift
    // indices; entries are revalidated against the child node id on read.
    children: Mutex<HashMap<usize, (TargetId, ChildWrapper)>>,
}

/// Reactive wrapper over a list node.
///
/// Cheap to clone; clones share the wrapper. Identity and mode rules are
/// the same as [`Store`]'s.
pub struct ListHandle {
    inner: Arc<ListInner>,
}

impl ListHandle {
    /// Wrap a list node.
    ///
    /// Returns [`Error::NotAList`] for record nodes. Wrapping the same
    /// node again returns the cached wrapper; the first wrap's mode wins.
    pub fn wrap(node: &Node, mode: Mode) -> Result<Self, Error> {
        if !node.is_list() {
            return Err(Error::NotAList);
        }
        Ok(Self::wrap_unchecked(node, mode))
    }

    pub(crate) fn wrap_unchecked(node: &Node, mode: Mode) -> Self {
        let mut cache = wrappers().lock();

        if let Some((_, CachedWrapper::List(weak))) = cache.get(&node.id()) {
            if let Some(inner) = weak.upgrade() {
                return Self { inner };
            }
        }

        let inner = Arc::new(ListInner {
            node: node.clone(),
            mode,
            children: Mutex::new(HashMap::new()),
        });
        cache.insert(
            node.id(),
            (mode, CachedWrapper::List(Arc::downgrade(&inner))),
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

    fn with_list<R>(&self, f: impl FnOnce(&Vec<Value>) -> R) -> R {
        match &*self.inner.node.read() {
            NodeData::List(items) => f(items),
            NodeData::Record(_) => unreachable!("list wrapper over a record node"),
        }
    }

    fn with_list_mut<R>(&self, f: impl FnOnce(&mut Vec<Value>) -> R) -> R {
        match &mut *self.inner.node.write() {
            NodeData::List(items) => f(items),
            NodeData::Record(_) => unreachable!("list wrapper over a record node"),
        }
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Number of elements. Tracks the length key.
    pub fn len(&self) -> usize {
        graph::track(self.id(), Key::Len);
        self.with_list(|items| items.len())
    }

    /// True when the list is empty. Tracks the length key.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read one index.
    ///
    /// Tracks the index, then returns the raw value - or, in deep mode, a
    /// child wrapper for a non-manual node. Out-of-range indices read as
    /// [`Value::Null`].
    pub fn get(&self, index: usize) -> Reading {
        graph::track(self.id(), Key::Index(index));

        let raw = self.with_list(|items| items.get(index).cloned().unwrap_or(Value::Null));

        match raw {
            Value::Node(child)
                if self.inner.mode == Mode::Deep
                    && wrapped_mode(child.id()) != Some(Mode::Manual) =>
            {
                self.cached_child(index, &child).into_reading()
            }
            v => Reading::Value(v),
        }
    }

    /// Read one index as its raw value, regardless of mode.
    pub fn get_value(&self, index: usize) -> Value {
        graph::track(self.id(), Key::Index(index));
        self.with_list(|items| items.get(index).cloned().unwrap_or(Value::Null))
    }

    /// Read an index as a wrapped record. See [`Store::record`].
    pub fn record_at(&self, index: usize) -> Result<Store, Error> {
        match self.get(index) {
            Reading::Record(store) => Ok(store),
            Reading::Value(Value::Node(node)) => Store::wrap(&node, Mode::Shallow),
            _ => Err(Error::NotARecord),
        }
    }

    /// Read an index as a wrapped list. See [`Store::list`].
    pub fn list_at(&self, index: usize) -> Result<ListHandle, Error> {
        match self.get(index) {
            Reading::List(list) => Ok(list),
            Reading::Value(Value::Node(node)) => ListHandle::wrap(&node, Mode::Shallow),
            _ => Err(Error::NotAList),
        }
    }

    /// Snapshot the whole sequence.
    ///
    /// This is the whole-sequence read: it tracks the content marker and
    /// the length, so the reader re-runs on any structural change.
    pub fn to_vec(&self) -> Vec<Value> {
        graph::track(self.id(), Key::Items);
        graph::track(self.id(), Key::Len);
        self.with_list(|items| items.clone())
    }

    fn cached_child(&self, index: usize, child: &Node) -> ChildWrapper {
        let mut children = self.inner.children.lock();

        if let Some((cached_id, wrapper)) = children.get(&index) {
            if *cached_id == child.id() {
                return wrapper.clone();
            }
        }

        let wrapper = wrap_child_node(child);
        children.insert(index, (child.id(), wrapper.clone()));
        wrapper
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Write one index.
    ///
    /// Writing past the end pads the gap with [`Value::Null`]. A changed
    /// write triggers the index and the length key; a same-value write is
    /// silent.
    pub fn set(&self, index: usize, value: impl Into<Value>) {
        let value = value.into();

        let (changed, old_len) = self.with_list_mut(|items| {
            let old_len = items.len();
            if index < old_len {
                let changed = items[index] != value;
                items[index] = value;
                (changed, old_len)
            } else {
                items.resize(index + 1, Value::Null);
                items[index] = value;
                (true, old_len)
            }
        });

        if changed {
            if index >= old_len {
                graph::trigger_index(self.id(), index, old_len);
            } else {
                graph::trigger_keys(self.id(), &[Key::Index(index), Key::Len]);
            }
        }
    }

    /// Resize the list, truncating or padding with [`Value::Null`].
    ///
    /// A length write triggers only the length key.
    pub fn set_len(&self, new_len: usize) {
        let changed = self.with_list_mut(|items| {
            if items.len() == new_len {
                return false;
            }
            items.resize(new_len, Value::Null);
            true
        });

        if changed {
            graph::trigger(self.id(), Key::Len);
        }
    }

    /// Append an element.
    pub fn push(&self, value: impl Into<Value>) {
        let value = value.into();
        self.with_list_mut(|items| items.push(value));
        self.trigger_structural();
    }

    /// Remove and return the last element.
    pub fn pop(&self) -> Option<Value> {
        let popped = self.with_list_mut(|items| items.pop());
        if popped.is_some() {
            self.trigger_structural();
        }
        popped
    }

    /// Remove and return the first element.
    pub fn shift(&self) -> Option<Value> {
        let shifted = self.with_list_mut(|items| {
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            }
        });
        if shifted.is_some() {
            self.trigger_structural();
        }
        shifted
    }

    /// Insert an element at the front.
    pub fn unshift(&self, value: impl Into<Value>) {
        let value = value.into();
        self.with_list_mut(|items| items.insert(0, value));
        self.trigger_structural();
    }

    /// Remove `delete_count` elements at `start` (both clamped to the
    /// list), inserting `replacement` in their place. Returns the removed
    /// elements.
    pub fn splice(
        &self,
        start: usize,
        delete_count: usize,
        replacement: Vec<Value>,
    ) -> Vec<Value> {
        let mutated_anything = delete_count > 0 || !replacement.is_empty();

        let removed = self.with_list_mut(|items| {
            let start = start.min(items.len());
            let end = (start + delete_count).min(items.len());
            items.splice(start..end, replacement).collect::<Vec<_>>()
        });

        if mutated_anything {
            self.trigger_structural();
        }
        removed
    }

    /// Sort the list in place with a comparator.
    pub fn sort_by(&self, compare: impl FnMut(&Value, &Value) -> std::cmp::Ordering) {
        self.with_list_mut(|items| items.sort_by(compare));
        self.trigger_structural();
    }

    /// Reverse the list in place.
    pub fn reverse(&self) {
        self.with_list_mut(|items| items.reverse());
        self.trigger_structural();
    }

    // Every structural mutation notifies both the length and the
    // whole-sequence content marker in one trigger set.
    fn trigger_structural(&self) {
        graph::trigger_keys(self.id(), &[Key::Len, Key::Items]);
    }
}

impl Clone for ListHandle {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl PartialEq for ListHandle {
    /// Wrapper identity, consistent with node identity.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for ListHandle {}

impl std::fmt::Debug for ListHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListHandle")
            .field("id", &self.id())
            .field("mode", &self.inner.mode)
            .finish()
    }
}
