//! Value Tree
//!
//! The plain data the wrappers observe. A [`Value`] is either a primitive
//! or a handle to a shared [`Node`] holding a record or a list. Nodes are
//! reference-counted and identity-stable: two values are "the same" when
//! they point at the same node, which is what the write contract compares
//! for non-primitive assignments.
//!
//! Nodes carry the [`TargetId`] used to key the dependency graph; the
//! wrappers in [`store`](super::store) and [`list`](super::list) do the
//! actual tracking and triggering. Reading or mutating a node directly
//! through this module is invisible to the graph.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::reactive::TargetId;

pub(crate) enum NodeData {
    Record(IndexMap<Arc<str>, Value>),
    List(Vec<Value>),
}

pub(crate) struct NodeInner {
    id: TargetId,
    data: RwLock<NodeData>,
}

/// A shared record or list node.
///
/// Cloning a `Node` clones the handle, not the data; clones compare equal
/// and share one [`TargetId`].
pub struct Node {
    inner: Arc<NodeInner>,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                id: TargetId::new(),
                data: RwLock::new(data),
            }),
        }
    }

    /// Build a record node from field/value pairs, preserving field order.
    pub fn record<K, I>(fields: I) -> Self
    where
        K: Into<Arc<str>>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::new(NodeData::Record(
            fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    /// Build a list node from a sequence of values.
    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Self::new(NodeData::List(items.into_iter().collect()))
    }

    /// The node's target ID in the dependency graph.
    pub fn id(&self) -> TargetId {
        self.inner.id
    }

    pub fn is_record(&self) -> bool {
        matches!(&*self.read(), NodeData::Record(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(&*self.read(), NodeData::List(_))
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, NodeData> {
        self.inner.data.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, NodeData> {
        self.inner.data.write()
    }
}

impl Clone for Node {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Node {}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &*self.read() {
            NodeData::Record(map) => f
                .debug_struct("Node")
                .field("id", &self.inner.id)
                .field("fields", &map.len())
                .finish(),
            NodeData::List(items) => f
                .debug_struct("Node")
                .field("id", &self.inner.id)
                .field("len", &items.len())
                .finish(),
        }
    }
}

/// A plain value: a primitive, or a handle to a record/list node.
///
/// Primitives compare by value; nodes compare by identity. No-op write
/// detection in the wrappers relies on exactly this equality.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    Node(Node),
}

impl Value {
    /// Shorthand for `Value::Node(Node::record(..))`.
    pub fn record<K, I>(fields: I) -> Self
    where
        K: Into<Arc<str>>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Node(Node::record(fields))
    }

    /// Shorthand for `Value::Node(Node::list(..))`.
    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Value::Node(Node::list(items))
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(Arc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(Arc::from(v.as_str()))
    }
}

impl From<Node> for Value {
    fn from(v: Node) -> Self {
        Value::Node(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_are_unique() {
        let a = Node::record([("x", Value::Int(1))]);
        let b = Node::record([("x", Value::Int(1))]);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn node_clones_share_identity() {
        let a = Node::list([Value::Int(1)]);
        let b = a.clone();

        assert_eq!(a, b);
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn primitives_compare_by_value() {
        assert_eq!(Value::from(3), Value::Int(3));
        assert_eq!(Value::from("hi"), Value::from(String::from("hi")));
        assert_ne!(Value::from(3), Value::from(4));
        assert_ne!(Value::Null, Value::Bool(false));
    }

    #[test]
    fn nodes_compare_by_identity() {
        let a = Node::record([("x", Value::Int(1))]);
        let b = Node::record([("x", Value::Int(1))]);

        assert_ne!(Value::from(a.clone()), Value::from(b));
        assert_eq!(Value::from(a.clone()), Value::from(a));
    }

    #[test]
    fn shape_predicates() {
        let rec = Node::record([("x", Value::Int(1))]);
        let list = Node::list([]);

        assert!(rec.is_record());
        assert!(!rec.is_list());
        assert!(list.is_list());
        assert!(!list.is_record());
    }
}
