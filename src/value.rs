use bytes::Bytes;
use std::collections::BTreeMap;

use crate::error::BencodeError;

/// Index of a node within a [`Tree`].
///
/// Ids are minted by the tree that owns the node and are plain copyable
/// indices, so a node may be referenced from several places (a dict entry and
/// a cached handle, for example) without any reference counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A bencode value.
///
/// Bencode has four data types: integers, byte strings, lists, and
/// dictionaries. Aggregate variants hold [`NodeId`] children rather than
/// nested values; the nodes themselves live in a [`Tree`].
///
/// Dictionaries use `BTreeMap` keyed by raw bytes, so iteration is always in
/// non-decreasing byte order and encoding is canonical by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A signed 64-bit integer.
    Integer(i64),
    /// A byte string (may or may not be valid UTF-8).
    Bytes(Bytes),
    /// An ordered list of nodes.
    List(Vec<NodeId>),
    /// A dictionary with byte string keys, iterated in sorted byte order.
    Dict(BTreeMap<Bytes, NodeId>),
}

impl Value {
    /// Name of the active variant, used in [`BencodeError::WrongType`].
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Bytes(_) => "byte string",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
        }
    }
}

/// An append-only arena of bencode nodes.
///
/// Children are pushed before the node that references them, so a node can
/// only ever point at earlier indices and the tree is acyclic by
/// construction.
///
/// # Examples
///
/// ```
/// use benc::{encode, Tree};
///
/// let mut tree = Tree::new();
/// let item = tree.integer(7);
/// let name = tree.string("seven");
/// let list = tree.list(vec![item, name]);
/// tree.set_root(list);
///
/// assert_eq!(encode(&tree).unwrap(), b"li7e5:sevene");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<Value>,
    root: Option<NodeId>,
}

impl Tree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Tree::default()
    }

    /// Number of nodes currently in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the arena holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The designated top-level node, if one has been set.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Marks `id` as the top-level node for [`encode`](crate::encode).
    pub fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    fn push(&mut self, value: Value) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(value);
        id
    }

    /// Adds an integer node.
    pub fn integer(&mut self, value: i64) -> NodeId {
        self.push(Value::Integer(value))
    }

    /// Adds a byte string node.
    pub fn bytes(&mut self, value: impl Into<Bytes>) -> NodeId {
        self.push(Value::Bytes(value.into()))
    }

    /// Adds a byte string node from a UTF-8 string.
    pub fn string(&mut self, value: &str) -> NodeId {
        self.push(Value::Bytes(Bytes::copy_from_slice(value.as_bytes())))
    }

    /// Adds a list node referencing previously created children.
    pub fn list(&mut self, items: Vec<NodeId>) -> NodeId {
        self.push(Value::List(items))
    }

    /// Adds a dict node referencing previously created children.
    pub fn dict(&mut self, entries: BTreeMap<Bytes, NodeId>) -> NodeId {
        self.push(Value::Dict(entries))
    }

    /// Borrows the node behind `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was minted by a different tree and is out of range.
    pub fn node(&self, id: NodeId) -> &Value {
        &self.nodes[id.index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Value {
        &mut self.nodes[id.index()]
    }

    /// Discards every node from `mark` on. Used to roll back a failed decode
    /// so no partially built subtree stays behind.
    pub(crate) fn truncate(&mut self, mark: usize) {
        self.nodes.truncate(mark);
    }

    /// Returns the integer payload of `id`.
    ///
    /// # Errors
    ///
    /// [`BencodeError::WrongType`] if the node is not an integer. No accessor
    /// coerces between variants.
    pub fn as_integer(&self, id: NodeId) -> Result<i64, BencodeError> {
        match self.node(id) {
            Value::Integer(v) => Ok(*v),
            other => Err(wrong_type("integer", other)),
        }
    }

    /// Returns the byte string payload of `id`.
    pub fn as_bytes(&self, id: NodeId) -> Result<&Bytes, BencodeError> {
        match self.node(id) {
            Value::Bytes(b) => Ok(b),
            other => Err(wrong_type("byte string", other)),
        }
    }

    /// Returns the byte string payload of `id` as UTF-8 text.
    ///
    /// # Errors
    ///
    /// [`BencodeError::WrongType`] if the node is not a byte string, or
    /// [`BencodeError::Invalid`] if the bytes are not valid UTF-8.
    pub fn as_str(&self, id: NodeId) -> Result<&str, BencodeError> {
        let bytes = self.as_bytes(id)?;
        std::str::from_utf8(bytes).map_err(|_| BencodeError::Invalid("byte string is not utf-8"))
    }

    /// Returns the children of the list node `id`.
    pub fn as_list(&self, id: NodeId) -> Result<&[NodeId], BencodeError> {
        match self.node(id) {
            Value::List(items) => Ok(items),
            other => Err(wrong_type("list", other)),
        }
    }

    /// Returns the entries of the dict node `id`, in sorted key order.
    pub fn as_dict(&self, id: NodeId) -> Result<&BTreeMap<Bytes, NodeId>, BencodeError> {
        match self.node(id) {
            Value::Dict(entries) => Ok(entries),
            other => Err(wrong_type("dict", other)),
        }
    }

    /// Returns true if `needle` is reachable from `start`, counting `start`
    /// itself. Used to reject container insertions that would make a node
    /// reachable from its own subtree.
    pub(crate) fn subtree_contains(&self, start: NodeId, needle: NodeId) -> bool {
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if id == needle {
                return true;
            }
            match self.node(id) {
                Value::Integer(_) | Value::Bytes(_) => {}
                Value::List(items) => stack.extend(items.iter().copied()),
                Value::Dict(entries) => stack.extend(entries.values().copied()),
            }
        }
        false
    }

    /// Structural equality between `id` in this tree and `other_id` in
    /// `other`, independent of arena layout.
    pub fn node_eq(&self, id: NodeId, other: &Tree, other_id: NodeId) -> bool {
        match (self.node(id), other.node(other_id)) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|(&x, &y)| self.node_eq(x, other, y))
            }
            (Value::Dict(a), Value::Dict(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|((ka, &va), (kb, &vb))| ka == kb && self.node_eq(va, other, vb))
            }
            _ => false,
        }
    }
}

pub(crate) fn wrong_type(expected: &'static str, found: &Value) -> BencodeError {
    BencodeError::WrongType {
        expected,
        found: found.kind(),
    }
}
