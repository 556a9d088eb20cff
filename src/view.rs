//! Typed views over a single tree node.
//!
//! A view binds to one node and guarantees its variant for as long as the
//! view exists; construction fails with [`BencodeError::WrongType`] if the
//! node cannot provide the requested variant. Each view can serialize its
//! bound node and can rebind itself by decoding fresh bytes, leaving the old
//! binding untouched if the decode fails or yields the wrong variant.

use bytes::Bytes;
use tracing::debug;

use crate::decode::{decode_into, Limits};
use crate::encode::encode_node;
use crate::error::BencodeError;
use crate::value::{NodeId, Tree, Value};

macro_rules! view_common {
    ($view:ident, $check:ident, $doc:literal) => {
        impl<'t> $view<'t> {
            #[doc = concat!("Binds to `id`, failing with `WrongType` unless the node is ", $doc, ".")]
            pub fn bind(tree: &'t mut Tree, id: NodeId) -> Result<Self, BencodeError> {
                tree.$check(id)?;
                Ok(Self { tree, id })
            }

            /// Id of the bound node. Ids are plain indices, so the binding
            /// may be shared with other holders of the same tree.
            pub fn id(&self) -> NodeId {
                self.id
            }

            /// Serializes just the bound node.
            pub fn to_bytes(&self) -> Result<Vec<u8>, BencodeError> {
                let mut buf = Vec::new();
                encode_node(self.tree, self.id, &mut buf)?;
                Ok(buf)
            }

            /// Decodes `data` and rebinds the view to the new node.
            ///
            /// If the decode fails, or decodes to a different variant, the
            /// tree is rolled back and the old binding stays in place.
            pub fn replace(&mut self, data: &[u8]) -> Result<(), BencodeError> {
                let mark = self.tree.len();
                let id = decode_into(self.tree, data, &Limits::default())?;
                let mismatch = self.tree.$check(id).err();
                if let Some(e) = mismatch {
                    self.tree.truncate(mark);
                    return Err(e);
                }
                debug!(?id, "view rebound to freshly decoded node");
                self.id = id;
                Ok(())
            }
        }
    };
}

/// View of an integer node.
#[derive(Debug)]
pub struct IntView<'t> {
    tree: &'t mut Tree,
    id: NodeId,
}

view_common!(IntView, as_integer, "an integer");

impl IntView<'_> {
    /// The bound integer.
    pub fn get(&self) -> i64 {
        match self.tree.node(self.id) {
            Value::Integer(v) => *v,
            _ => unreachable!("bound node is an integer"),
        }
    }

    /// Overwrites the bound integer.
    pub fn set(&mut self, value: i64) {
        if let Value::Integer(slot) = self.tree.node_mut(self.id) {
            *slot = value;
        }
    }
}

/// View of a byte string node.
#[derive(Debug)]
pub struct StrView<'t> {
    tree: &'t mut Tree,
    id: NodeId,
}

view_common!(StrView, as_bytes, "a byte string");

impl StrView<'_> {
    /// The bound bytes.
    pub fn get(&self) -> &Bytes {
        match self.tree.node(self.id) {
            Value::Bytes(b) => b,
            _ => unreachable!("bound node is a byte string"),
        }
    }

    /// The bound bytes as UTF-8 text, if they are valid UTF-8.
    pub fn get_str(&self) -> Result<&str, BencodeError> {
        self.tree.as_str(self.id)
    }

    /// Overwrites the bound bytes.
    pub fn set(&mut self, value: impl Into<Bytes>) {
        if let Value::Bytes(slot) = self.tree.node_mut(self.id) {
            *slot = value.into();
        }
    }
}

/// View of a list node.
#[derive(Debug)]
pub struct ListView<'t> {
    tree: &'t mut Tree,
    id: NodeId,
}

view_common!(ListView, as_list, "a list");

impl ListView<'_> {
    /// Number of items in the bound list.
    pub fn len(&self) -> usize {
        match self.tree.node(self.id) {
            Value::List(items) => items.len(),
            _ => unreachable!("bound node is a list"),
        }
    }

    /// Returns true if the bound list has no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Id of the item at `index`, if in range.
    pub fn at(&self, index: usize) -> Option<NodeId> {
        match self.tree.node(self.id) {
            Value::List(items) => items.get(index).copied(),
            _ => unreachable!("bound node is a list"),
        }
    }

    /// Appends a previously created node to the bound list.
    ///
    /// # Errors
    ///
    /// [`BencodeError::Invalid`] if the bound list is reachable from `item`,
    /// which would make the tree cyclic and every recursive walk endless.
    pub fn push(&mut self, item: NodeId) -> Result<(), BencodeError> {
        if self.tree.subtree_contains(item, self.id) {
            return Err(BencodeError::Invalid("insertion would create a cycle"));
        }
        if let Value::List(items) = self.tree.node_mut(self.id) {
            items.push(item);
        }
        Ok(())
    }
}

/// View of a dict node.
#[derive(Debug)]
pub struct DictView<'t> {
    tree: &'t mut Tree,
    id: NodeId,
}

view_common!(DictView, as_dict, "a dict");

impl DictView<'_> {
    /// Number of entries in the bound dict.
    pub fn len(&self) -> usize {
        match self.tree.node(self.id) {
            Value::Dict(entries) => entries.len(),
            _ => unreachable!("bound node is a dict"),
        }
    }

    /// Returns true if the bound dict has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if `key` is present.
    pub fn contains(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Id of the value stored under `key`, if present.
    pub fn get(&self, key: &[u8]) -> Option<NodeId> {
        match self.tree.node(self.id) {
            Value::Dict(entries) => entries.get(key).copied(),
            _ => unreachable!("bound node is a dict"),
        }
    }

    /// Stores a previously created node under `key`, returning the id it
    /// displaced, if any.
    ///
    /// # Errors
    ///
    /// [`BencodeError::Invalid`] if the bound dict is reachable from `value`,
    /// which would make the tree cyclic and every recursive walk endless.
    pub fn insert(
        &mut self,
        key: impl Into<Bytes>,
        value: NodeId,
    ) -> Result<Option<NodeId>, BencodeError> {
        if self.tree.subtree_contains(value, self.id) {
            return Err(BencodeError::Invalid("insertion would create a cycle"));
        }
        match self.tree.node_mut(self.id) {
            Value::Dict(entries) => Ok(entries.insert(key.into(), value)),
            _ => unreachable!("bound node is a dict"),
        }
    }
}
