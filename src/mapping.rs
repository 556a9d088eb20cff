//! Mapping between native values and bencode trees.
//!
//! Conversion is driven by two capability traits, [`ToBencode`] and
//! [`FromBencode`], implemented once per supported type. The crate covers
//! the closed structural categories itself: primitives (`i64`, `u32`, `u64`,
//! `String`, `&str`, [`Bytes`]), sequences (`Vec<T>`), and string-keyed
//! mappings (`BTreeMap<String, T>`, `HashMap<String, T>`). Anything else is
//! an aggregate and supplies its own pair of implementations, written
//! against the dict façade — one keyed assignment per field on the way out,
//! one keyed retrieval per field on the way in. The mapping core never
//! inspects an aggregate's layout; it only calls the pair.
//!
//! Nesting context lives on the call stack: each aggregate level constructs
//! its own [`Scope`] over a fresh child dict, so one conversion can recurse
//! through arbitrarily deep aggregates without any shared "current dict"
//! state to save and restore.
//!
//! # Examples
//!
//! ```
//! use benc::{bencode_aggregate, from_bytes, to_bytes};
//!
//! #[derive(Debug, PartialEq)]
//! struct Student {
//!     name: String,
//!     sid: i64,
//! }
//!
//! bencode_aggregate!(Student { name, sid });
//!
//! # fn main() -> Result<(), benc::BencodeError> {
//! let student = Student { name: "alice".to_string(), sid: 42 };
//! let bytes = to_bytes(&student)?;
//! assert_eq!(bytes, b"d4:name5:alice3:sidi42ee");
//!
//! let back: Student = from_bytes(&bytes)?;
//! assert_eq!(back, student);
//! # Ok(())
//! # }
//! ```

use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;

use crate::decode::decode;
use crate::encode::{encode, encode_node};
use crate::error::BencodeError;
use crate::value::{NodeId, Tree};
use crate::view::{DictView, ListView};

/// Reserved root-dict key holding the list built by [`Bencode::append`].
const APPEND_KEY: &[u8] = b"LIST";

/// Converts a native value into tree nodes.
pub trait ToBencode {
    /// Builds this value's node in `tree` and returns its id. Children are
    /// created before the node that references them.
    fn to_node(&self, tree: &mut Tree) -> Result<NodeId, BencodeError>;
}

/// Reconstructs a native value from a tree node.
pub trait FromBencode: Sized {
    /// Reads this value back out of the node `id`.
    fn from_node(tree: &Tree, id: NodeId) -> Result<Self, BencodeError>;
}

/// Serializes `value` straight to canonical bencode bytes.
pub fn to_bytes<T: ToBencode + ?Sized>(value: &T) -> Result<Vec<u8>, BencodeError> {
    let mut tree = Tree::new();
    let id = value.to_node(&mut tree)?;
    let mut buf = Vec::new();
    encode_node(&tree, id, &mut buf)?;
    Ok(buf)
}

/// Decodes `data` and reconstructs a `T` from the resulting tree.
pub fn from_bytes<T: FromBencode>(data: &[u8]) -> Result<T, BencodeError> {
    let tree = decode(data)?;
    let root = tree.root().ok_or(BencodeError::Invalid("empty tree"))?;
    T::from_node(&tree, root)
}

impl ToBencode for i64 {
    fn to_node(&self, tree: &mut Tree) -> Result<NodeId, BencodeError> {
        Ok(tree.integer(*self))
    }
}

impl FromBencode for i64 {
    fn from_node(tree: &Tree, id: NodeId) -> Result<Self, BencodeError> {
        tree.as_integer(id)
    }
}

impl ToBencode for u32 {
    fn to_node(&self, tree: &mut Tree) -> Result<NodeId, BencodeError> {
        Ok(tree.integer(i64::from(*self)))
    }
}

impl FromBencode for u32 {
    fn from_node(tree: &Tree, id: NodeId) -> Result<Self, BencodeError> {
        u32::try_from(tree.as_integer(id)?)
            .map_err(|_| BencodeError::Invalid("integer out of range"))
    }
}

impl ToBencode for u64 {
    fn to_node(&self, tree: &mut Tree) -> Result<NodeId, BencodeError> {
        let value =
            i64::try_from(*self).map_err(|_| BencodeError::Invalid("integer overflow"))?;
        Ok(tree.integer(value))
    }
}

impl FromBencode for u64 {
    fn from_node(tree: &Tree, id: NodeId) -> Result<Self, BencodeError> {
        u64::try_from(tree.as_integer(id)?)
            .map_err(|_| BencodeError::Invalid("integer out of range"))
    }
}

impl ToBencode for String {
    fn to_node(&self, tree: &mut Tree) -> Result<NodeId, BencodeError> {
        Ok(tree.string(self))
    }
}

impl FromBencode for String {
    fn from_node(tree: &Tree, id: NodeId) -> Result<Self, BencodeError> {
        Ok(tree.as_str(id)?.to_owned())
    }
}

impl ToBencode for &str {
    fn to_node(&self, tree: &mut Tree) -> Result<NodeId, BencodeError> {
        Ok(tree.string(self))
    }
}

impl ToBencode for Bytes {
    fn to_node(&self, tree: &mut Tree) -> Result<NodeId, BencodeError> {
        Ok(tree.bytes(self.clone()))
    }
}

impl FromBencode for Bytes {
    fn from_node(tree: &Tree, id: NodeId) -> Result<Self, BencodeError> {
        Ok(tree.as_bytes(id)?.clone())
    }
}

impl<T: ToBencode> ToBencode for Vec<T> {
    fn to_node(&self, tree: &mut Tree) -> Result<NodeId, BencodeError> {
        let mut items = Vec::with_capacity(self.len());
        for value in self {
            items.push(value.to_node(tree)?);
        }
        Ok(tree.list(items))
    }
}

impl<T: FromBencode> FromBencode for Vec<T> {
    fn from_node(tree: &Tree, id: NodeId) -> Result<Self, BencodeError> {
        tree.as_list(id)?
            .iter()
            .map(|&item| T::from_node(tree, item))
            .collect()
    }
}

fn map_to_node<'a, T, I>(entries: I, tree: &mut Tree) -> Result<NodeId, BencodeError>
where
    T: ToBencode + 'a,
    I: Iterator<Item = (&'a String, &'a T)>,
{
    let mut dict = BTreeMap::new();
    for (key, value) in entries {
        let child = value.to_node(tree)?;
        dict.insert(Bytes::copy_from_slice(key.as_bytes()), child);
    }
    Ok(tree.dict(dict))
}

fn map_from_node<T, M>(tree: &Tree, id: NodeId) -> Result<M, BencodeError>
where
    T: FromBencode,
    M: FromIterator<(String, T)>,
{
    tree.as_dict(id)?
        .iter()
        .map(|(key, &value)| {
            let key = std::str::from_utf8(key)
                .map_err(|_| BencodeError::Invalid("dict key is not utf-8"))?
                .to_owned();
            Ok((key, T::from_node(tree, value)?))
        })
        .collect()
}

impl<T: ToBencode> ToBencode for BTreeMap<String, T> {
    fn to_node(&self, tree: &mut Tree) -> Result<NodeId, BencodeError> {
        map_to_node(self.iter(), tree)
    }
}

impl<T: FromBencode> FromBencode for BTreeMap<String, T> {
    fn from_node(tree: &Tree, id: NodeId) -> Result<Self, BencodeError> {
        map_from_node(tree, id)
    }
}

impl<T: ToBencode> ToBencode for HashMap<String, T> {
    fn to_node(&self, tree: &mut Tree) -> Result<NodeId, BencodeError> {
        map_to_node(self.iter(), tree)
    }
}

impl<T: FromBencode> FromBencode for HashMap<String, T> {
    fn from_node(tree: &Tree, id: NodeId) -> Result<Self, BencodeError> {
        map_from_node(tree, id)
    }
}

/// A mutable dict cursor used by serialize descriptors.
///
/// Each aggregate nesting level constructs its own scope over a fresh child
/// dict, so recursion state is held entirely on the call stack.
#[derive(Debug)]
pub struct Scope<'t> {
    tree: &'t mut Tree,
    dict: NodeId,
}

impl<'t> Scope<'t> {
    /// Creates a scope over a fresh, empty dict node.
    pub fn new(tree: &'t mut Tree) -> Self {
        let dict = tree.dict(BTreeMap::new());
        Scope { tree, dict }
    }

    /// Binds a scope to an existing dict node.
    pub fn bind(tree: &'t mut Tree, id: NodeId) -> Result<Self, BencodeError> {
        tree.as_dict(id)?;
        Ok(Scope { tree, dict: id })
    }

    /// Id of the dict this scope writes into.
    pub fn node(&self) -> NodeId {
        self.dict
    }

    /// Stages `key` for the next keyed assignment or retrieval.
    pub fn select<'a>(&'a mut self, key: &'a str) -> Entry<'a> {
        Entry {
            tree: &mut *self.tree,
            dict: self.dict,
            key,
        }
    }
}

/// A staged key awaiting its keyed operation.
///
/// Holding the key here rather than in façade state means an unkeyed
/// assignment simply cannot be expressed.
#[derive(Debug)]
pub struct Entry<'a> {
    tree: &'a mut Tree,
    dict: NodeId,
    key: &'a str,
}

impl Entry<'_> {
    /// Stores `value` under the staged key, dispatching on its structural
    /// category through [`ToBencode`].
    pub fn assign<T: ToBencode + ?Sized>(self, value: &T) -> Result<(), BencodeError> {
        let id = value.to_node(self.tree)?;
        let key = Bytes::copy_from_slice(self.key.as_bytes());
        DictView::bind(self.tree, self.dict)?.insert(key, id)?;
        Ok(())
    }

    /// Reads the value under the staged key back out.
    pub fn retrieve<T: FromBencode>(&self) -> Result<T, BencodeError> {
        EntryRef {
            tree: &*self.tree,
            dict: self.dict,
            key: self.key,
        }
        .retrieve()
    }

    /// Like [`retrieve`](Entry::retrieve), but populates an existing value.
    pub fn retrieve_to<T: FromBencode>(&self, dest: &mut T) -> Result<(), BencodeError> {
        *dest = self.retrieve()?;
        Ok(())
    }
}

/// The shared-borrow counterpart of [`Scope`], used by deserialize
/// descriptors.
#[derive(Debug, Clone, Copy)]
pub struct ScopeRef<'t> {
    tree: &'t Tree,
    dict: NodeId,
}

impl<'t> ScopeRef<'t> {
    /// Binds a read scope to an existing dict node.
    pub fn bind(tree: &'t Tree, id: NodeId) -> Result<Self, BencodeError> {
        tree.as_dict(id)?;
        Ok(ScopeRef { tree, dict: id })
    }

    /// Stages `key` for a keyed retrieval.
    pub fn select<'a>(&'a self, key: &'a str) -> EntryRef<'a> {
        EntryRef {
            tree: self.tree,
            dict: self.dict,
            key,
        }
    }
}

/// A staged key awaiting a keyed retrieval.
#[derive(Debug, Clone, Copy)]
pub struct EntryRef<'a> {
    tree: &'a Tree,
    dict: NodeId,
    key: &'a str,
}

impl EntryRef<'_> {
    /// Reads the value under the staged key. A missing key is a hard
    /// [`BencodeError::KeyNotFound`], never a default.
    pub fn retrieve<T: FromBencode>(&self) -> Result<T, BencodeError> {
        let id = self
            .tree
            .as_dict(self.dict)?
            .get(self.key.as_bytes())
            .copied()
            .ok_or_else(|| BencodeError::KeyNotFound(self.key.to_owned()))?;
        T::from_node(self.tree, id)
    }

    /// Like [`retrieve`](EntryRef::retrieve), but populates an existing
    /// value.
    pub fn retrieve_to<T: FromBencode>(&self, dest: &mut T) -> Result<(), BencodeError> {
        *dest = self.retrieve()?;
        Ok(())
    }
}

/// A dict-rooted document façade over a tree.
///
/// Keyed work goes through [`select`](Bencode::select); ordered work goes
/// through [`append`](Bencode::append) and [`at`](Bencode::at), which keep a
/// single reserved-key list node (`"LIST"`) in the root dict.
///
/// # Examples
///
/// ```
/// use benc::Bencode;
///
/// # fn main() -> Result<(), benc::BencodeError> {
/// let mut b = Bencode::new();
/// b.select("name").assign(&"alice")?;
/// b.select("sid").assign(&42i64)?;
///
/// let sid: i64 = b.retrieve("sid")?;
/// assert_eq!(sid, 42);
/// assert_eq!(b.to_bytes()?, b"d4:name5:alice3:sidi42ee");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Bencode {
    tree: Tree,
    root: NodeId,
}

impl Bencode {
    /// Creates a façade over a fresh tree with an empty root dict.
    pub fn new() -> Self {
        let mut tree = Tree::new();
        let root = tree.dict(BTreeMap::new());
        tree.set_root(root);
        Bencode { tree, root }
    }

    /// Decodes `data` and wraps the result, which must be a dict.
    pub fn from_bytes(data: &[u8]) -> Result<Self, BencodeError> {
        let tree = decode(data)?;
        let root = tree.root().ok_or(BencodeError::Invalid("empty tree"))?;
        tree.as_dict(root)?;
        Ok(Bencode { tree, root })
    }

    /// Serializes the whole document in canonical form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, BencodeError> {
        encode(&self.tree)
    }

    /// The underlying tree.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// The underlying tree, mutably. Typed views bind through this.
    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    /// Id of the root dict.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Stages `key` against the root dict.
    pub fn select<'a>(&'a mut self, key: &'a str) -> Entry<'a> {
        Entry {
            tree: &mut self.tree,
            dict: self.root,
            key,
        }
    }

    /// Keyed retrieval from the root dict without staging an [`Entry`].
    pub fn retrieve<T: FromBencode>(&self, key: &str) -> Result<T, BencodeError> {
        EntryRef {
            tree: &self.tree,
            dict: self.root,
            key,
        }
        .retrieve()
    }

    /// Appends `value` to the reserved list, creating it on first use.
    pub fn append<T: ToBencode + ?Sized>(&mut self, value: &T) -> Result<&mut Self, BencodeError> {
        let item = value.to_node(&mut self.tree)?;

        let existing = self.tree.as_dict(self.root)?.get(APPEND_KEY).copied();
        let list = match existing {
            Some(id) => {
                self.tree.as_list(id)?;
                id
            }
            None => {
                let id = self.tree.list(Vec::new());
                DictView::bind(&mut self.tree, self.root)?
                    .insert(Bytes::from_static(APPEND_KEY), id)?;
                id
            }
        };

        ListView::bind(&mut self.tree, list)?.push(item)?;
        Ok(self)
    }

    /// Deferred accessor for the reserved list's element at `index`.
    ///
    /// The element id is resolved now; conversion happens only when
    /// [`Lazy::value`] is called.
    pub fn at<T: FromBencode>(&self, index: usize) -> Result<Lazy<'_, T>, BencodeError> {
        let list = self
            .tree
            .as_dict(self.root)?
            .get(APPEND_KEY)
            .copied()
            .ok_or_else(|| BencodeError::KeyNotFound("LIST".to_owned()))?;
        let id = self
            .tree
            .as_list(list)?
            .get(index)
            .copied()
            .ok_or(BencodeError::Invalid("list index out of range"))?;
        Ok(Lazy {
            tree: &self.tree,
            id,
            _marker: PhantomData,
        })
    }
}

impl Default for Bencode {
    fn default() -> Self {
        Bencode::new()
    }
}

/// A deferred element accessor returned by [`Bencode::at`].
#[derive(Debug, Clone, Copy)]
pub struct Lazy<'t, T> {
    tree: &'t Tree,
    id: NodeId,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FromBencode> Lazy<'_, T> {
    /// Converts the element now.
    pub fn value(&self) -> Result<T, BencodeError> {
        T::from_node(self.tree, self.id)
    }
}

/// Generates the [`ToBencode`]/[`FromBencode`] pair for a named-field
/// aggregate: one keyed assignment and one keyed retrieval per listed field.
///
/// # Examples
///
/// ```
/// use benc::bencode_aggregate;
///
/// struct Point {
///     x: i64,
///     y: i64,
/// }
///
/// bencode_aggregate!(Point { x, y });
/// ```
#[macro_export]
macro_rules! bencode_aggregate {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        impl $crate::ToBencode for $ty {
            fn to_node(
                &self,
                tree: &mut $crate::Tree,
            ) -> Result<$crate::NodeId, $crate::BencodeError> {
                let mut scope = $crate::Scope::new(tree);
                $(scope.select(stringify!($field)).assign(&self.$field)?;)+
                Ok(scope.node())
            }
        }

        impl $crate::FromBencode for $ty {
            fn from_node(
                tree: &$crate::Tree,
                id: $crate::NodeId,
            ) -> Result<Self, $crate::BencodeError> {
                let scope = $crate::ScopeRef::bind(tree, id)?;
                Ok(Self {
                    $($field: scope.select(stringify!($field)).retrieve()?,)+
                })
            }
        }
    };
}
