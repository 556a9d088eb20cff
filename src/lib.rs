//! benc - Bencode encoding, decoding, and native-value mapping
//!
//! Bencode ([BEP-3]) is the serialization format used throughout BitTorrent
//! for storing and transmitting structured data. This crate provides the
//! codec plus a mapping layer that converts native aggregate values to and
//! from the decoded tree without hand-written per-field glue.
//!
//! # Data Types
//!
//! Bencode supports four data types:
//!
//! | Type | Format | Example |
//! |------|--------|---------|
//! | Integer | `i<number>e` | `i42e` → 42 |
//! | Byte String | `<length>:<data>` | `4:spam` → "spam" |
//! | List | `l<items>e` | `l4:spami42ee` → ["spam", 42] |
//! | Dictionary | `d<key><value>...e` | `d3:foo3:bare` → {"foo": "bar"} |
//!
//! # Modules
//!
//! - [`value`] - The arena-based value tree ([`Tree`], [`Value`], [`NodeId`])
//! - [`decode`](mod@decode) - Recursive-descent decoder with configurable [`Limits`]
//! - [`encode`](mod@encode) - Canonical encoder (sorted dict keys, minimal digits)
//! - [`view`] - Typed views bound to a single node
//! - [`mapping`] - [`ToBencode`]/[`FromBencode`] traits and the [`Bencode`] façade
//! - [`pretty`] - JSON-like debug rendering
//!
//! # Examples
//!
//! ## Decoding and encoding
//!
//! ```
//! use benc::{decode, encode};
//!
//! let tree = decode(b"d3:cow3:moo4:spaml1:a1:bee").unwrap();
//! let root = tree.root().unwrap();
//! let dict = tree.as_dict(root).unwrap();
//! let cow = dict[b"cow".as_slice()];
//! assert_eq!(tree.as_str(cow).unwrap(), "moo");
//!
//! // Round-trips byte for byte: input was already canonical.
//! assert_eq!(encode(&tree).unwrap(), b"d3:cow3:moo4:spaml1:a1:bee");
//! ```
//!
//! ## Mapping native values
//!
//! ```
//! use benc::{bencode_aggregate, from_bytes, to_bytes};
//!
//! struct Torrent {
//!     announce: String,
//!     length: i64,
//! }
//!
//! bencode_aggregate!(Torrent { announce, length });
//!
//! let torrent = Torrent {
//!     announce: "http://tracker.example.com".to_string(),
//!     length: 1024,
//! };
//! let bytes = to_bytes(&torrent).unwrap();
//! let back: Torrent = from_bytes(&bytes).unwrap();
//! assert_eq!(back.announce, torrent.announce);
//! assert_eq!(back.length, torrent.length);
//! ```
//!
//! # Error Handling
//!
//! Every fallible operation returns [`BencodeError`]; malformed input and
//! misuse are surfaced as values, never as panics or process aborts. A
//! top-level decode either yields a complete, well-formed tree or a specific
//! error - never a partially populated one.
//!
//! Because bencode itself puts no bound on nesting depth or declared string
//! length, the decoder enforces configurable [`Limits`] and fails with
//! [`BencodeError::LimitExceeded`] when hostile input crosses them.
//!
//! [BEP-3]: http://bittorrent.org/beps/bep_0003.html

pub mod decode;
pub mod encode;
pub mod error;
pub mod mapping;
pub mod pretty;
pub mod value;
pub mod view;

pub use decode::{decode, decode_into, decode_with, Limits};
pub use encode::{encode, encode_node};
pub use error::BencodeError;
pub use mapping::{
    from_bytes, to_bytes, Bencode, Entry, EntryRef, FromBencode, Lazy, Scope, ScopeRef, ToBencode,
};
pub use pretty::Pretty;
pub use value::{NodeId, Tree, Value};
pub use view::{DictView, IntView, ListView, StrView};

#[cfg(test)]
mod tests;
