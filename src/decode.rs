use bytes::Bytes;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::trace;

use crate::error::BencodeError;
use crate::value::{NodeId, Tree};

/// Default maximum container nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Default maximum declared byte string length (64 MiB).
pub const DEFAULT_MAX_STRING_LEN: usize = 64 * 1024 * 1024;

/// Resource limits enforced while decoding.
///
/// Bencode itself puts no bound on nesting depth or on the length prefix of a
/// byte string, so hostile input could otherwise exhaust the call stack or
/// memory before hitting a syntax error. Exceeding either bound fails with
/// [`BencodeError::LimitExceeded`].
#[derive(Debug, Clone)]
pub struct Limits {
    /// Maximum container nesting depth.
    pub max_depth: usize,
    /// Maximum declared byte string length.
    pub max_string_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_depth: DEFAULT_MAX_DEPTH,
            max_string_len: DEFAULT_MAX_STRING_LEN,
        }
    }
}

/// Decodes a complete bencode value with default [`Limits`].
///
/// The whole input must be consumed; extra bytes after the value fail with
/// [`BencodeError::TrailingData`]. On any failure no tree is returned, never
/// a partially built one.
///
/// # Examples
///
/// ```
/// use benc::decode;
///
/// let tree = decode(b"d3:fooi1ee").unwrap();
/// let root = tree.root().unwrap();
/// let dict = tree.as_dict(root).unwrap();
/// let foo = dict[b"foo".as_slice()];
/// assert_eq!(tree.as_integer(foo).unwrap(), 1);
/// ```
pub fn decode(data: &[u8]) -> Result<Tree, BencodeError> {
    decode_with(data, &Limits::default())
}

/// Decodes a complete bencode value with explicit [`Limits`].
pub fn decode_with(data: &[u8], limits: &Limits) -> Result<Tree, BencodeError> {
    let mut tree = Tree::new();
    let mut pos = 0;
    let root = decode_value(&mut tree, data, &mut pos, 0, limits)?;

    if pos != data.len() {
        return Err(BencodeError::TrailingData);
    }

    tree.set_root(root);
    Ok(tree)
}

/// Decodes a complete bencode value into an existing tree, returning the id
/// of the new subtree's root.
///
/// On failure the tree is rolled back to its prior state, so a failed decode
/// leaves no nodes behind. The tree's designated root is not changed.
pub fn decode_into(tree: &mut Tree, data: &[u8], limits: &Limits) -> Result<NodeId, BencodeError> {
    let mark = tree.len();
    let mut pos = 0;

    let result = decode_value(tree, data, &mut pos, 0, limits).and_then(|id| {
        if pos != data.len() {
            return Err(BencodeError::TrailingData);
        }
        Ok(id)
    });

    if result.is_err() {
        tree.truncate(mark);
    }
    result
}

fn decode_value(
    tree: &mut Tree,
    data: &[u8],
    pos: &mut usize,
    depth: usize,
    limits: &Limits,
) -> Result<NodeId, BencodeError> {
    if depth > limits.max_depth {
        trace!(depth, max = limits.max_depth, "nesting depth limit hit");
        return Err(BencodeError::LimitExceeded("nesting depth"));
    }

    match peek(data, *pos)? {
        b'i' => {
            let value = decode_integer(data, pos)?;
            Ok(tree.integer(value))
        }
        b'l' => decode_list(tree, data, pos, depth, limits),
        b'd' => decode_dict(tree, data, pos, depth, limits),
        b'0'..=b'9' => {
            let bytes = decode_string_with(data, pos, limits)?;
            Ok(tree.bytes(bytes))
        }
        _ => Err(BencodeError::Invalid("unexpected byte")),
    }
}

/// Decodes a single `i<decimal>e` integer at `pos`.
///
/// Rejects `-0`, leading zeros, and an empty digit run. A building block
/// usable on its own; [`decode`] reaches it through the dispatch on the
/// lookahead byte.
pub fn decode_integer(data: &[u8], pos: &mut usize) -> Result<i64, BencodeError> {
    if peek(data, *pos)? != b'i' {
        return Err(BencodeError::ExpectedIntroducer);
    }
    *pos += 1;

    let negative = data.get(*pos) == Some(&b'-');
    if negative {
        *pos += 1;
    }

    // Accumulated as a negative magnitude so i64::MIN is representable.
    let digits_start = *pos;
    let mut value: i64 = 0;
    while let Some(&b) = data.get(*pos) {
        if !b.is_ascii_digit() {
            break;
        }
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_sub(i64::from(b - b'0')))
            .ok_or(BencodeError::Invalid("integer overflow"))?;
        *pos += 1;
    }

    if *pos == digits_start {
        return Err(BencodeError::ExpectedDigit);
    }
    if data[digits_start] == b'0' && *pos - digits_start > 1 {
        return Err(BencodeError::Invalid("leading zeros"));
    }
    if negative && value == 0 {
        return Err(BencodeError::Invalid("negative zero"));
    }

    if data.get(*pos) != Some(&b'e') {
        return Err(BencodeError::ExpectedTerminator);
    }
    *pos += 1;

    if negative {
        Ok(value)
    } else {
        value
            .checked_neg()
            .ok_or(BencodeError::Invalid("integer overflow"))
    }
}

/// Decodes a single `<len>:<bytes>` string at `pos` with default [`Limits`].
pub fn decode_string(data: &[u8], pos: &mut usize) -> Result<Bytes, BencodeError> {
    decode_string_with(data, pos, &Limits::default())
}

fn decode_string_with(
    data: &[u8],
    pos: &mut usize,
    limits: &Limits,
) -> Result<Bytes, BencodeError> {
    if !peek(data, *pos)?.is_ascii_digit() {
        return Err(BencodeError::ExpectedDigit);
    }

    let mut len: usize = 0;
    while let Some(&b) = data.get(*pos) {
        if !b.is_ascii_digit() {
            break;
        }
        len = len
            .checked_mul(10)
            .and_then(|l| l.checked_add((b - b'0') as usize))
            .ok_or(BencodeError::LimitExceeded("string length"))?;
        *pos += 1;
    }

    if len > limits.max_string_len {
        trace!(len, max = limits.max_string_len, "string length limit hit");
        return Err(BencodeError::LimitExceeded("string length"));
    }

    if data.get(*pos) != Some(&b':') {
        return Err(BencodeError::ExpectedColon);
    }
    *pos += 1;

    // `*pos <= data.len()` here, so the subtraction cannot wrap even when a
    // caller raises `max_string_len` toward `usize::MAX`.
    if len > data.len() - *pos {
        return Err(BencodeError::Invalid("truncated byte string"));
    }

    let bytes = Bytes::copy_from_slice(&data[*pos..*pos + len]);
    *pos += len;

    Ok(bytes)
}

fn decode_list(
    tree: &mut Tree,
    data: &[u8],
    pos: &mut usize,
    depth: usize,
    limits: &Limits,
) -> Result<NodeId, BencodeError> {
    *pos += 1;
    let mut items = Vec::new();

    loop {
        match data.get(*pos) {
            None => return Err(BencodeError::ExpectedTerminator),
            Some(b'e') => break,
            Some(_) => items.push(decode_value(tree, data, pos, depth + 1, limits)?),
        }
    }

    *pos += 1;
    Ok(tree.list(items))
}

fn decode_dict(
    tree: &mut Tree,
    data: &[u8],
    pos: &mut usize,
    depth: usize,
    limits: &Limits,
) -> Result<NodeId, BencodeError> {
    *pos += 1;
    let mut entries = BTreeMap::new();

    loop {
        match data.get(*pos) {
            None => return Err(BencodeError::ExpectedTerminator),
            Some(b'e') => break,
            Some(_) => {
                // Keys must be length-prefixed strings; anything else fails
                // before a value is even attempted.
                let key = decode_string_with(data, pos, limits)?;
                let value = decode_value(tree, data, pos, depth + 1, limits)?;

                // First occurrence wins; later duplicates are discarded.
                if let Entry::Vacant(slot) = entries.entry(key) {
                    slot.insert(value);
                }
            }
        }
    }

    *pos += 1;
    Ok(tree.dict(entries))
}

fn peek(data: &[u8], pos: usize) -> Result<u8, BencodeError> {
    data.get(pos)
        .copied()
        .ok_or(BencodeError::Invalid("unexpected end of input"))
}
