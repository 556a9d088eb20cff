use std::io::Write;

use crate::error::BencodeError;
use crate::value::{NodeId, Tree, Value};

/// Encodes a tree's root node to a byte vector in canonical form.
///
/// Canonical form means minimal-digit integers and dict keys emitted in
/// non-decreasing byte order; the dict storage guarantees the ordering, so
/// encoding a well-formed tree cannot produce non-canonical output.
///
/// # Errors
///
/// [`BencodeError::Invalid`] if the tree has no root node.
///
/// # Examples
///
/// ```
/// use benc::{decode, encode};
///
/// let tree = decode(b"li1ei2ee").unwrap();
/// assert_eq!(encode(&tree).unwrap(), b"li1ei2ee");
/// ```
pub fn encode(tree: &Tree) -> Result<Vec<u8>, BencodeError> {
    let root = tree.root().ok_or(BencodeError::Invalid("empty tree"))?;
    let mut buf = Vec::new();
    encode_node(tree, root, &mut buf)?;
    Ok(buf)
}

/// Encodes the node `id` into `writer`, returning the number of bytes
/// written.
pub fn encode_node<W: Write>(
    tree: &Tree,
    id: NodeId,
    writer: &mut W,
) -> Result<usize, BencodeError> {
    match tree.node(id) {
        Value::Integer(v) => encode_integer(writer, *v),
        Value::Bytes(b) => encode_string(writer, b),
        Value::List(items) => {
            writer.write_all(b"l")?;
            let mut written = 2;
            for &item in items {
                written += encode_node(tree, item, writer)?;
            }
            writer.write_all(b"e")?;
            Ok(written)
        }
        Value::Dict(entries) => {
            writer.write_all(b"d")?;
            let mut written = 2;
            for (key, &value) in entries {
                written += encode_string(writer, key)?;
                written += encode_node(tree, value, writer)?;
            }
            writer.write_all(b"e")?;
            Ok(written)
        }
    }
}

/// Writes `i<decimal>e`, returning the number of bytes written.
pub fn encode_integer<W: Write>(writer: &mut W, value: i64) -> Result<usize, BencodeError> {
    let text = format!("i{}e", value);
    writer.write_all(text.as_bytes())?;
    Ok(text.len())
}

/// Writes `<len>:<bytes>`, returning the number of bytes written.
pub fn encode_string<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<usize, BencodeError> {
    let prefix = format!("{}:", bytes.len());
    writer.write_all(prefix.as_bytes())?;
    writer.write_all(bytes)?;
    Ok(prefix.len() + bytes.len())
}
