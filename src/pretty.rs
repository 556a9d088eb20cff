//! JSON-like debug rendering of a tree.
//!
//! A readability adapter only: output is lossy (non-UTF-8 bytes are
//! replaced), not bit-exact, and consumed by nothing else in the crate.

use std::fmt;

use crate::mapping::Bencode;
use crate::value::{NodeId, Tree, Value};

/// Displayable JSON-like rendering of one node, from [`Tree::pretty`].
#[derive(Debug, Clone, Copy)]
pub struct Pretty<'t> {
    tree: &'t Tree,
    id: NodeId,
}

impl Tree {
    /// Renders the node `id` as indented JSON-like text.
    pub fn pretty(&self, id: NodeId) -> Pretty<'_> {
        Pretty { tree: self, id }
    }
}

impl fmt::Display for Pretty<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_node(self.tree, self.id, 0, f)
    }
}

impl fmt::Display for Bencode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_node(self.tree(), self.root(), 0, f)
    }
}

fn fmt_node(tree: &Tree, id: NodeId, indent: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match tree.node(id) {
        Value::Integer(v) => write!(f, "{}", v),
        Value::Bytes(b) => {
            write!(f, "\"{}\"", String::from_utf8_lossy(b).escape_default())
        }
        Value::List(items) => {
            f.write_str("[")?;
            for (i, &item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                fmt_node(tree, item, indent, f)?;
            }
            f.write_str("]")
        }
        Value::Dict(entries) => {
            if entries.is_empty() {
                return f.write_str("{}");
            }
            f.write_str("{\n")?;
            let pad = "  ".repeat(indent + 1);
            let mut first = true;
            for (key, &value) in entries {
                if !first {
                    f.write_str(",\n")?;
                }
                first = false;
                write!(f, "{}\"{}\": ", pad, String::from_utf8_lossy(key).escape_default())?;
                fmt_node(tree, value, indent + 1, f)?;
            }
            write!(f, "\n{}}}", "  ".repeat(indent))
        }
    }
}
