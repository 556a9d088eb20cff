use thiserror::Error;

/// Errors produced by decoding, encoding, typed views, and the mapping layer.
#[derive(Debug, Error)]
pub enum BencodeError {
    /// A decimal digit was required (integer body, length prefix, or dict key).
    #[error("expected digit")]
    ExpectedDigit,

    /// The `:` separating a length prefix from its payload is missing.
    #[error("expected ':' after length prefix")]
    ExpectedColon,

    /// A scalar decoder was entered on the wrong introducer byte.
    #[error("expected introducer byte")]
    ExpectedIntroducer,

    /// The `e` terminating an integer, list, or dict is missing.
    #[error("expected 'e' terminator")]
    ExpectedTerminator,

    /// A node or keyed value did not have the requested variant.
    #[error("wrong type: expected {expected}, found {found}")]
    WrongType {
        expected: &'static str,
        found: &'static str,
    },

    /// A keyed retrieval did not find its key.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Malformed input that fits no more specific kind.
    #[error("invalid bencode: {0}")]
    Invalid(&'static str),

    /// A configured decode limit was exceeded.
    #[error("limit exceeded: {0}")]
    LimitExceeded(&'static str),

    /// Extra bytes after a complete top-level value.
    #[error("trailing data after value")]
    TrailingData,

    /// The encoder's output writer failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
