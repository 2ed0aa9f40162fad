use thiserror::Error;

/// Errors from the canonical node codec.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The byte sequence does not parse to a well-typed node.
    #[error("corrupt encoding: {0}")]
    CorruptEncoding(String),

    /// Serialization of a well-formed node failed.
    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
