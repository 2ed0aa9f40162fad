use grove_codec::CodecError;
use grove_types::{NodeHash, NodeId};

/// Errors from node store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No node with the given content hash exists.
    #[error("node not found: {0}")]
    NotFound(NodeHash),

    /// No node with the given local id exists.
    #[error("node id not found: {0}")]
    IdNotFound(NodeId),

    /// An insert referenced a child hash absent from the store.
    #[error("dangling child reference: {child}")]
    DanglingChildReference { child: NodeHash },

    /// The declared height disagrees with the children's heights.
    #[error("height mismatch: expected {expected}, got {actual}")]
    HeightMismatch { expected: u64, actual: u64 },

    /// The tag and payload fields disagree (leaf with children, branch with
    /// a blob reference, and so on).
    #[error("malformed node: {reason}")]
    MalformedNode { reason: String },

    /// Canonical encoding or decoding failed.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
