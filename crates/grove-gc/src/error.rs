use grove_store::StoreError;
use grove_types::FamilyId;

/// Errors from garbage-collection operations.
#[derive(Debug, thiserror::Error)]
pub enum GcError {
    /// The family is not registered.
    #[error("unknown family: {0}")]
    UnknownFamily(FamilyId),

    /// A store operation failed during a sweep. The sweep for that family is
    /// aborted; other families and the node table are untouched.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result alias for GC operations.
pub type GcResult<T> = Result<T, GcError>;
