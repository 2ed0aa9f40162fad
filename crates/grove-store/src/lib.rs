//! Content-addressed node storage for Grove.
//!
//! [`HashStore`] is the hash-indexed table at the heart of Grove: a DAG of
//! nodes keyed by the BLAKE3 digest of their canonical encoding. Inserting
//! content that already exists is an idempotent no-op returning the original
//! id, so structurally identical subtrees collapse to a single row no matter
//! how many logical objects reference them.
//!
//! # Design Rules
//!
//! 1. Nodes are immutable once written (content-addressing guarantees this).
//! 2. Children before parents: a node can only be committed once every hash
//!    in its child list is already present, so the graph is acyclic by
//!    construction.
//! 3. Uniqueness on the content hash is enforced inside the store's write
//!    path, not in caller code — concurrent inserts of identical content
//!    converge on a single surviving row.
//! 4. There is no reference-count column. Liveness is derived by the garbage
//!    collector in `grove-gc` from family root sets, never counted per edge.
//! 5. Raw payload bytes live in an external [`BlobStore`]; the node table
//!    only holds opaque [`BlobRef`]s and deletes them when a leaf is
//!    reclaimed.
//!
//! [`BlobRef`]: grove_types::BlobRef

pub mod blob;
pub mod error;
pub mod node;
pub mod store;

pub use blob::{BlobStore, InMemoryBlobStore};
pub use error::{StoreError, StoreResult};
pub use node::Node;
pub use store::HashStore;
