//! The stored node model.

use serde::{Deserialize, Serialize};

use grove_types::{BlobRef, NodeHash, NodeId, NodeTag};

/// A committed row in the node table.
///
/// Nodes are immutable once inserted: every field except `birth_epoch` is
/// covered by the content hash, and `birth_epoch` is fixed at insert time.
/// A node is destroyed only by the garbage collector, and only when no GC
/// family currently marks it live.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Process-local stable identity, assigned on first insert.
    pub id: NodeId,
    /// Content digest over the node's canonical encoding. Unique.
    pub hash: NodeHash,
    /// Node kind discriminator.
    pub tag: NodeTag,
    /// Length of the longest path to a leaf; leaves have height 0.
    pub height: u64,
    /// Ordered child hashes. Order is part of node identity.
    pub childs: Vec<NodeHash>,
    /// Opaque reference into the external blob store (leaves only).
    pub blob_ref: Option<BlobRef>,
    /// Global sweep epoch at insert time. Nodes younger than two epochs are
    /// presumed live by the collector even when unmarked.
    pub birth_epoch: u64,
}

impl Node {
    /// Returns `true` if this node is a leaf.
    pub fn is_leaf(&self) -> bool {
        self.tag == NodeTag::Leaf
    }
}
