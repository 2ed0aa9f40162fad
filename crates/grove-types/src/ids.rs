//! Integer identifiers: node ids, GC family ids, and sweep generations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Process-local stable identity of a stored node.
///
/// Assigned by the store on first insert of a node's content, monotonically
/// increasing, and never reused while the node exists. Re-inserting identical
/// content returns the original id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    /// Create a node id from a raw integer.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw integer value.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An independent garbage-collection namespace.
///
/// Each family carries its own root set and generation counter; sweeps in
/// different families never interfere with each other's mark state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FamilyId(u64);

impl FamilyId {
    /// Create a family id from a raw integer.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw integer value.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FamilyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "family-{}", self.0)
    }
}

/// A sweep generation: a monotonically increasing counter identifying one
/// sweep attempt for a family. Generation 0 is reserved for "never swept";
/// the first allocated generation is 1.
pub type Generation = u64;
