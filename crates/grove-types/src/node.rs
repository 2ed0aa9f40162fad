//! Node kind discriminator and blob references.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The kind of a stored node.
///
/// The tag determines which of the node's payload fields is meaningful: a
/// leaf carries a blob reference and no children, a branch carries an ordered
/// child list and no blob reference. Never both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeTag {
    /// Terminal node referencing raw content in the external blob store.
    Leaf,
    /// Interior node referencing other nodes by content hash.
    Branch,
}

impl NodeTag {
    /// Stable wire value used by the canonical encoding.
    pub fn wire_value(&self) -> u8 {
        match self {
            Self::Leaf => 0,
            Self::Branch => 1,
        }
    }

    /// Parse from a wire value.
    pub fn from_wire_value(raw: u8) -> Result<Self, TypeError> {
        match raw {
            0 => Ok(Self::Leaf),
            1 => Ok(Self::Branch),
            other => Err(TypeError::UnknownTag(other)),
        }
    }
}

impl fmt::Display for NodeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf => write!(f, "leaf"),
            Self::Branch => write!(f, "branch"),
        }
    }
}

/// Opaque reference into the external blob store.
///
/// The store never interprets the contents of a `BlobRef`; it only hands it
/// back to the blob backend for `get`/`delete`. Backends choose their own
/// reference scheme (content digests, object keys, file offsets).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlobRef(Vec<u8>);

impl BlobRef {
    /// Wrap raw reference bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The raw reference bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobRef({})", hex::encode(&self.0))
    }
}
