//! The canonical binary codec for node content.
//!
//! The wire form is a bincode-serialized record of `(tag, height, childs,
//! blob_ref)`. Canonicality is enforced on decode by re-encoding the parsed
//! node and requiring byte equality with the input, so every stored hash
//! corresponds to exactly one byte sequence.

use serde::{Deserialize, Serialize};

use grove_types::{BlobRef, NodeHash, NodeTag};

use crate::error::{CodecError, CodecResult};

/// The serialized record. Field order is part of the wire format.
#[derive(Serialize, Deserialize)]
struct WireNode {
    tag: u8,
    height: u64,
    childs: Vec<[u8; 32]>,
    blob_ref: Option<Vec<u8>>,
}

/// The logical content of a decoded node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedNode {
    /// Node kind discriminator.
    pub tag: NodeTag,
    /// Longest path to a leaf.
    pub height: u64,
    /// Ordered child hashes (empty for leaves).
    pub childs: Vec<NodeHash>,
    /// Blob reference (present only for leaves).
    pub blob_ref: Option<BlobRef>,
}

/// Encode node content to its canonical byte sequence.
///
/// Child order is preserved exactly as given. Two calls with equal logical
/// inputs always produce byte-identical output.
pub fn encode(
    tag: NodeTag,
    height: u64,
    childs: &[NodeHash],
    blob_ref: Option<&BlobRef>,
) -> CodecResult<Vec<u8>> {
    let wire = WireNode {
        tag: tag.wire_value(),
        height,
        childs: childs.iter().map(|c| *c.as_bytes()).collect(),
        blob_ref: blob_ref.map(|b| b.as_bytes().to_vec()),
    };
    bincode::serialize(&wire).map_err(|e| CodecError::Encoding(e.to_string()))
}

/// Decode a canonical byte sequence back into node content.
///
/// Fails with [`CodecError::CorruptEncoding`] if the bytes do not parse, if
/// the tag is unknown, if the tag and payload fields disagree (a leaf with
/// children, a branch with a blob reference), or if the bytes are not the
/// canonical encoding of the parsed node.
pub fn decode(bytes: &[u8]) -> CodecResult<DecodedNode> {
    let wire: WireNode = bincode::deserialize(bytes)
        .map_err(|e| CodecError::CorruptEncoding(e.to_string()))?;

    let tag = NodeTag::from_wire_value(wire.tag)
        .map_err(|e| CodecError::CorruptEncoding(e.to_string()))?;

    let node = DecodedNode {
        tag,
        height: wire.height,
        childs: wire.childs.into_iter().map(NodeHash::from_digest).collect(),
        blob_ref: wire.blob_ref.map(BlobRef::new),
    };

    match node.tag {
        NodeTag::Leaf => {
            if !node.childs.is_empty() {
                return Err(CodecError::CorruptEncoding(
                    "leaf node carries children".to_string(),
                ));
            }
            if node.blob_ref.is_none() {
                return Err(CodecError::CorruptEncoding(
                    "leaf node missing blob reference".to_string(),
                ));
            }
        }
        NodeTag::Branch => {
            if node.childs.is_empty() {
                return Err(CodecError::CorruptEncoding(
                    "branch node has no children".to_string(),
                ));
            }
            if node.blob_ref.is_some() {
                return Err(CodecError::CorruptEncoding(
                    "branch node carries a blob reference".to_string(),
                ));
            }
        }
    }

    // Canonicality: the input must be exactly what we would emit.
    let reencoded = encode(node.tag, node.height, &node.childs, node.blob_ref.as_ref())?;
    if reencoded != bytes {
        return Err(CodecError::CorruptEncoding(
            "non-canonical byte sequence".to_string(),
        ));
    }

    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn child(byte: u8) -> NodeHash {
        NodeHash::from_digest([byte; 32])
    }

    fn leaf_blob() -> BlobRef {
        BlobRef::new(vec![0xaa, 0xbb])
    }

    #[test]
    fn leaf_roundtrip() {
        let blob = leaf_blob();
        let bytes = encode(NodeTag::Leaf, 0, &[], Some(&blob)).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.tag, NodeTag::Leaf);
        assert_eq!(decoded.height, 0);
        assert!(decoded.childs.is_empty());
        assert_eq!(decoded.blob_ref, Some(blob));
    }

    #[test]
    fn branch_roundtrip() {
        let childs = vec![child(1), child(2)];
        let bytes = encode(NodeTag::Branch, 1, &childs, None).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.tag, NodeTag::Branch);
        assert_eq!(decoded.childs, childs);
        assert!(decoded.blob_ref.is_none());
    }

    #[test]
    fn encoding_is_deterministic() {
        let childs = vec![child(3), child(4)];
        let a = encode(NodeTag::Branch, 1, &childs, None).unwrap();
        let b = encode(NodeTag::Branch, 1, &childs, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn child_order_is_significant() {
        let ab = encode(NodeTag::Branch, 1, &[child(1), child(2)], None).unwrap();
        let ba = encode(NodeTag::Branch, 1, &[child(2), child(1)], None).unwrap();
        assert_ne!(ab, ba);
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        let err = decode(b"not a node").unwrap_err();
        assert!(matches!(err, CodecError::CorruptEncoding(_)));
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let mut bytes = encode(NodeTag::Leaf, 0, &[], Some(&leaf_blob())).unwrap();
        bytes[0] = 9; // tag is the first wire byte
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::CorruptEncoding(_)));
    }

    #[test]
    fn leaf_with_children_is_rejected() {
        let wire = super::WireNode {
            tag: 0,
            height: 0,
            childs: vec![[1; 32]],
            blob_ref: Some(vec![1]),
        };
        let bytes = bincode::serialize(&wire).unwrap();
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::CorruptEncoding(_)));
    }

    #[test]
    fn branch_with_blob_is_rejected() {
        let wire = super::WireNode {
            tag: 1,
            height: 1,
            childs: vec![[1; 32]],
            blob_ref: Some(vec![1]),
        };
        let bytes = bincode::serialize(&wire).unwrap();
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::CorruptEncoding(_)));
    }

    #[test]
    fn leaf_without_blob_is_rejected() {
        let wire = super::WireNode {
            tag: 0,
            height: 0,
            childs: vec![],
            blob_ref: None,
        };
        let bytes = bincode::serialize(&wire).unwrap();
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::CorruptEncoding(_)));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = encode(NodeTag::Leaf, 0, &[], Some(&leaf_blob())).unwrap();
        bytes.push(0);
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::CorruptEncoding(_)));
    }

    proptest! {
        #[test]
        fn branch_decode_inverts_encode(
            height in 1u64..1000,
            child_bytes in proptest::collection::vec(any::<u8>(), 1..8),
        ) {
            let childs: Vec<NodeHash> =
                child_bytes.iter().map(|b| NodeHash::from_digest([*b; 32])).collect();
            let bytes = encode(NodeTag::Branch, height, &childs, None).unwrap();
            let decoded = decode(&bytes).unwrap();
            prop_assert_eq!(decoded.height, height);
            prop_assert_eq!(decoded.childs, childs);
        }

        #[test]
        fn leaf_decode_inverts_encode(blob in proptest::collection::vec(any::<u8>(), 0..64)) {
            let blob_ref = BlobRef::new(blob);
            let bytes = encode(NodeTag::Leaf, 0, &[], Some(&blob_ref)).unwrap();
            let decoded = decode(&bytes).unwrap();
            prop_assert_eq!(decoded.blob_ref, Some(blob_ref));
        }
    }
}
