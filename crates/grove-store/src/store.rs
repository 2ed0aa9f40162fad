//! The hash-indexed node table.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::debug;

use grove_codec::{encode, NodeHasher};
use grove_types::{BlobRef, NodeHash, NodeId, NodeTag};

use crate::blob::BlobStore;
use crate::error::{StoreError, StoreResult};
use crate::node::Node;

struct Inner {
    /// Uniqueness index over content hashes. This is the dedup key: at most
    /// one node id per hash, ever.
    by_hash: HashMap<NodeHash, NodeId>,
    /// The node rows, keyed by local id.
    nodes: HashMap<NodeId, Node>,
    /// Next id to assign. Ids are never reused while a node exists.
    next_id: u64,
}

/// The content-addressable node table.
///
/// Inserts are validated bottom-up: every child hash must already be
/// committed, so the graph is acyclic by construction. Inserting content
/// that already exists returns the existing id without touching the row.
///
/// All validation and the dedup check happen under a single write lock, so
/// concurrent callers racing to insert identical content converge on one
/// surviving row — the losers simply observe the winner's id.
pub struct HashStore<B: BlobStore> {
    blobs: Arc<B>,
    inner: RwLock<Inner>,
    /// Global sweep epoch, advanced by the collector at the start of every
    /// marking phase. Nodes are stamped with it at insert time.
    epoch: AtomicU64,
}

impl<B: BlobStore> HashStore<B> {
    /// Create an empty store over the given blob backend.
    pub fn new(blobs: Arc<B>) -> Self {
        Self {
            blobs,
            inner: RwLock::new(Inner {
                by_hash: HashMap::new(),
                nodes: HashMap::new(),
                next_id: 1,
            }),
            epoch: AtomicU64::new(0),
        }
    }

    /// The blob backend this store deletes leaf payloads through.
    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    /// Insert a node, or return the existing id if identical content is
    /// already committed.
    ///
    /// Preconditions, checked in order:
    /// - the tag and payload fields must agree ([`StoreError::MalformedNode`]);
    /// - every hash in `childs` must already exist
    ///   ([`StoreError::DanglingChildReference`]);
    /// - `height` must be 0 for leaves and 1 + max(child heights) for
    ///   branches ([`StoreError::HeightMismatch`]).
    ///
    /// A rejected insert commits nothing.
    pub fn insert(
        &self,
        tag: NodeTag,
        height: u64,
        childs: &[NodeHash],
        blob_ref: Option<BlobRef>,
    ) -> StoreResult<NodeId> {
        match tag {
            NodeTag::Leaf => {
                if !childs.is_empty() {
                    return Err(StoreError::MalformedNode {
                        reason: "leaf node carries children".to_string(),
                    });
                }
                if blob_ref.is_none() {
                    return Err(StoreError::MalformedNode {
                        reason: "leaf node missing blob reference".to_string(),
                    });
                }
                if height != 0 {
                    return Err(StoreError::HeightMismatch {
                        expected: 0,
                        actual: height,
                    });
                }
            }
            NodeTag::Branch => {
                if childs.is_empty() {
                    return Err(StoreError::MalformedNode {
                        reason: "branch node has no children".to_string(),
                    });
                }
                if blob_ref.is_some() {
                    return Err(StoreError::MalformedNode {
                        reason: "branch node carries a blob reference".to_string(),
                    });
                }
            }
        }

        let encoded = encode(tag, height, childs, blob_ref.as_ref())?;
        let hash = NodeHasher::NODE.hash(&encoded);

        let mut inner = self.inner.write().expect("lock poisoned");

        // Dedup: identical content collapses to the existing row. This check
        // runs under the write lock, so a concurrent loser of an insert race
        // lands here and reads the winner's id.
        if let Some(&id) = inner.by_hash.get(&hash) {
            return Ok(id);
        }

        if tag == NodeTag::Branch {
            let mut max_child_height = 0u64;
            for child in childs {
                let child_id = inner
                    .by_hash
                    .get(child)
                    .copied()
                    .ok_or(StoreError::DanglingChildReference { child: *child })?;
                let child_node = inner
                    .nodes
                    .get(&child_id)
                    .ok_or(StoreError::IdNotFound(child_id))?;
                max_child_height = max_child_height.max(child_node.height);
            }
            let expected = max_child_height + 1;
            if height != expected {
                return Err(StoreError::HeightMismatch {
                    expected,
                    actual: height,
                });
            }
        }

        let id = NodeId::new(inner.next_id);
        inner.next_id += 1;
        let node = Node {
            id,
            hash,
            tag,
            height,
            childs: childs.to_vec(),
            blob_ref,
            birth_epoch: self.epoch.load(Ordering::SeqCst),
        };
        inner.by_hash.insert(hash, id);
        inner.nodes.insert(id, node);

        debug!(node = %hash.short_hex(), %id, %tag, height, "inserted node");
        Ok(id)
    }

    /// Look up a node by content hash.
    pub fn get_by_hash(&self, hash: &NodeHash) -> StoreResult<Node> {
        let inner = self.inner.read().expect("lock poisoned");
        let id = inner
            .by_hash
            .get(hash)
            .ok_or(StoreError::NotFound(*hash))?;
        inner
            .nodes
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound(*hash))
    }

    /// Look up a node by local id.
    pub fn get_by_id(&self, id: NodeId) -> StoreResult<Node> {
        let inner = self.inner.read().expect("lock poisoned");
        inner.nodes.get(&id).cloned().ok_or(StoreError::IdNotFound(id))
    }

    /// Resolve a node's child hashes to local ids, in child order.
    pub fn children_of(&self, id: NodeId) -> StoreResult<Vec<NodeId>> {
        let inner = self.inner.read().expect("lock poisoned");
        let node = inner.nodes.get(&id).ok_or(StoreError::IdNotFound(id))?;
        node.childs
            .iter()
            .map(|child| {
                inner
                    .by_hash
                    .get(child)
                    .copied()
                    .ok_or(StoreError::DanglingChildReference { child: *child })
            })
            .collect()
    }

    /// Check whether a node with the given content hash exists.
    pub fn exists(&self, hash: &NodeHash) -> bool {
        let inner = self.inner.read().expect("lock poisoned");
        inner.by_hash.contains_key(hash)
    }

    /// Number of nodes currently committed.
    pub fn len(&self) -> usize {
        self.inner.read().expect("lock poisoned").nodes.len()
    }

    /// Returns `true` if the store holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.inner.read().expect("lock poisoned").nodes.is_empty()
    }

    /// A sorted snapshot of all node ids. Used by the collector's
    /// reclamation phase to enumerate candidates.
    pub fn all_ids(&self) -> Vec<NodeId> {
        let inner = self.inner.read().expect("lock poisoned");
        let mut ids: Vec<NodeId> = inner.nodes.keys().copied().collect();
        ids.sort();
        ids
    }

    /// The current global sweep epoch.
    pub fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Advance the global sweep epoch and return the new value.
    ///
    /// Called by the collector at the start of every marking phase. Nodes
    /// inserted afterwards carry a birth epoch >= the sweep's epoch and are
    /// therefore outside that sweep's reclamation horizon.
    pub fn advance_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Remove a node by id, deleting its blob payload if it is a leaf.
    /// Returns `true` if the node existed.
    ///
    /// Intended for garbage collection only. Removing a node still referenced
    /// as a child of a surviving node corrupts the store.
    pub fn remove(&self, id: NodeId) -> StoreResult<bool> {
        let node = {
            let mut inner = self.inner.write().expect("lock poisoned");
            match inner.nodes.remove(&id) {
                Some(node) => {
                    inner.by_hash.remove(&node.hash);
                    node
                }
                None => return Ok(false),
            }
        };
        if let Some(blob) = &node.blob_ref {
            self.blobs.delete(blob)?;
        }
        debug!(node = %node.hash.short_hex(), %id, "removed node");
        Ok(true)
    }
}

impl<B: BlobStore> std::fmt::Debug for HashStore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashStore")
            .field("node_count", &self.len())
            .field("epoch", &self.current_epoch())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::InMemoryBlobStore;

    fn setup() -> HashStore<InMemoryBlobStore> {
        HashStore::new(Arc::new(InMemoryBlobStore::new()))
    }

    fn insert_leaf(store: &HashStore<InMemoryBlobStore>, payload: &[u8]) -> NodeId {
        let blob = store.blobs().put(payload).unwrap();
        store.insert(NodeTag::Leaf, 0, &[], Some(blob)).unwrap()
    }

    // -----------------------------------------------------------------------
    // Insert / dedup
    // -----------------------------------------------------------------------

    #[test]
    fn insert_leaf_and_read_back() {
        let store = setup();
        let id = insert_leaf(&store, b"payload");
        let node = store.get_by_id(id).unwrap();
        assert!(node.is_leaf());
        assert_eq!(node.height, 0);
        assert_eq!(store.get_by_hash(&node.hash).unwrap(), node);
    }

    #[test]
    fn insert_is_idempotent() {
        let store = setup();
        let id1 = insert_leaf(&store, b"same");
        let id2 = insert_leaf(&store, b"same");
        assert_eq!(id1, id2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn identical_subtrees_deduplicate() {
        let store = setup();
        let leaf = insert_leaf(&store, b"shared");
        let leaf_hash = store.get_by_id(leaf).unwrap().hash;

        let b1 = store
            .insert(NodeTag::Branch, 1, &[leaf_hash], None)
            .unwrap();
        let b2 = store
            .insert(NodeTag::Branch, 1, &[leaf_hash], None)
            .unwrap();
        assert_eq!(b1, b2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn child_order_distinguishes_branches() {
        let store = setup();
        let a = store.get_by_id(insert_leaf(&store, b"a")).unwrap().hash;
        let b = store.get_by_id(insert_leaf(&store, b"b")).unwrap().hash;

        let ab = store.insert(NodeTag::Branch, 1, &[a, b], None).unwrap();
        let ba = store.insert(NodeTag::Branch, 1, &[b, a], None).unwrap();
        assert_ne!(ab, ba);
    }

    #[test]
    fn ids_are_monotonic() {
        let store = setup();
        let id1 = insert_leaf(&store, b"one");
        let id2 = insert_leaf(&store, b"two");
        assert!(id1 < id2);
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    #[test]
    fn dangling_child_is_rejected() {
        let store = setup();
        let missing = NodeHash::from_bytes(b"never inserted");
        let err = store
            .insert(NodeTag::Branch, 1, &[missing], None)
            .unwrap_err();
        assert!(matches!(err, StoreError::DanglingChildReference { child } if child == missing));
        assert!(store.is_empty());
    }

    #[test]
    fn branch_height_is_checked() {
        let store = setup();
        let leaf_hash = store.get_by_id(insert_leaf(&store, b"x")).unwrap().hash;
        let err = store
            .insert(NodeTag::Branch, 5, &[leaf_hash], None)
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::HeightMismatch {
                expected: 1,
                actual: 5
            }
        ));
    }

    #[test]
    fn branch_height_uses_max_child_height() {
        let store = setup();
        let leaf_hash = store.get_by_id(insert_leaf(&store, b"x")).unwrap().hash;
        let mid = store
            .insert(NodeTag::Branch, 1, &[leaf_hash], None)
            .unwrap();
        let mid_hash = store.get_by_id(mid).unwrap().hash;

        let top = store
            .insert(NodeTag::Branch, 2, &[mid_hash, leaf_hash], None)
            .unwrap();
        assert_eq!(store.get_by_id(top).unwrap().height, 2);
    }

    #[test]
    fn leaf_height_must_be_zero() {
        let store = setup();
        let blob = store.blobs().put(b"x").unwrap();
        let err = store.insert(NodeTag::Leaf, 1, &[], Some(blob)).unwrap_err();
        assert!(matches!(err, StoreError::HeightMismatch { expected: 0, .. }));
    }

    #[test]
    fn leaf_without_blob_is_malformed() {
        let store = setup();
        let err = store.insert(NodeTag::Leaf, 0, &[], None).unwrap_err();
        assert!(matches!(err, StoreError::MalformedNode { .. }));
    }

    #[test]
    fn branch_with_blob_is_malformed() {
        let store = setup();
        let leaf_hash = store.get_by_id(insert_leaf(&store, b"x")).unwrap().hash;
        let blob = store.blobs().put(b"y").unwrap();
        let err = store
            .insert(NodeTag::Branch, 1, &[leaf_hash], Some(blob))
            .unwrap_err();
        assert!(matches!(err, StoreError::MalformedNode { .. }));
    }

    #[test]
    fn branch_without_children_is_malformed() {
        let store = setup();
        let err = store.insert(NodeTag::Branch, 1, &[], None).unwrap_err();
        assert!(matches!(err, StoreError::MalformedNode { .. }));
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    #[test]
    fn missing_hash_is_not_found() {
        let store = setup();
        let missing = NodeHash::from_bytes(b"missing");
        assert!(matches!(
            store.get_by_hash(&missing),
            Err(StoreError::NotFound(_))
        ));
        assert!(!store.exists(&missing));
    }

    #[test]
    fn missing_id_is_not_found() {
        let store = setup();
        assert!(matches!(
            store.get_by_id(NodeId::new(99)),
            Err(StoreError::IdNotFound(_))
        ));
    }

    #[test]
    fn children_of_resolves_in_order() {
        let store = setup();
        let a = insert_leaf(&store, b"a");
        let b = insert_leaf(&store, b"b");
        let a_hash = store.get_by_id(a).unwrap().hash;
        let b_hash = store.get_by_id(b).unwrap().hash;

        let branch = store
            .insert(NodeTag::Branch, 1, &[b_hash, a_hash], None)
            .unwrap();
        assert_eq!(store.children_of(branch).unwrap(), vec![b, a]);
    }

    #[test]
    fn children_of_leaf_is_empty() {
        let store = setup();
        let id = insert_leaf(&store, b"x");
        assert!(store.children_of(id).unwrap().is_empty());
    }

    // -----------------------------------------------------------------------
    // Removal
    // -----------------------------------------------------------------------

    #[test]
    fn remove_deletes_row_and_blob() {
        let store = setup();
        let id = insert_leaf(&store, b"doomed");
        let node = store.get_by_id(id).unwrap();
        let blob = node.blob_ref.clone().unwrap();

        assert!(store.remove(id).unwrap());
        assert!(!store.exists(&node.hash));
        assert!(store.blobs().get(&blob).unwrap().is_none());
        assert!(!store.remove(id).unwrap());
    }

    #[test]
    fn remove_branch_leaves_blobs_alone() {
        let store = setup();
        let leaf = insert_leaf(&store, b"kept");
        let leaf_hash = store.get_by_id(leaf).unwrap().hash;
        let branch = store
            .insert(NodeTag::Branch, 1, &[leaf_hash], None)
            .unwrap();

        assert!(store.remove(branch).unwrap());
        assert_eq!(store.blobs().len(), 1);
    }

    // -----------------------------------------------------------------------
    // Epoch stamping
    // -----------------------------------------------------------------------

    #[test]
    fn nodes_record_their_birth_epoch() {
        let store = setup();
        let before = insert_leaf(&store, b"before");
        assert_eq!(store.advance_epoch(), 1);
        let after = insert_leaf(&store, b"after");

        assert_eq!(store.get_by_id(before).unwrap().birth_epoch, 0);
        assert_eq!(store.get_by_id(after).unwrap().birth_epoch, 1);
    }

    // -----------------------------------------------------------------------
    // Concurrent insert race
    // -----------------------------------------------------------------------

    #[test]
    fn concurrent_identical_inserts_converge() {
        use std::thread;

        let store = Arc::new(setup());
        let blob = store.blobs().put(b"contended").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let blob = blob.clone();
                thread::spawn(move || store.insert(NodeTag::Leaf, 0, &[], Some(blob)).unwrap())
            })
            .collect();

        let ids: Vec<NodeId> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(store.len(), 1);
    }
}
