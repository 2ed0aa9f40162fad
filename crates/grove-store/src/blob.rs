//! The external blob store collaborator.
//!
//! Raw payload bytes never live in the node table; leaves hold an opaque
//! [`BlobRef`] into a backend implementing [`BlobStore`]. The node store
//! calls `delete` on a leaf's reference when that leaf is reclaimed.

use std::collections::HashMap;
use std::sync::RwLock;

use grove_codec::NodeHasher;
use grove_types::BlobRef;

use crate::error::StoreResult;

/// Byte-addressable blob storage.
///
/// Implementations must be thread-safe (`Send + Sync`). The reference scheme
/// is backend-defined and opaque to callers; the only contract is that `get`
/// returns exactly the bytes that `put` stored under the returned reference.
pub trait BlobStore: Send + Sync {
    /// Store a payload and return a reference to it.
    ///
    /// Storing the same bytes twice may return the same reference (backends
    /// are free to deduplicate).
    fn put(&self, bytes: &[u8]) -> StoreResult<BlobRef>;

    /// Fetch a payload by reference.
    ///
    /// Returns `Ok(None)` if no blob exists under the reference.
    fn get(&self, blob: &BlobRef) -> StoreResult<Option<Vec<u8>>>;

    /// Delete a payload by reference. Returns `true` if the blob existed.
    ///
    /// Intended for garbage collection only. Deleting a blob still referenced
    /// by a live leaf corrupts the store.
    fn delete(&self, blob: &BlobRef) -> StoreResult<bool>;
}

/// In-memory, HashMap-based blob store.
///
/// Intended for tests and embedding. References are domain-separated BLAKE3
/// digests of the payload, so identical payloads deduplicate to one entry.
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<BlobRef, Vec<u8>>>,
}

impl InMemoryBlobStore {
    /// Create a new empty blob store.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.blobs.read().expect("lock poisoned").is_empty()
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn put(&self, bytes: &[u8]) -> StoreResult<BlobRef> {
        let blob = BlobRef::new(NodeHasher::BLOB.hash(bytes).as_bytes().to_vec());
        let mut map = self.blobs.write().expect("lock poisoned");
        map.entry(blob.clone()).or_insert_with(|| bytes.to_vec());
        Ok(blob)
    }

    fn get(&self, blob: &BlobRef) -> StoreResult<Option<Vec<u8>>> {
        let map = self.blobs.read().expect("lock poisoned");
        Ok(map.get(blob).cloned())
    }

    fn delete(&self, blob: &BlobRef) -> StoreResult<bool> {
        let mut map = self.blobs.write().expect("lock poisoned");
        Ok(map.remove(blob).is_some())
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("blob_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_and_get() {
        let store = InMemoryBlobStore::new();
        let blob = store.put(b"payload").unwrap();
        assert_eq!(store.get(&blob).unwrap(), Some(b"payload".to_vec()));
    }

    #[test]
    fn identical_payloads_deduplicate() {
        let store = InMemoryBlobStore::new();
        let a = store.put(b"same").unwrap();
        let b = store.put(b"same").unwrap();
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn get_missing_returns_none() {
        let store = InMemoryBlobStore::new();
        let blob = BlobRef::new(vec![0; 32]);
        assert!(store.get(&blob).unwrap().is_none());
    }

    #[test]
    fn delete_present_blob() {
        let store = InMemoryBlobStore::new();
        let blob = store.put(b"to-delete").unwrap();
        assert!(store.delete(&blob).unwrap());
        assert!(store.get(&blob).unwrap().is_none());
        assert!(!store.delete(&blob).unwrap());
    }
}
