use grove_types::NodeHash;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g. `"grove-node-v1"`) prepended to
/// every hash computation. This prevents cross-type collisions: a node
/// encoding and a raw blob with identical bytes produce different hashes.
pub struct NodeHasher {
    domain: &'static str,
}

impl NodeHasher {
    /// Hasher for canonical node encodings.
    pub const NODE: Self = Self {
        domain: "grove-node-v1",
    };
    /// Hasher for raw blob payloads (used by blob backends that address
    /// content by digest).
    pub const BLOB: Self = Self {
        domain: "grove-blob-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> NodeHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        NodeHash::from_digest(*hasher.finalize().as_bytes())
    }

    /// Verify that data produces the expected hash.
    pub fn verify(&self, data: &[u8], expected: &NodeHash) -> bool {
        self.hash(data) == *expected
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}
