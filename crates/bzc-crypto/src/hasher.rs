/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g., `"bzc-leaf-v1"`, `"bzc-block-v1"`)
/// that is prepended to every hash computation, so a state leaf and a block
/// header with identical bytes never share a digest.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Leaves of the global state tree.
    pub const LEAF: Self = Self {
        domain: "bzc-leaf-v1",
    };
    /// Value records stored in state leaves.
    pub const BODY: Self = Self {
        domain: "bzc-body-v1",
    };
    /// Binding of a Merkle root to its leaf count.
    pub const STATE: Self = Self {
        domain: "bzc-state-v1",
    };
    /// Block headers.
    pub const BLOCK: Self = Self {
        domain: "bzc-block-v1",
    };
    /// Forward links between blocks.
    pub const LINK: Self = Self {
        domain: "bzc-link-v1",
    };
    /// Darc identifiers.
    pub const DARC: Self = Self {
        domain: "bzc-darc-v1",
    };
    /// Instruction digests covered by signatures.
    pub const INSTRUCTION: Self = Self {
        domain: "bzc-instruction-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> [u8; 32] {
        self.hash_parts(&[data])
    }

    /// Hash several byte strings; each part is length-prefixed so
    /// `("ab", "c")` and `("a", "bc")` differ.
    pub fn hash_parts(&self, parts: &[&[u8]]) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        for part in parts {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        *hasher.finalize().as_bytes()
    }

    /// Hash the bincode encoding of a value with domain separation.
    pub fn hash_encoded<T: serde::Serialize>(&self, value: &T) -> Result<[u8; 32], HasherError> {
        let data =
            bincode::serialize(value).map_err(|e| HasherError::Serialization(e.to_string()))?;
        Ok(self.hash(&data))
    }

    /// Verify that data produces the expected digest.
    pub fn verify(&self, data: &[u8], expected: &[u8; 32]) -> bool {
        self.hash(data) == *expected
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(ContentHasher::LEAF.hash(b"x"), ContentHasher::LEAF.hash(b"x"));
    }

    #[test]
    fn different_domains_produce_different_hashes() {
        let data = b"same content";
        let leaf = ContentHasher::LEAF.hash(data);
        let block = ContentHasher::BLOCK.hash(data);
        let darc = ContentHasher::DARC.hash(data);
        assert_ne!(leaf, block);
        assert_ne!(leaf, darc);
        assert_ne!(block, darc);
    }

    #[test]
    fn parts_are_length_prefixed() {
        let a = ContentHasher::LEAF.hash_parts(&[b"ab".as_slice(), b"c".as_slice()]);
        let b = ContentHasher::LEAF.hash_parts(&[b"a".as_slice(), b"bc".as_slice()]);
        assert_ne!(a, b);
    }

    #[test]
    fn verify_detects_tampering() {
        let id = ContentHasher::BLOCK.hash(b"original");
        assert!(ContentHasher::BLOCK.verify(b"original", &id));
        assert!(!ContentHasher::BLOCK.verify(b"tampered", &id));
    }

    #[test]
    fn hash_encoded_matches_manual_encoding() {
        let value = (7u64, "seven".to_string());
        let manual = ContentHasher::DARC.hash(&bincode::serialize(&value).unwrap());
        assert_eq!(ContentHasher::DARC.hash_encoded(&value).unwrap(), manual);
    }

    #[test]
    fn custom_domain() {
        let hasher = ContentHasher::new("my-custom-domain-v1");
        assert_eq!(hasher.domain(), "my-custom-domain-v1");
        assert_ne!(hasher.hash(b"data"), ContentHasher::LEAF.hash(b"data"));
    }
}
