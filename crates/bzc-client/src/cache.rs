use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::time::Instant;

use bzc_proof::Proof;

/// A verified proof and when it was fetched.
#[derive(Clone, Debug)]
pub struct CachedProof {
    pub proof: Arc<Proof>,
    pub fetched_at: Instant,
}

impl CachedProof {
    /// `None` for an exclusion proof, which ranks below every version.
    pub fn version(&self) -> Option<u64> {
        self.proof.version()
    }
}

/// Latest verified proof per key.
///
/// Entries only move forward: a proof replaces the cached one when it shows
/// a strictly higher version, so a slow response can never overwrite a
/// newer one.
#[derive(Debug, Default)]
pub struct ProofCache {
    entries: RwLock<HashMap<Vec<u8>, CachedProof>>,
}

impl ProofCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `proof` if it is newer than what is cached. Returns whether it was stored.
    pub fn record(&self, key: &[u8], proof: Arc<Proof>) -> bool {
        let mut entries = self.entries.write().expect("proof cache lock poisoned");
        let incoming = proof.version();
        match entries.get(key) {
            Some(current) if incoming <= current.version() => false,
            _ => {
                entries.insert(
                    key.to_vec(),
                    CachedProof {
                        proof,
                        fetched_at: Instant::now(),
                    },
                );
                true
            }
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<CachedProof> {
        self.entries
            .read()
            .expect("proof cache lock poisoned")
            .get(key)
            .cloned()
    }

    /// The cached proof, if it was fetched less than `max_age` ago.
    pub fn get_fresh(&self, key: &[u8], max_age: Duration) -> Option<Arc<Proof>> {
        self.get(key)
            .filter(|entry| entry.fetched_at.elapsed() < max_age)
            .map(|entry| entry.proof)
    }

    /// Version of the cached value; `None` when nothing or an absence is cached.
    pub fn version(&self, key: &[u8]) -> Option<u64> {
        self.get(key).and_then(|entry| entry.version())
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("proof cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.write().expect("proof cache lock poisoned").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bzc_crypto::MerklePath;
    use bzc_proof::{BlockHeader, StateChangeBody, TreePath};
    use bzc_types::InstanceId;
    use proptest::prelude::*;

    fn header() -> BlockHeader {
        BlockHeader {
            index: 0,
            prev: None,
            state_root: [0; 32],
            roster_id: [0; 32],
            timestamp_ms: 0,
            tx_count: 0,
        }
    }

    fn proof(version: Option<u64>) -> Arc<Proof> {
        let path = match version {
            Some(v) => TreePath::Inclusion {
                body: StateChangeBody::new("darc", vec![], v, InstanceId::zero()),
                path: MerklePath { nodes: vec![] },
            },
            None => TreePath::Exclusion {
                left: None,
                right: None,
            },
        };
        Arc::new(Proof {
            key: b"k".to_vec(),
            path,
            leaf_count: 1,
            latest: header(),
            links: vec![],
        })
    }

    #[test]
    fn higher_version_replaces() {
        let cache = ProofCache::new();
        assert!(cache.record(b"k", proof(Some(0))));
        assert!(cache.record(b"k", proof(Some(1))));
        assert_eq!(cache.version(b"k"), Some(1));
    }

    #[test]
    fn stale_or_equal_version_is_ignored() {
        let cache = ProofCache::new();
        cache.record(b"k", proof(Some(3)));
        assert!(!cache.record(b"k", proof(Some(2))));
        assert!(!cache.record(b"k", proof(Some(3))));
        assert_eq!(cache.version(b"k"), Some(3));
    }

    #[test]
    fn exclusion_ranks_below_inclusion() {
        let cache = ProofCache::new();
        assert!(cache.record(b"k", proof(None)));
        assert_eq!(cache.version(b"k"), None);
        assert!(cache.record(b"k", proof(Some(0))));
        assert!(!cache.record(b"k", proof(None)));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn freshness_expires() {
        let cache = ProofCache::new();
        cache.record(b"k", proof(Some(0)));
        assert!(cache.get_fresh(b"k", Duration::from_millis(100)).is_some());
        tokio::time::advance(Duration::from_millis(150)).await;
        assert!(cache.get_fresh(b"k", Duration::from_millis(100)).is_none());
        assert!(cache.get(b"k").is_some());
    }

    #[test]
    fn clear_empties() {
        let cache = ProofCache::new();
        cache.record(b"a", proof(Some(0)));
        cache.clear();
        assert!(cache.is_empty());
    }

    proptest! {
        #[test]
        fn cached_version_is_running_maximum(versions in proptest::collection::vec(0u64..50, 1..20)) {
            let cache = ProofCache::new();
            for v in &versions {
                cache.record(b"k", proof(Some(*v)));
            }
            prop_assert_eq!(cache.version(b"k"), versions.iter().copied().max());
        }
    }
}
