use std::collections::BTreeMap;

use bzc_crypto::MerkleTree;

use crate::body::{leaf_hash, StateChangeBody};
use crate::proof::{state_root, Neighbor, TreePath};

/// Sorted snapshot of the global state with its Merkle commitment.
///
/// Leaves are ordered by key, which is what lets an exclusion proof show
/// absence with the two neighbouring leaves.
#[derive(Clone, Debug)]
pub struct StateTree {
    entries: Vec<(Vec<u8>, StateChangeBody)>,
    digests: Vec<[u8; 32]>,
    tree: MerkleTree,
}

impl StateTree {
    pub fn from_state(state: &BTreeMap<Vec<u8>, StateChangeBody>) -> Self {
        let entries: Vec<(Vec<u8>, StateChangeBody)> =
            state.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        let digests: Vec<[u8; 32]> = entries.iter().map(|(_, body)| body.digest()).collect();
        let leaves = entries
            .iter()
            .zip(&digests)
            .map(|((key, _), digest)| leaf_hash(key, digest))
            .collect();
        Self {
            entries,
            digests,
            tree: MerkleTree::from_leaves(leaves),
        }
    }

    pub fn leaf_count(&self) -> u64 {
        self.entries.len() as u64
    }

    pub fn state_root(&self) -> [u8; 32] {
        state_root(&self.tree.root(), self.leaf_count())
    }

    /// Inclusion path for a present key, neighbours for an absent one.
    pub fn prove(&self, key: &[u8]) -> TreePath {
        match self.entries.binary_search_by(|(k, _)| k.as_slice().cmp(key)) {
            Ok(index) => TreePath::Inclusion {
                body: self.entries[index].1.clone(),
                path: self.path_or_empty(index),
            },
            Err(insert_at) => TreePath::Exclusion {
                left: insert_at.checked_sub(1).map(|i| self.neighbor(i)),
                right: (insert_at < self.entries.len()).then(|| self.neighbor(insert_at)),
            },
        }
    }

    fn neighbor(&self, index: usize) -> Neighbor {
        Neighbor {
            key: self.entries[index].0.clone(),
            body_digest: self.digests[index],
            path: self.path_or_empty(index),
        }
    }

    fn path_or_empty(&self, index: usize) -> bzc_crypto::MerklePath {
        // Index always comes from `entries`, so the tree has a path for it.
        self.tree
            .path(index)
            .unwrap_or(bzc_crypto::MerklePath { nodes: Vec::new() })
    }
}
