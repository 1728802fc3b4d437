use bzc_crypto::{LinkChainVerifier, MerkleTree, MerklePath};
use bzc_types::{BlockId, Roster};

use crate::body::leaf_hash;
use crate::error::{ProofError, ProofResult};
use crate::proof::{state_root, Neighbor, Proof, TreePath};

/// Checks a [`Proof`] against a trusted block and the roster that signs
/// forward links.
pub struct ProofVerifier;

impl ProofVerifier {
    /// Verify every layer of the proof:
    ///
    /// 1. The inclusion path, or both exclusion neighbours, hash to one Merkle root
    /// 2. That root and the leaf count match `latest.state_root`
    /// 3. The forward links lead from `trusted` to `latest`
    /// 4. Each link carries signatures from a roster quorum
    pub fn verify(proof: &Proof, trusted: &BlockId, roster: &Roster) -> ProofResult<()> {
        let root = Self::merkle_root(proof)?;
        if state_root(&root, proof.leaf_count) != proof.latest.state_root {
            return Err(ProofError::RootMismatch);
        }

        let latest = proof.latest.hash();
        LinkChainVerifier::verify_path(*trusted.as_bytes(), *latest.as_bytes(), &proof.links)?;

        let needed = roster.threshold();
        for (index, link) in proof.links.iter().enumerate() {
            let valid = link.valid_signers(roster);
            if valid < needed {
                tracing::debug!(index, valid, needed, "forward link lacks quorum");
                return Err(ProofError::InsufficientSignatures {
                    index,
                    valid,
                    needed,
                });
            }
        }
        Ok(())
    }

    pub fn is_valid(proof: &Proof, trusted: &BlockId, roster: &Roster) -> bool {
        Self::verify(proof, trusted, roster).is_ok()
    }

    fn merkle_root(proof: &Proof) -> ProofResult<[u8; 32]> {
        let leaf_count = proof.leaf_count;
        match &proof.path {
            TreePath::Inclusion { body, path } => {
                Self::check_shape(path, leaf_count)?;
                Ok(path.compute_root(&leaf_hash(&proof.key, &body.digest())))
            }
            TreePath::Exclusion { left, right } => {
                let key = proof.key.as_slice();
                match (left, right) {
                    (None, None) => {
                        if leaf_count != 0 {
                            return Err(ProofError::BadNeighbours);
                        }
                        Ok([0u8; 32])
                    }
                    (Some(l), None) => {
                        if l.key.as_slice() >= key {
                            return Err(ProofError::BadNeighbours);
                        }
                        let root = Self::neighbor_root(l, leaf_count)?;
                        if l.path.index() + 1 != leaf_count {
                            return Err(ProofError::NotAdjacent);
                        }
                        Ok(root)
                    }
                    (None, Some(r)) => {
                        if r.key.as_slice() <= key {
                            return Err(ProofError::BadNeighbours);
                        }
                        let root = Self::neighbor_root(r, leaf_count)?;
                        if r.path.index() != 0 {
                            return Err(ProofError::NotAdjacent);
                        }
                        Ok(root)
                    }
                    (Some(l), Some(r)) => {
                        if !(l.key.as_slice() < key && key < r.key.as_slice()) {
                            return Err(ProofError::BadNeighbours);
                        }
                        let left_root = Self::neighbor_root(l, leaf_count)?;
                        let right_root = Self::neighbor_root(r, leaf_count)?;
                        if left_root != right_root {
                            return Err(ProofError::RootMismatch);
                        }
                        if l.path.index() + 1 != r.path.index() {
                            return Err(ProofError::NotAdjacent);
                        }
                        Ok(left_root)
                    }
                }
            }
        }
    }

    fn neighbor_root(neighbor: &Neighbor, leaf_count: u64) -> ProofResult<[u8; 32]> {
        Self::check_shape(&neighbor.path, leaf_count)?;
        Ok(neighbor
            .path
            .compute_root(&leaf_hash(&neighbor.key, &neighbor.body_digest)))
    }

    fn check_shape(path: &MerklePath, leaf_count: u64) -> ProofResult<()> {
        let expected = MerkleTree::depth_for(leaf_count);
        if path.depth() != expected {
            return Err(ProofError::BadDepth {
                leaf_count,
                expected,
                actual: path.depth(),
            });
        }
        let index = path.index();
        if index >= leaf_count {
            return Err(ProofError::IndexOutOfRange { index, leaf_count });
        }
        Ok(())
    }
}
