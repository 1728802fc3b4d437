use serde::{Deserialize, Serialize};

/// Side of a sibling in a Merkle path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

/// Binary Merkle tree over 32-byte leaf digests.
///
/// Odd nodes are paired with themselves. The empty tree has the all-zero root.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    root: [u8; 32],
    /// Level 0 = leaves, last level = root.
    levels: Vec<Vec<[u8; 32]>>,
}

impl MerkleTree {
    /// Build a tree from leaf digests, in the given order.
    pub fn from_leaves(leaves: Vec<[u8; 32]>) -> Self {
        if leaves.is_empty() {
            return Self {
                root: [0u8; 32],
                levels: vec![],
            };
        }

        let mut levels: Vec<Vec<[u8; 32]>> = vec![leaves.clone()];
        let mut current = leaves;

        while current.len() > 1 {
            let mut next = Vec::with_capacity((current.len() + 1) / 2);
            for pair in current.chunks(2) {
                let right = pair.get(1).unwrap_or(&pair[0]);
                next.push(hash_pair(&pair[0], right));
            }
            levels.push(next.clone());
            current = next;
        }

        Self {
            root: current[0],
            levels,
        }
    }

    pub fn root(&self) -> [u8; 32] {
        self.root
    }

    pub fn leaf_count(&self) -> usize {
        self.levels.first().map(Vec::len).unwrap_or(0)
    }

    /// Path length every leaf of a tree with `leaf_count` leaves must have.
    pub fn depth_for(leaf_count: u64) -> usize {
        let mut depth = 0;
        let mut width = leaf_count;
        while width > 1 {
            width = (width + 1) / 2;
            depth += 1;
        }
        depth
    }

    /// Path from the leaf at `index` to the root.
    pub fn path(&self, index: usize) -> Option<MerklePath> {
        let leaves = self.levels.first()?;
        if index >= leaves.len() {
            return None;
        }

        let mut nodes = Vec::with_capacity(self.levels.len() - 1);
        let mut idx = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling_idx = idx ^ 1;
            let sibling = level.get(sibling_idx).copied().unwrap_or(level[idx]);
            let side = if idx % 2 == 0 { Side::Right } else { Side::Left };
            nodes.push((sibling, side));
            idx /= 2;
        }

        Some(MerklePath { nodes })
    }
}

/// Sibling path from a leaf to the root.
///
/// The path does not carry the leaf or the root: a verifier recomputes the
/// root from data it trusts for other reasons and compares.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerklePath {
    pub nodes: Vec<([u8; 32], Side)>,
}

impl MerklePath {
    /// Recompute the root for `leaf`.
    pub fn compute_root(&self, leaf: &[u8; 32]) -> [u8; 32] {
        let mut current = *leaf;
        for (sibling, side) in &self.nodes {
            current = match side {
                Side::Left => hash_pair(sibling, &current),
                Side::Right => hash_pair(&current, sibling),
            };
        }
        current
    }

    /// Leaf position encoded by the sibling sides.
    pub fn index(&self) -> u64 {
        self.nodes
            .iter()
            .enumerate()
            .fold(0u64, |acc, (level, (_, side))| match side {
                Side::Left => acc | (1u64 << level),
                Side::Right => acc,
            })
    }

    pub fn depth(&self) -> usize {
        self.nodes.len()
    }
}

fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"bzc-merkle-v1:");
    hasher.update(left);
    hasher.update(right);
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(seed: u8) -> [u8; 32] {
        *blake3::hash(&[seed]).as_bytes()
    }

    #[test]
    fn empty_tree_has_zero_root() {
        let tree = MerkleTree::from_leaves(vec![]);
        assert_eq!(tree.root(), [0u8; 32]);
        assert_eq!(tree.leaf_count(), 0);
        assert!(tree.path(0).is_none());
    }

    #[test]
    fn single_leaf_is_root() {
        let tree = MerkleTree::from_leaves(vec![leaf(1)]);
        assert_eq!(tree.root(), leaf(1));
        assert_eq!(tree.path(0).unwrap().depth(), 0);
    }

    #[test]
    fn paths_verify_and_encode_index() {
        let leaves: Vec<[u8; 32]> = (0..7).map(leaf).collect();
        let tree = MerkleTree::from_leaves(leaves.clone());

        for (i, l) in leaves.iter().enumerate() {
            let path = tree.path(i).expect("path should exist");
            assert_eq!(path.compute_root(l), tree.root(), "leaf {i}");
            assert_eq!(path.index(), i as u64);
            assert_eq!(path.depth(), MerkleTree::depth_for(7));
        }
    }

    #[test]
    fn depth_for_matches_tree_height() {
        assert_eq!(MerkleTree::depth_for(0), 0);
        assert_eq!(MerkleTree::depth_for(1), 0);
        assert_eq!(MerkleTree::depth_for(2), 1);
        assert_eq!(MerkleTree::depth_for(3), 2);
        assert_eq!(MerkleTree::depth_for(8), 3);
        assert_eq!(MerkleTree::depth_for(9), 4);
    }

    #[test]
    fn tampered_leaf_changes_root() {
        let tree = MerkleTree::from_leaves(vec![leaf(1), leaf(2), leaf(3), leaf(4)]);
        let path = tree.path(0).unwrap();
        assert_ne!(path.compute_root(&leaf(99)), tree.root());
    }

    #[test]
    fn duplicated_last_node_yields_out_of_range_index() {
        // With three leaves the last one is paired with itself; flipping its
        // side hashes to the same root but claims index 3.
        let tree = MerkleTree::from_leaves(vec![leaf(1), leaf(2), leaf(3)]);
        let mut path = tree.path(2).unwrap();
        path.nodes[0].1 = Side::Left;
        assert_eq!(path.compute_root(&leaf(3)), tree.root());
        assert_eq!(path.index(), 3);
    }

    #[test]
    fn path_out_of_bounds_returns_none() {
        let tree = MerkleTree::from_leaves(vec![leaf(1), leaf(2)]);
        assert!(tree.path(5).is_none());
    }

    #[test]
    fn path_serde_roundtrip() {
        let tree = MerkleTree::from_leaves(vec![leaf(1), leaf(2), leaf(3), leaf(4)]);
        let path = tree.path(2).unwrap();
        let json = serde_json::to_string(&path).unwrap();
        let parsed: MerklePath = serde_json::from_str(&json).unwrap();
        assert_eq!(path, parsed);
        assert_eq!(parsed.compute_root(&leaf(3)), tree.root());
    }
}
