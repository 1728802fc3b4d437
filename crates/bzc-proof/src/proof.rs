use bzc_crypto::{ContentHasher, MerklePath};
use bzc_types::{BlockId, InstanceId};
use serde::{Deserialize, Serialize};

use crate::block::{BlockHeader, ForwardLink};
use crate::body::StateChangeBody;

/// A state leaf adjacent to an absent key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neighbor {
    pub key: Vec<u8>,
    pub body_digest: [u8; 32],
    pub path: MerklePath,
}

/// How the key relates to the state tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreePath {
    /// The key is present with this body.
    Inclusion {
        body: StateChangeBody,
        path: MerklePath,
    },
    /// The key is absent: these are the nearest leaves on either side.
    /// `None` means the key sorts before the first (or after the last) leaf.
    Exclusion {
        left: Option<Neighbor>,
        right: Option<Neighbor>,
    },
}

/// Evidence that a key maps to a value (or to nothing) in the state
/// committed by `latest`, plus the forward links that lead there from a
/// block the requester already trusted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub key: Vec<u8>,
    pub path: TreePath,
    pub leaf_count: u64,
    pub latest: BlockHeader,
    pub links: Vec<ForwardLink>,
}

impl Proof {
    /// Whether the key is present. Meaningful only after verification.
    pub fn exists(&self) -> bool {
        matches!(self.path, TreePath::Inclusion { .. })
    }

    pub fn body(&self) -> Option<&StateChangeBody> {
        match &self.path {
            TreePath::Inclusion { body, .. } => Some(body),
            TreePath::Exclusion { .. } => None,
        }
    }

    pub fn version(&self) -> Option<u64> {
        self.body().map(|b| b.version)
    }

    pub fn contract_id(&self) -> Option<&str> {
        self.body().map(|b| b.contract_id.as_str())
    }

    pub fn value(&self) -> Option<&[u8]> {
        self.body().map(|b| b.value.as_slice())
    }

    pub fn darc_id(&self) -> Option<InstanceId> {
        self.body().map(|b| b.darc_id)
    }

    pub fn block_index(&self) -> u64 {
        self.latest.index
    }

    pub fn latest_block_id(&self) -> BlockId {
        self.latest.hash()
    }
}

/// Commitment to a state tree: its Merkle root bound to its leaf count.
pub fn state_root(merkle_root: &[u8; 32], leaf_count: u64) -> [u8; 32] {
    let count = leaf_count.to_le_bytes();
    ContentHasher::STATE.hash_parts(&[merkle_root.as_slice(), count.as_slice()])
}
