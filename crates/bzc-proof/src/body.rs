use bzc_crypto::ContentHasher;
use bzc_types::InstanceId;
use serde::{Deserialize, Serialize};

/// The value record stored under a key in the global state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChangeBody {
    pub contract_id: String,
    pub value: Vec<u8>,
    pub version: u64,
    pub darc_id: InstanceId,
}

impl StateChangeBody {
    pub fn new(
        contract_id: impl Into<String>,
        value: Vec<u8>,
        version: u64,
        darc_id: InstanceId,
    ) -> Self {
        Self {
            contract_id: contract_id.into(),
            value,
            version,
            darc_id,
        }
    }

    pub fn digest(&self) -> [u8; 32] {
        let version = self.version.to_le_bytes();
        ContentHasher::BODY.hash_parts(&[
            self.contract_id.as_bytes(),
            self.value.as_slice(),
            version.as_slice(),
            self.darc_id.as_bytes().as_slice(),
        ])
    }
}

/// Leaf digest binding `key` to a body digest.
pub fn leaf_hash(key: &[u8], body_digest: &[u8; 32]) -> [u8; 32] {
    ContentHasher::LEAF.hash_parts(&[key, body_digest.as_slice()])
}
