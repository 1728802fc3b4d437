use bzc_crypto::{ContentHasher, HashLink, Signature, SigningKey};
use bzc_types::{BlockId, Roster};
use serde::{Deserialize, Serialize};

/// Header of a ledger block.
///
/// `state_root` commits to the full global state after the block's
/// transactions were applied. Block 0's hash is the chain's genesis id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub index: u64,
    pub prev: Option<BlockId>,
    pub state_root: [u8; 32],
    pub roster_id: [u8; 32],
    pub timestamp_ms: u64,
    pub tx_count: u32,
}

impl BlockHeader {
    pub fn hash(&self) -> BlockId {
        let index = self.index.to_le_bytes();
        let timestamp = self.timestamp_ms.to_le_bytes();
        let tx_count = self.tx_count.to_le_bytes();
        let empty: &[u8] = &[];
        let prev = self.prev.as_ref().map(|p| p.as_bytes().as_slice()).unwrap_or(empty);
        BlockId::from_hash(ContentHasher::BLOCK.hash_parts(&[
            index.as_slice(),
            prev,
            self.state_root.as_slice(),
            self.roster_id.as_slice(),
            timestamp.as_slice(),
            tx_count.as_slice(),
        ]))
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.prev.is_none()
    }
}

/// One roster member's endorsement of a forward link.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosignerSignature {
    pub public_key: [u8; 32],
    pub signature: Signature,
}

/// Collectively signed pointer from one block to a later one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardLink {
    pub from: BlockId,
    pub to: BlockId,
    pub signatures: Vec<CosignerSignature>,
}

impl ForwardLink {
    /// Bytes every cosigner signs.
    pub fn message(from: &BlockId, to: &BlockId) -> [u8; 32] {
        ContentHasher::LINK.hash_parts(&[from.as_bytes().as_slice(), to.as_bytes().as_slice()])
    }

    /// Link signed by every key in `signers`.
    pub fn sign(from: BlockId, to: BlockId, signers: &[SigningKey]) -> Self {
        let message = Self::message(&from, &to);
        let signatures = signers
            .iter()
            .map(|key| CosignerSignature {
                public_key: key.verifying_key().as_bytes(),
                signature: key.sign(&message),
            })
            .collect();
        Self {
            from,
            to,
            signatures,
        }
    }

    /// Number of distinct roster members with a valid signature on this link.
    pub fn valid_signers(&self, roster: &Roster) -> usize {
        let message = Self::message(&self.from, &self.to);
        let mut seen: Vec<[u8; 32]> = Vec::with_capacity(self.signatures.len());
        for cosig in &self.signatures {
            if seen.contains(&cosig.public_key) || !roster.contains_key(&cosig.public_key) {
                continue;
            }
            let Ok(key) = bzc_crypto::VerifyingKey::from_bytes(cosig.public_key) else {
                continue;
            };
            if key.verify(&message, &cosig.signature).is_ok() {
                seen.push(cosig.public_key);
            }
        }
        seen.len()
    }
}

impl HashLink for ForwardLink {
    fn from_hash(&self) -> [u8; 32] {
        *self.from.as_bytes()
    }

    fn to_hash(&self) -> [u8; 32] {
        *self.to.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bzc_types::ServerIdentity;

    fn header(index: u64, prev: Option<BlockId>) -> BlockHeader {
        BlockHeader {
            index,
            prev,
            state_root: [index as u8; 32],
            roster_id: [9; 32],
            timestamp_ms: 1_000 * index,
            tx_count: 0,
        }
    }

    fn roster_of(keys: &[SigningKey]) -> Roster {
        Roster::new(
            keys.iter()
                .enumerate()
                .map(|(i, k)| ServerIdentity::new(format!("tls://node{i}"), k.verifying_key().as_bytes()))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn header_hash_covers_every_field() {
        let base = header(1, None);
        let mut changed = base.clone();
        changed.tx_count = 5;
        assert_ne!(base.hash(), changed.hash());
        let mut linked = base.clone();
        linked.prev = Some(BlockId::from_hash([1; 32]));
        assert_ne!(base.hash(), linked.hash());
    }

    #[test]
    fn genesis_detection() {
        assert!(header(0, None).is_genesis());
        assert!(!header(1, Some(header(0, None).hash())).is_genesis());
    }

    #[test]
    fn signed_link_counts_roster_members() {
        let keys: Vec<SigningKey> = (0..4).map(|_| SigningKey::generate()).collect();
        let roster = roster_of(&keys);
        let a = header(0, None).hash();
        let b = header(1, Some(a)).hash();

        let link = ForwardLink::sign(a, b, &keys[..3]);
        assert_eq!(link.valid_signers(&roster), 3);
    }

    #[test]
    fn outsiders_and_duplicates_do_not_count() {
        let keys: Vec<SigningKey> = (0..4).map(|_| SigningKey::generate()).collect();
        let roster = roster_of(&keys);
        let a = BlockId::from_hash([1; 32]);
        let b = BlockId::from_hash([2; 32]);

        let mut link = ForwardLink::sign(a, b, &[keys[0].clone(), SigningKey::generate()]);
        link.signatures.push(link.signatures[0].clone());
        assert_eq!(link.valid_signers(&roster), 1);
    }

    #[test]
    fn signature_over_other_link_is_rejected() {
        let keys: Vec<SigningKey> = (0..1).map(|_| SigningKey::generate()).collect();
        let roster = roster_of(&keys);
        let mut link = ForwardLink::sign(BlockId::from_hash([1; 32]), BlockId::from_hash([2; 32]), &keys);
        link.to = BlockId::from_hash([3; 32]);
        assert_eq!(link.valid_signers(&roster), 0);
    }
}
