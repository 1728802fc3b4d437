use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A validator: network address plus Ed25519 public key.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerIdentity {
    pub address: String,
    pub public_key: [u8; 32],
}

impl ServerIdentity {
    pub fn new(address: impl Into<String>, public_key: [u8; 32]) -> Self {
        Self {
            address: address.into(),
            public_key,
        }
    }
}

impl fmt::Debug for ServerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ServerIdentity({} {})",
            self.address,
            hex::encode(&self.public_key[..4])
        )
    }
}

/// Ordered set of validators running a chain.
///
/// The identity of a chain is its genesis block, never a roster member, so
/// any member may serve any request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    list: Vec<ServerIdentity>,
}

impl Roster {
    /// Build a roster. Duplicate public keys keep their first position.
    pub fn new(list: Vec<ServerIdentity>) -> Result<Self, TypeError> {
        if list.is_empty() {
            return Err(TypeError::EmptyRoster);
        }
        let mut unique: Vec<ServerIdentity> = Vec::with_capacity(list.len());
        for si in list {
            if !unique.iter().any(|u| u.public_key == si.public_key) {
                unique.push(si);
            }
        }
        Ok(Self { list: unique })
    }

    /// BLAKE3 digest of the ordered member list.
    pub fn id(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"bzc-roster-v1:");
        for si in &self.list {
            hasher.update(&(si.address.len() as u64).to_le_bytes());
            hasher.update(si.address.as_bytes());
            hasher.update(&si.public_key);
        }
        *hasher.finalize().as_bytes()
    }

    /// Signatures needed to accept a forward link: `n - f` with `f = (n - 1) / 3`.
    pub fn threshold(&self) -> usize {
        let n = self.list.len();
        n - (n - 1) / 3
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn members(&self) -> &[ServerIdentity] {
        &self.list
    }

    pub fn contains_key(&self, public_key: &[u8; 32]) -> bool {
        self.list.iter().any(|si| &si.public_key == public_key)
    }

    /// The first `count` members, as a new roster.
    pub fn slice(&self, count: usize) -> Result<Self, TypeError> {
        Self::new(self.list.iter().take(count).cloned().collect())
    }
}
