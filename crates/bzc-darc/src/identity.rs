use std::fmt;

use bzc_crypto::{SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::error::DarcError;

/// A party that can satisfy a darc expression by signing.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Identity {
    Ed25519([u8; 32]),
}

impl Identity {
    pub fn from_key(key: &VerifyingKey) -> Self {
        Self::Ed25519(key.as_bytes())
    }

    pub fn from_signer(key: &SigningKey) -> Self {
        Self::from_key(&key.verifying_key())
    }

    /// The key able to check this identity's signatures.
    pub fn verifying_key(&self) -> Result<VerifyingKey, DarcError> {
        match self {
            Self::Ed25519(bytes) => VerifyingKey::from_bytes(*bytes)
                .map_err(|e| DarcError::InvalidIdentity(e.to_string())),
        }
    }

    /// Parse the `ed25519:<hex>` form produced by `Display`.
    pub fn parse(s: &str) -> Result<Self, DarcError> {
        let hex_key = s
            .strip_prefix("ed25519:")
            .ok_or_else(|| DarcError::InvalidIdentity(format!("unknown identity scheme: {s}")))?;
        let bytes = hex::decode(hex_key).map_err(|e| DarcError::InvalidIdentity(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| DarcError::InvalidIdentity("expected 32-byte key".into()))?;
        Ok(Self::Ed25519(arr))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ed25519(bytes) => write!(f, "ed25519:{}", hex::encode(bytes)),
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ed25519(bytes) => write!(f, "Identity(ed25519:{})", hex::encode(&bytes[..4])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_parse_roundtrip() {
        let id = Identity::from_signer(&SigningKey::generate());
        assert_eq!(Identity::parse(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn parse_rejects_unknown_scheme() {
        assert!(matches!(
            Identity::parse("x509ec:abcd"),
            Err(DarcError::InvalidIdentity(_))
        ));
    }

    #[test]
    fn verifying_key_matches_signer() {
        let sk = SigningKey::generate();
        let id = Identity::from_signer(&sk);
        let sig = sk.sign(b"msg");
        assert!(id.verifying_key().unwrap().verify(b"msg", &sig).is_ok());
    }
}
