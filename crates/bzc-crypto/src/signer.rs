use std::fmt;

use ed25519_dalek::{Signer as _, Verifier as _};
use serde::{Deserialize, Serialize};

/// Ed25519 secret key of a client or a roster member.
#[derive(Clone)]
pub struct SigningKey(ed25519_dalek::SigningKey);

/// Ed25519 public key. Roster members and darc identities carry its
/// 32-byte compressed form.
#[derive(Clone, PartialEq, Eq)]
pub struct VerifyingKey(ed25519_dalek::VerifyingKey);

/// Ed25519 signature split into its `R` and `s` halves, so it serializes
/// as two fixed arrays.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    r: [u8; 32],
    s: [u8; 32],
}

impl SigningKey {
    pub fn generate() -> Self {
        Self(ed25519_dalek::SigningKey::generate(&mut rand::thread_rng()))
    }

    /// Deterministic key from a 32-byte seed.
    pub fn from_bytes(seed: [u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(&seed))
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey(self.0.verifying_key())
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature::from_bytes(self.0.sign(message).to_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl VerifyingKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, SignatureError> {
        ed25519_dalek::VerifyingKey::from_bytes(&bytes)
            .map(Self)
            .map_err(|_| SignatureError::InvalidKey)
    }

    pub fn as_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), SignatureError> {
        let sig = ed25519_dalek::Signature::from_bytes(&signature.to_bytes());
        self.0
            .verify(message, &sig)
            .map_err(|_| SignatureError::InvalidSignature)
    }

    /// Verify against a raw public key, as found in rosters and identities.
    pub fn verify_raw(public_key: [u8; 32], message: &[u8], signature: &Signature) -> Result<(), SignatureError> {
        Self::from_bytes(public_key)?.verify(message, signature)
    }
}

impl Signature {
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Self { r, s }
    }

    pub fn to_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.r);
        out[32..].copy_from_slice(&self.s);
        out
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

impl fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VerifyingKey({})", hex::encode(self.as_bytes()))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}..)", hex::encode(&self.r[..8]))
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid key")]
    InvalidKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_checks_message_and_key() {
        let sk = SigningKey::generate();
        let sig = sk.sign(b"block 7");
        assert!(sk.verifying_key().verify(b"block 7", &sig).is_ok());
        assert_eq!(
            sk.verifying_key().verify(b"block 8", &sig),
            Err(SignatureError::InvalidSignature)
        );
        assert!(SigningKey::generate().verifying_key().verify(b"block 7", &sig).is_err());
    }

    #[test]
    fn seeded_keys_are_deterministic() {
        let a = SigningKey::from_bytes([3; 32]);
        let b = SigningKey::from_bytes(*a.as_bytes());
        assert_eq!(a.verifying_key(), b.verifying_key());
        assert_eq!(a.sign(b"m"), b.sign(b"m"));
    }

    #[test]
    fn verify_raw_uses_compressed_key() {
        let sk = SigningKey::generate();
        let sig = sk.sign(b"link");
        assert!(VerifyingKey::verify_raw(sk.verifying_key().as_bytes(), b"link", &sig).is_ok());
    }

    #[test]
    fn signature_survives_bincode_and_json() {
        let sig = SigningKey::generate().sign(b"test");
        let bin: Signature = bincode::deserialize(&bincode::serialize(&sig).unwrap()).unwrap();
        let json: Signature = serde_json::from_str(&serde_json::to_string(&sig).unwrap()).unwrap();
        assert_eq!(bin, sig);
        assert_eq!(json, sig);
        assert_eq!(Signature::from_bytes(sig.to_bytes()), sig);
    }

    #[test]
    fn debug_redacts_signing_key() {
        assert!(format!("{:?}", SigningKey::generate()).contains("redacted"));
    }
}
