//! Cryptographic primitives for the ByzCoin client.
//!
//! Provides domain-separated BLAKE3 hashing, Ed25519 signing/verification,
//! binary Merkle trees with position-carrying paths, and verification of
//! hash-linked block paths.
//!
//! All crypto operations wrap `blake3` and `ed25519-dalek`.

pub mod chain;
pub mod hasher;
pub mod merkle;
pub mod signer;

pub use chain::{ChainError, HashLink, LinkChainVerifier};
pub use hasher::{ContentHasher, HasherError};
pub use merkle::{MerklePath, MerkleTree, Side};
pub use signer::{Signature, SignatureError, SigningKey, VerifyingKey};
