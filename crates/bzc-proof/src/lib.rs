//! Inclusion and exclusion proofs for the ByzCoin client.
//!
//! A [`Proof`] binds a key to its value (or to its absence) in the ledger's
//! global state, and anchors that state to a block the client trusts:
//!
//! 1. the leaf (or both neighbouring leaves) hashes up to a Merkle root,
//! 2. the root and leaf count hash to the `state_root` of a [`BlockHeader`],
//! 3. [`ForwardLink`]s, each cosigned by a roster quorum, lead from the
//!    trusted block to that header.
//!
//! [`ProofVerifier`] checks all three. [`StateTree`] is the producing side
//! used by validators and test backends.

pub mod block;
pub mod body;
pub mod error;
pub mod proof;
pub mod tree;
pub mod verifier;

pub use block::{BlockHeader, CosignerSignature, ForwardLink};
pub use body::StateChangeBody;
pub use error::{ProofError, ProofResult};
pub use proof::{Neighbor, Proof, TreePath};
pub use tree::StateTree;
pub use verifier::ProofVerifier;
