use bzc_crypto::ChainError;
use thiserror::Error;

/// Reasons a proof fails to verify. Every variant means the data is
/// untrustworthy; none of them means "absent".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProofError {
    #[error("proof is for key {actual}, requested {requested}")]
    KeyMismatch { requested: String, actual: String },

    #[error("genesis header does not hash to the announced genesis id")]
    GenesisMismatch,

    #[error("state root mismatch: proof does not hash to the block's state root")]
    RootMismatch,

    #[error("merkle path has depth {actual}, tree of {leaf_count} leaves needs {expected}")]
    BadDepth {
        leaf_count: u64,
        expected: usize,
        actual: usize,
    },

    #[error("leaf index {index} out of range for {leaf_count} leaves")]
    IndexOutOfRange { index: u64, leaf_count: u64 },

    #[error("exclusion proof neighbours do not bracket the key")]
    BadNeighbours,

    #[error("exclusion proof neighbours are not adjacent")]
    NotAdjacent,

    #[error("forward link path invalid: {0}")]
    Chain(#[from] ChainError),

    #[error("forward link {index} has {valid} valid roster signatures, needs {needed}")]
    InsufficientSignatures {
        index: usize,
        valid: usize,
        needed: usize,
    },
}

pub type ProofResult<T> = Result<T, ProofError>;
