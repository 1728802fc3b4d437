use bzc_proof::ProofError;
use bzc_transport::TransportError;
use thiserror::Error;

/// Everything a client operation can fail with.
///
/// Only the inclusion waiter retries; every other operation reports the
/// first failure.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Bad input, rejected before any network call.
    #[error("validation error: {0}")]
    Validation(String),

    /// A verified exclusion proof: the key is absent.
    #[error("key not in proof: {key}")]
    NotFound { key: String },

    #[error("type mismatch: expected {expected}, found {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("decode error: {0}")]
    Decode(String),

    /// The proof does not verify. Never a sign of absence.
    #[error("verification failed: {0}")]
    Verification(#[from] ProofError),

    #[error("not confirmed after {attempts} attempts")]
    Timeout { attempts: u32 },

    #[error("network error: {0}")]
    Network(#[from] TransportError),

    #[error("config error: {0}")]
    Config(String),
}

impl ClientError {
    /// Whether the key was proven absent, as opposed to any other failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
