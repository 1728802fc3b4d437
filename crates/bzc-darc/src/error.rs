use thiserror::Error;

/// Errors produced by darc operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DarcError {
    #[error("malformed darc encoding: {0}")]
    Decode(String),

    #[error("darc encoding failed: {0}")]
    Encode(String),

    #[error("invalid evolution: {0}")]
    InvalidEvolution(String),

    #[error("no rule for action '{0}'")]
    MissingRule(String),

    #[error("signers do not satisfy rule for action '{0}'")]
    NotAuthorized(String),

    #[error("invalid identity: {0}")]
    InvalidIdentity(String),
}

pub type DarcResult<T> = Result<T, DarcError>;
