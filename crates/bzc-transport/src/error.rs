use bzc_protocol::ProtocolError;
use thiserror::Error;

/// Remote error codes carried in `BzcMessage::Error`.
pub mod codes {
    pub const BAD_REQUEST: u32 = 400;
    pub const UNKNOWN_CHAIN: u32 = 404;
    pub const UNKNOWN_BLOCK: u32 = 410;
    pub const CONFLICT: u32 = 409;
    pub const INTERNAL: u32 = 500;
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no roster member reachable ({attempted} tried)")]
    Unreachable { attempted: usize },

    #[error("remote error: code={code}, message={message}")]
    Remote { code: u32, message: String },

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("response does not answer the request it was paired with")]
    CorrelationMismatch,

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

pub type TransportResult<T> = Result<T, TransportError>;
