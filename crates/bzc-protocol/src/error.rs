use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("framing error: {0}")]
    FramingError(String),

    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// The frame header names a different message than the payload holds.
    #[error("frame tag {tag} does not match payload tag {payload}")]
    TagMismatch { tag: u8, payload: u8 },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("invalid ledger config: {0}")]
    InvalidConfig(String),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
