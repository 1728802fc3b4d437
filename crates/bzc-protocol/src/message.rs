use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bzc_darc::Darc;
use bzc_proof::{BlockHeader, Proof};
use bzc_types::{BlockId, Roster};

use crate::transaction::{ClientTransaction, TxAck};

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// All message types exchanged with roster members.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum BzcMessage {
    CreateGenesisBlockRequest {
        version: u32,
        roster: Roster,
        genesis_darc: Darc,
        block_interval_ms: u64,
        max_block_size: u32,
    },
    CreateGenesisBlockResponse {
        genesis: BlockId,
        header: BlockHeader,
    },
    GetProofRequest {
        version: u32,
        genesis: BlockId,
        key: Vec<u8>,
        since: BlockId,
    },
    GetProofResponse {
        proof: Proof,
    },
    GetUpdatedConfigRequest {
        version: u32,
        genesis: BlockId,
        since: BlockId,
    },
    SendTransactionRequest {
        version: u32,
        genesis: BlockId,
        tx: ClientTransaction,
    },
    SendTransactionResponse {
        ack: TxAck,
    },
    Error {
        code: u32,
        message: String,
    },
}

impl BzcMessage {
    pub fn type_tag(&self) -> u8 {
        match self {
            Self::CreateGenesisBlockRequest { .. } => 1,
            Self::CreateGenesisBlockResponse { .. } => 2,
            Self::GetProofRequest { .. } => 3,
            Self::GetProofResponse { .. } => 4,
            Self::GetUpdatedConfigRequest { .. } => 5,
            Self::SendTransactionRequest { .. } => 6,
            Self::SendTransactionResponse { .. } => 7,
            Self::Error { .. } => 255,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::CreateGenesisBlockRequest { .. } => "CreateGenesisBlockRequest",
            Self::CreateGenesisBlockResponse { .. } => "CreateGenesisBlockResponse",
            Self::GetProofRequest { .. } => "GetProofRequest",
            Self::GetProofResponse { .. } => "GetProofResponse",
            Self::GetUpdatedConfigRequest { .. } => "GetUpdatedConfigRequest",
            Self::SendTransactionRequest { .. } => "SendTransactionRequest",
            Self::SendTransactionResponse { .. } => "SendTransactionResponse",
            Self::Error { .. } => "Error",
        }
    }

    pub fn is_request(&self) -> bool {
        matches!(
            self,
            Self::CreateGenesisBlockRequest { .. }
                | Self::GetProofRequest { .. }
                | Self::GetUpdatedConfigRequest { .. }
                | Self::SendTransactionRequest { .. }
        )
    }
}

/// A message tagged with the id that pairs a response with its request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope {
    pub correlation_id: Uuid,
    pub message: BzcMessage,
}

impl Envelope {
    /// Wrap a request under a fresh time-ordered id.
    pub fn request(message: BzcMessage) -> Self {
        Self {
            correlation_id: Uuid::now_v7(),
            message,
        }
    }

    /// Wrap a response under the id of the request it answers.
    pub fn reply_to(&self, message: BzcMessage) -> Self {
        Self {
            correlation_id: self.correlation_id,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_and_responses_are_classified() {
        let req = BzcMessage::GetUpdatedConfigRequest {
            version: PROTOCOL_VERSION,
            genesis: BlockId::from_hash([1; 32]),
            since: BlockId::from_hash([1; 32]),
        };
        assert!(req.is_request());
        assert_eq!(req.type_name(), "GetUpdatedConfigRequest");

        let err = BzcMessage::Error {
            code: 404,
            message: "unknown chain".into(),
        };
        assert!(!err.is_request());
        assert_eq!(err.type_tag(), 255);
    }

    #[test]
    fn reply_keeps_correlation_id() {
        let req = Envelope::request(BzcMessage::Error {
            code: 0,
            message: String::new(),
        });
        let reply = req.reply_to(BzcMessage::Error {
            code: 1,
            message: "x".into(),
        });
        assert_eq!(reply.correlation_id, req.correlation_id);
        assert_eq!(req.correlation_id.get_version_num(), 7);
    }

    #[test]
    fn request_ids_are_unique() {
        let msg = BzcMessage::Error {
            code: 0,
            message: String::new(),
        };
        let a = Envelope::request(msg.clone());
        let b = Envelope::request(msg);
        assert_ne!(a.correlation_id, b.correlation_id);
    }
}
