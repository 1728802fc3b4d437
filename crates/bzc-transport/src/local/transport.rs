use std::time::Duration;

use async_trait::async_trait;

use bzc_darc::Darc;
use bzc_proof::{BlockHeader, Proof};
use bzc_protocol::{BzcCodec, BzcMessage, ClientTransaction, Envelope, TxAck, PROTOCOL_VERSION};
use bzc_types::{BlockId, Roster};

use super::roster::LocalRoster;
use crate::error::{TransportError, TransportResult};
use crate::transport::RosterTransport;

/// Client side of a [`LocalRoster`].
///
/// Every call is framed with the wire codec and served by the first online
/// member, in roster order.
#[derive(Clone)]
pub struct LocalTransport {
    nodes: LocalRoster,
}

impl LocalTransport {
    pub(crate) fn new(nodes: LocalRoster) -> Self {
        Self { nodes }
    }

    async fn call(&self, message: BzcMessage) -> TransportResult<BzcMessage> {
        let request = Envelope::request(message);
        let frame = BzcCodec::encode(&request)?;

        for index in 0..self.nodes.len() {
            if !self.nodes.is_online(index) {
                tracing::debug!(node = index, "skipping offline node");
                continue;
            }
            tokio::task::yield_now().await;
            let reply = self.nodes.handle_frame(index, &frame)?;
            let (response, _) = BzcCodec::decode(&reply)?;
            if response.correlation_id != request.correlation_id {
                return Err(TransportError::CorrelationMismatch);
            }
            return match response.message {
                BzcMessage::Error { code, message } => Err(TransportError::Remote { code, message }),
                other => Ok(other),
            };
        }

        Err(TransportError::Unreachable {
            attempted: self.nodes.len(),
        })
    }
}

fn unexpected(message: &BzcMessage) -> TransportError {
    TransportError::UnexpectedResponse(message.type_name().to_string())
}

#[async_trait]
impl RosterTransport for LocalTransport {
    async fn create_genesis_block(
        &self,
        roster: &Roster,
        genesis_darc: &Darc,
        block_interval: Duration,
        max_block_size: u32,
    ) -> TransportResult<(BlockId, BlockHeader)> {
        let reply = self
            .call(BzcMessage::CreateGenesisBlockRequest {
                version: PROTOCOL_VERSION,
                roster: roster.clone(),
                genesis_darc: genesis_darc.clone(),
                block_interval_ms: block_interval.as_millis() as u64,
                max_block_size,
            })
            .await?;
        match reply {
            BzcMessage::CreateGenesisBlockResponse { genesis, header } => Ok((genesis, header)),
            other => Err(unexpected(&other)),
        }
    }

    async fn get_proof(
        &self,
        genesis: &BlockId,
        key: &[u8],
        since: &BlockId,
    ) -> TransportResult<Proof> {
        let reply = self
            .call(BzcMessage::GetProofRequest {
                version: PROTOCOL_VERSION,
                genesis: *genesis,
                key: key.to_vec(),
                since: *since,
            })
            .await?;
        match reply {
            BzcMessage::GetProofResponse { proof } => Ok(proof),
            other => Err(unexpected(&other)),
        }
    }

    async fn get_updated_config(&self, genesis: &BlockId, since: &BlockId) -> TransportResult<Proof> {
        let reply = self
            .call(BzcMessage::GetUpdatedConfigRequest {
                version: PROTOCOL_VERSION,
                genesis: *genesis,
                since: *since,
            })
            .await?;
        match reply {
            BzcMessage::GetProofResponse { proof } => Ok(proof),
            other => Err(unexpected(&other)),
        }
    }

    async fn send_transaction(
        &self,
        genesis: &BlockId,
        tx: &ClientTransaction,
    ) -> TransportResult<TxAck> {
        let reply = self
            .call(BzcMessage::SendTransactionRequest {
                version: PROTOCOL_VERSION,
                genesis: *genesis,
                tx: tx.clone(),
            })
            .await?;
        match reply {
            BzcMessage::SendTransactionResponse { ack } => Ok(ack),
            other => Err(unexpected(&other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::codes;
    use bzc_crypto::SigningKey;
    use bzc_darc::Identity;
    use bzc_proof::{ProofError, ProofVerifier};
    use bzc_protocol::{Instruction, ProtocolError, CONFIG_INSTANCE_ID};

    const INTERVAL: Duration = Duration::from_millis(200);

    struct Fixture {
        nodes: LocalRoster,
        transport: LocalTransport,
        owner: SigningKey,
        darc: Darc,
        genesis: BlockId,
    }

    async fn fixture() -> Fixture {
        let nodes = LocalRoster::new(4);
        let transport = nodes.transport();
        let owner = SigningKey::generate();
        let id = Identity::from_signer(&owner);
        let darc = Darc::basic(&[id.clone()], &[id], "genesis");
        let (genesis, header) = transport
            .create_genesis_block(nodes.roster(), &darc, INTERVAL, 16)
            .await
            .unwrap();
        assert_eq!(header.hash(), genesis);
        Fixture {
            nodes,
            transport,
            owner,
            darc,
            genesis,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn genesis_state_is_provable() {
        let f = fixture().await;
        let proof = f
            .transport
            .get_proof(&f.genesis, f.darc.base_id().as_bytes(), &f.genesis)
            .await
            .unwrap();
        ProofVerifier::verify(&proof, &f.genesis, f.nodes.roster()).unwrap();
        assert_eq!(proof.contract_id(), Some("darc"));

        let config = f.transport.get_updated_config(&f.genesis, &f.genesis).await.unwrap();
        assert_eq!(config.key, CONFIG_INSTANCE_ID.as_bytes().to_vec());
        assert_eq!(config.darc_id(), Some(f.darc.base_id()));
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_genesis_is_a_conflict() {
        let f = fixture().await;
        let err = f
            .transport
            .create_genesis_block(f.nodes.roster(), &f.darc, INTERVAL, 16)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Remote { code: codes::CONFLICT, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn submitted_transaction_lands_after_one_interval() {
        let f = fixture().await;
        let mut ix = Instruction::evolve_darc(&f.darc.evolve()).unwrap();
        ix.sign(&[f.owner.clone()]);
        let tx = ClientTransaction::single(ix);
        let ack = f.transport.send_transaction(&f.genesis, &tx).await.unwrap();
        assert_eq!(ack.nonce, tx.nonce);
        assert_eq!(f.nodes.pending_transactions(&f.genesis), Some(1));

        tokio::time::sleep(INTERVAL).await;
        let proof = f
            .transport
            .get_proof(&f.genesis, f.darc.base_id().as_bytes(), &f.genesis)
            .await
            .unwrap();
        assert_eq!(proof.version(), Some(1));
        assert_eq!(f.nodes.block_height(&f.genesis), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_transactions_are_acknowledged_but_never_applied() {
        let f = fixture().await;
        f.nodes.set_drop_transactions(true);
        let mut ix = Instruction::evolve_darc(&f.darc.evolve()).unwrap();
        ix.sign(&[f.owner.clone()]);
        f.transport
            .send_transaction(&f.genesis, &ClientTransaction::single(ix))
            .await
            .unwrap();
        assert_eq!(f.nodes.pending_transactions(&f.genesis), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn offline_nodes_are_skipped() {
        let f = fixture().await;
        f.nodes.set_online(0, false);
        f.nodes.set_online(1, false);
        assert!(f
            .transport
            .get_updated_config(&f.genesis, &f.genesis)
            .await
            .is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn all_offline_is_unreachable() {
        let f = fixture().await;
        for i in 0..f.nodes.len() {
            f.nodes.set_online(i, false);
        }
        let err = f
            .transport
            .get_updated_config(&f.genesis, &f.genesis)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Unreachable { attempted: 4 }));
    }

    #[tokio::test(start_paused = true)]
    async fn corrupt_frames_surface_as_protocol_errors() {
        let f = fixture().await;
        f.nodes.set_corrupt_frames(true);
        let err = f
            .transport
            .get_updated_config(&f.genesis, &f.genesis)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TransportError::Protocol(ProtocolError::ChecksumMismatch { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn byzantine_node_proofs_fail_verification() {
        let f = fixture().await;
        f.nodes.set_byzantine(0, true);
        let proof = f
            .transport
            .get_updated_config(&f.genesis, &f.genesis)
            .await
            .unwrap();
        assert_eq!(
            ProofVerifier::verify(&proof, &f.genesis, f.nodes.roster()),
            Err(ProofError::RootMismatch)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_chain_is_reported() {
        let f = fixture().await;
        let stranger = BlockId::from_hash([3; 32]);
        let err = f.transport.get_proof(&stranger, b"k", &stranger).await.unwrap_err();
        assert!(matches!(err, TransportError::Remote { code: codes::UNKNOWN_CHAIN, .. }));
    }
}
