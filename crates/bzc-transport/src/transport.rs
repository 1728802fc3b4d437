use std::time::Duration;

use async_trait::async_trait;
use bzc_darc::Darc;
use bzc_proof::{BlockHeader, Proof};
use bzc_protocol::{ClientTransaction, TxAck};
use bzc_types::{BlockId, Roster};

use crate::error::TransportResult;

/// RPC surface of a ledger roster.
///
/// Any member may answer any request; nothing returned here is trusted until
/// the caller verifies it.
#[async_trait]
pub trait RosterTransport: Send + Sync {
    /// Create a new chain whose genesis state holds `genesis_darc` and the
    /// ledger configuration. Returns the genesis id and block 0's header.
    async fn create_genesis_block(
        &self,
        roster: &Roster,
        genesis_darc: &Darc,
        block_interval: Duration,
        max_block_size: u32,
    ) -> TransportResult<(BlockId, BlockHeader)>;

    /// Proof for `key` against the latest block, with forward links
    /// starting at `since`.
    async fn get_proof(&self, genesis: &BlockId, key: &[u8], since: &BlockId)
        -> TransportResult<Proof>;

    /// Proof of the configuration instance, with forward links starting at `since`.
    async fn get_updated_config(&self, genesis: &BlockId, since: &BlockId)
        -> TransportResult<Proof>;

    /// Hand a transaction to the roster. Acceptance does not imply inclusion.
    async fn send_transaction(
        &self,
        genesis: &BlockId,
        tx: &ClientTransaction,
    ) -> TransportResult<TxAck>;
}
