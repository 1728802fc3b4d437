use std::collections::{HashMap, VecDeque};

use tokio::time::Instant;
use tracing::{debug, warn};

use bzc_crypto::SigningKey;
use bzc_darc::Darc;
use bzc_proof::{BlockHeader, ForwardLink, Proof, StateChangeBody, StateTree};
use bzc_protocol::{contracts, ClientTransaction, LedgerConfig, CONFIG_INSTANCE_ID};
use bzc_types::BlockId;

use super::contracts::{execute, ExecError, State};

/// One chain as every honest validator sees it.
pub(crate) struct Chain {
    config: LedgerConfig,
    headers: Vec<BlockHeader>,
    positions: HashMap<BlockId, usize>,
    /// `links[i]` leads from block `i` to block `i + 1`.
    links: Vec<ForwardLink>,
    state: State,
    pending: VecDeque<ClientTransaction>,
    created_at: Instant,
    last_block_at: Instant,
}

impl Chain {
    /// Block 0 holds the genesis darc at its base id and the configuration,
    /// owned by that darc.
    pub(crate) fn genesis(config: LedgerConfig, darc: &Darc, now: Instant) -> Result<Self, ExecError> {
        if darc.version != 0 {
            return Err(ExecError::InvalidArgument(
                "genesis darc must be version 0".into(),
            ));
        }
        let base = darc.base_id();
        let mut state = State::new();
        state.insert(
            base.as_bytes().to_vec(),
            StateChangeBody::new(contracts::DARC, darc.encode()?, 0, base),
        );
        state.insert(
            CONFIG_INSTANCE_ID.as_bytes().to_vec(),
            StateChangeBody::new(contracts::CONFIG, config.encode()?, 0, base),
        );

        let tree = StateTree::from_state(&state);
        let header = BlockHeader {
            index: 0,
            prev: None,
            state_root: tree.state_root(),
            roster_id: config.roster.id(),
            timestamp_ms: 0,
            tx_count: 0,
        };
        let id = header.hash();

        Ok(Self {
            config,
            headers: vec![header],
            positions: HashMap::from([(id, 0)]),
            links: Vec::new(),
            state,
            pending: VecDeque::new(),
            created_at: now,
            last_block_at: now,
        })
    }

    pub(crate) fn genesis_header(&self) -> &BlockHeader {
        &self.headers[0]
    }

    pub(crate) fn height(&self) -> u64 {
        (self.headers.len() - 1) as u64
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn enqueue(&mut self, tx: ClientTransaction) {
        self.pending.push_back(tx);
    }

    /// Produce a block if transactions are waiting and a block interval has
    /// passed since the last one. Returns the new block's index.
    pub(crate) fn catch_up(&mut self, now: Instant, keys: &[SigningKey]) -> Option<u64> {
        if self.pending.is_empty() || now < self.last_block_at + self.config.block_interval {
            return None;
        }

        let take = (self.config.max_block_size as usize).min(self.pending.len());
        let mut state = self.state.clone();
        let mut accepted = 0u32;
        for tx in self.pending.drain(..take) {
            let mut scratch = state.clone();
            match tx.instructions.iter().try_for_each(|ix| execute(&mut scratch, ix)) {
                Ok(()) => {
                    state = scratch;
                    accepted += 1;
                }
                Err(e) => warn!(nonce = %tx.nonce, error = %e, "transaction rejected"),
            }
        }
        self.state = state;
        self.reload_config();

        let (prev_index, prev_id) = match self.headers.last() {
            Some(last) => (last.index, last.hash()),
            None => return None,
        };
        let header = BlockHeader {
            index: prev_index + 1,
            prev: Some(prev_id),
            state_root: StateTree::from_state(&self.state).state_root(),
            roster_id: self.config.roster.id(),
            timestamp_ms: now.duration_since(self.created_at).as_millis() as u64,
            tx_count: accepted,
        };
        let id = header.hash();
        self.links.push(ForwardLink::sign(prev_id, id, keys));
        self.positions.insert(id, self.headers.len());
        self.headers.push(header);
        self.last_block_at = now;

        debug!(index = prev_index + 1, txs = accepted, block = %id, "block produced");
        Some(prev_index + 1)
    }

    /// Proof for `key` against the latest block, linked from `since`.
    pub(crate) fn prove(&self, key: &[u8], since: &BlockId) -> Result<Proof, ExecError> {
        let start = *self
            .positions
            .get(since)
            .ok_or_else(|| ExecError::UnknownBlock(since.to_hex()))?;
        let tree = StateTree::from_state(&self.state);
        let latest = self
            .headers
            .last()
            .cloned()
            .ok_or_else(|| ExecError::UnknownBlock(since.to_hex()))?;
        Ok(Proof {
            key: key.to_vec(),
            path: tree.prove(key),
            leaf_count: tree.leaf_count(),
            latest,
            links: self.links[start..].to_vec(),
        })
    }

    fn reload_config(&mut self) {
        let Some(body) = self.state.get(CONFIG_INSTANCE_ID.as_bytes().as_slice()) else {
            return;
        };
        match LedgerConfig::decode(&body.value) {
            Ok(config) => self.config = config,
            Err(e) => warn!(error = %e, "stored config unreadable; keeping previous"),
        }
    }
}
