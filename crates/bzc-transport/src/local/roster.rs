use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use bzc_crypto::SigningKey;
use bzc_proof::Proof;
use bzc_protocol::{
    BzcCodec, BzcMessage, LedgerConfig, ProtocolResult, TxAck, CONFIG_INSTANCE_ID,
    PROTOCOL_VERSION,
};
use bzc_types::{BlockId, Roster, ServerIdentity};

use super::chain::Chain;
use super::contracts::ExecError;
use super::transport::LocalTransport;
use crate::error::codes;

const BASE_PORT: u16 = 7002;

/// A roster of in-process validators.
///
/// Cloning is cheap; clones share the same nodes and chains.
#[derive(Clone)]
pub struct LocalRoster {
    inner: Arc<RosterInner>,
}

struct RosterInner {
    roster: Roster,
    keys: Vec<SigningKey>,
    nodes: Vec<NodeFaults>,
    chains: Mutex<HashMap<BlockId, Chain>>,
    drop_transactions: AtomicBool,
    corrupt_frames: AtomicBool,
}

#[derive(Default)]
struct NodeFaults {
    offline: AtomicBool,
    byzantine: AtomicBool,
}

impl LocalRoster {
    /// A roster of `size` freshly keyed validators.
    pub fn new(size: usize) -> Self {
        let keys: Vec<SigningKey> = (0..size.max(1)).map(|_| SigningKey::generate()).collect();
        let members = keys
            .iter()
            .enumerate()
            .map(|(i, key)| {
                ServerIdentity::new(
                    format!("tls://127.0.0.1:{}", BASE_PORT + 2 * i as u16),
                    key.verifying_key().as_bytes(),
                )
            })
            .collect();
        let roster = Roster::new(members).expect("roster of generated keys is never empty");
        info!(size = keys.len(), "local roster started");
        Self {
            inner: Arc::new(RosterInner {
                roster,
                nodes: keys.iter().map(|_| NodeFaults::default()).collect(),
                keys,
                chains: Mutex::new(HashMap::new()),
                drop_transactions: AtomicBool::new(false),
                corrupt_frames: AtomicBool::new(false),
            }),
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.inner.roster
    }

    pub fn len(&self) -> usize {
        self.inner.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.keys.is_empty()
    }

    /// A client-side handle that talks to this roster through the codec.
    pub fn transport(&self) -> LocalTransport {
        LocalTransport::new(self.clone())
    }

    /// Take node `index` offline or bring it back.
    pub fn set_online(&self, index: usize, online: bool) {
        if let Some(node) = self.inner.nodes.get(index) {
            node.offline.store(!online, Ordering::SeqCst);
        }
    }

    /// Make node `index` serve proofs with a forged state root.
    pub fn set_byzantine(&self, index: usize, byzantine: bool) {
        if let Some(node) = self.inner.nodes.get(index) {
            node.byzantine.store(byzantine, Ordering::SeqCst);
        }
    }

    /// Acknowledge transactions without ever including them.
    pub fn set_drop_transactions(&self, drop: bool) {
        self.inner.drop_transactions.store(drop, Ordering::SeqCst);
    }

    /// Flip a bit in every response frame.
    pub fn set_corrupt_frames(&self, corrupt: bool) {
        self.inner.corrupt_frames.store(corrupt, Ordering::SeqCst);
    }

    pub fn is_online(&self, index: usize) -> bool {
        self.inner
            .nodes
            .get(index)
            .map(|n| !n.offline.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Index of the latest block, if the chain exists.
    pub fn block_height(&self, genesis: &BlockId) -> Option<u64> {
        self.lock_chains().get(genesis).map(Chain::height)
    }

    pub fn pending_transactions(&self, genesis: &BlockId) -> Option<usize> {
        self.lock_chains().get(genesis).map(Chain::pending_len)
    }

    /// Serve one request frame on node `index`.
    pub(crate) fn handle_frame(&self, index: usize, frame: &[u8]) -> ProtocolResult<Vec<u8>> {
        let (request, _) = BzcCodec::decode(frame)?;
        debug!(node = index, msg = request.message.type_name(), "request");
        let reply = match self.dispatch(index, request.message.clone()) {
            Ok(message) => message,
            Err((code, message)) => BzcMessage::Error { code, message },
        };
        let mut bytes = BzcCodec::encode(&request.reply_to(reply))?;
        if self.inner.corrupt_frames.load(Ordering::SeqCst) {
            let mid = bytes.len() / 2;
            bytes[mid] ^= 0x01;
        }
        Ok(bytes)
    }

    fn dispatch(&self, index: usize, message: BzcMessage) -> Result<BzcMessage, (u32, String)> {
        let version = match &message {
            BzcMessage::CreateGenesisBlockRequest { version, .. }
            | BzcMessage::GetProofRequest { version, .. }
            | BzcMessage::GetUpdatedConfigRequest { version, .. }
            | BzcMessage::SendTransactionRequest { version, .. } => *version,
            other => {
                return Err((
                    codes::BAD_REQUEST,
                    format!("{} is not a request", other.type_name()),
                ))
            }
        };
        if version != PROTOCOL_VERSION {
            return Err((
                codes::BAD_REQUEST,
                format!("protocol version {version} not supported"),
            ));
        }

        let now = Instant::now();
        match message {
            BzcMessage::CreateGenesisBlockRequest {
                roster,
                genesis_darc,
                block_interval_ms,
                max_block_size,
                ..
            } => {
                if roster != self.inner.roster {
                    return Err((codes::BAD_REQUEST, "roster does not match this deployment".into()));
                }
                let config =
                    LedgerConfig::new(Duration::from_millis(block_interval_ms), roster, max_block_size)
                        .map_err(|e| (codes::BAD_REQUEST, e.to_string()))?;
                let chain = Chain::genesis(config, &genesis_darc, now).map_err(reject)?;
                let header = chain.genesis_header().clone();
                let genesis = header.hash();
                let mut chains = self.lock_chains();
                if chains.contains_key(&genesis) {
                    return Err((codes::CONFLICT, format!("chain {genesis} already exists")));
                }
                chains.insert(genesis, chain);
                info!(genesis = %genesis, interval_ms = block_interval_ms, "chain created");
                Ok(BzcMessage::CreateGenesisBlockResponse { genesis, header })
            }
            BzcMessage::GetProofRequest {
                genesis, key, since, ..
            } => {
                let proof = self.with_chain(&genesis, now, |chain| chain.prove(&key, &since))?;
                Ok(BzcMessage::GetProofResponse {
                    proof: self.maybe_forge(index, proof),
                })
            }
            BzcMessage::GetUpdatedConfigRequest { genesis, since, .. } => {
                let proof = self.with_chain(&genesis, now, |chain| {
                    chain.prove(CONFIG_INSTANCE_ID.as_bytes(), &since)
                })?;
                Ok(BzcMessage::GetProofResponse {
                    proof: self.maybe_forge(index, proof),
                })
            }
            BzcMessage::SendTransactionRequest { genesis, tx, .. } => {
                if tx.instructions.is_empty() {
                    return Err((codes::BAD_REQUEST, "transaction has no instructions".into()));
                }
                let nonce = tx.nonce;
                let dropped = self.inner.drop_transactions.load(Ordering::SeqCst);
                self.with_chain(&genesis, now, |chain| {
                    if !dropped {
                        chain.enqueue(tx);
                    }
                    Ok(())
                })?;
                debug!(%nonce, dropped, "transaction acknowledged");
                Ok(BzcMessage::SendTransactionResponse {
                    ack: TxAck { nonce },
                })
            }
            other => Err((
                codes::BAD_REQUEST,
                format!("{} is not a request", other.type_name()),
            )),
        }
    }

    /// Run `f` on the chain after letting it produce any block that is due.
    fn with_chain<T>(
        &self,
        genesis: &BlockId,
        now: Instant,
        f: impl FnOnce(&mut Chain) -> Result<T, ExecError>,
    ) -> Result<T, (u32, String)> {
        let mut chains = self.lock_chains();
        let chain = chains
            .get_mut(genesis)
            .ok_or_else(|| (codes::UNKNOWN_CHAIN, format!("unknown chain {genesis}")))?;
        chain.catch_up(now, &self.inner.keys);
        f(chain).map_err(reject)
    }

    fn maybe_forge(&self, index: usize, mut proof: Proof) -> Proof {
        let byzantine = self
            .inner
            .nodes
            .get(index)
            .map(|n| n.byzantine.load(Ordering::SeqCst))
            .unwrap_or(false);
        if byzantine {
            proof.latest.state_root[0] ^= 0xFF;
        }
        proof
    }

    fn lock_chains(&self) -> MutexGuard<'_, HashMap<BlockId, Chain>> {
        self.inner.chains.lock().expect("chain registry mutex poisoned")
    }
}

fn reject(e: ExecError) -> (u32, String) {
    let code = match e {
        ExecError::UnknownBlock(_) => codes::UNKNOWN_BLOCK,
        ExecError::AlreadyExists(_) => codes::CONFLICT,
        ExecError::Protocol(_) => codes::INTERNAL,
        _ => codes::BAD_REQUEST,
    };
    (code, e.to_string())
}
