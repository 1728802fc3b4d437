#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bzc_client::{
    BlockId, ByzCoinRpc, ClientConfig, ClientTransaction, Darc, Identity, Instance, LocalRoster,
    LocalTransport, Proof, Roster, RosterTransport, SigningKey, TransportError, TxAck,
};
use bzc_proof::BlockHeader;

pub const INTERVAL: Duration = Duration::from_millis(200);

pub struct Fixture {
    pub roster: LocalRoster,
    pub owner: SigningKey,
    pub genesis_darc: Darc,
    pub session: ByzCoinRpc,
}

impl Fixture {
    pub fn owner_id(&self) -> Identity {
        Identity::from_signer(&self.owner)
    }

    pub fn signers(&self) -> Vec<SigningKey> {
        vec![self.owner.clone()]
    }

    /// A second session on the same ledger.
    pub async fn reattach(&self) -> ByzCoinRpc {
        ByzCoinRpc::reattach(
            Arc::new(self.roster.transport()),
            self.roster.roster().clone(),
            self.session.genesis(),
        )
        .await
        .unwrap()
    }
}

/// Four validators and a fresh ledger whose genesis darc says "initial".
pub async fn open() -> Fixture {
    let roster = LocalRoster::new(4);
    let transport = Arc::new(roster.transport());
    open_over(roster, transport, ClientConfig::default()).await
}

/// Like [`open`], but every proof request goes through a [`CountingTransport`].
pub async fn open_counting(settings: ClientConfig) -> (Fixture, Arc<CountingTransport>) {
    let roster = LocalRoster::new(4);
    let transport = Arc::new(CountingTransport::new(roster.transport()));
    let fixture = open_over(roster, transport.clone(), settings).await;
    (fixture, transport)
}

async fn open_over(
    roster: LocalRoster,
    transport: Arc<dyn RosterTransport>,
    settings: ClientConfig,
) -> Fixture {
    let owner = SigningKey::generate();
    let genesis_darc = ByzCoinRpc::make_genesis_darc(
        &[Identity::from_signer(&owner)],
        roster.roster(),
        Some("initial"),
    )
    .unwrap();
    let session = ByzCoinRpc::open_with_config(
        transport,
        roster.roster().clone(),
        &genesis_darc,
        INTERVAL,
        None,
        settings,
    )
    .await
    .unwrap();
    Fixture {
        roster,
        owner,
        genesis_darc,
        session,
    }
}

/// Counts proof requests on their way to the roster, and can fail them.
pub struct CountingTransport {
    inner: LocalTransport,
    proofs: AtomicUsize,
    failing: AtomicBool,
}

impl CountingTransport {
    pub fn new(inner: LocalTransport) -> Self {
        Self {
            inner,
            proofs: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    pub fn proof_requests(&self) -> usize {
        self.proofs.load(Ordering::SeqCst)
    }

    /// While set, proof requests fail as if no node answered.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl RosterTransport for CountingTransport {
    async fn create_genesis_block(
        &self,
        roster: &Roster,
        genesis_darc: &Darc,
        block_interval: Duration,
        max_block_size: u32,
    ) -> Result<(BlockId, BlockHeader), TransportError> {
        self.inner
            .create_genesis_block(roster, genesis_darc, block_interval, max_block_size)
            .await
    }

    async fn get_proof(&self, genesis: &BlockId, key: &[u8], since: &BlockId) -> Result<Proof, TransportError> {
        self.proofs.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Unreachable { attempted: 4 });
        }
        self.inner.get_proof(genesis, key, since).await
    }

    async fn get_updated_config(&self, genesis: &BlockId, since: &BlockId) -> Result<Proof, TransportError> {
        self.inner.get_updated_config(genesis, since).await
    }

    async fn send_transaction(&self, genesis: &BlockId, tx: &ClientTransaction) -> Result<TxAck, TransportError> {
        self.inner.send_transaction(genesis, tx).await
    }
}

/// `<version>-<description>` of a darc instance.
pub fn label(instance: &Instance) -> String {
    let darc = instance.as_darc().expect("darc instance");
    format!("{}-{}", instance.version, darc.description_str())
}

pub fn with_description(mut darc: Darc, description: &str) -> Darc {
    darc.description = description.as_bytes().to_vec();
    darc
}
