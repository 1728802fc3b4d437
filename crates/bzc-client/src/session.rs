use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::{debug, info, warn};

use bzc_darc::{actions, Darc, Expression, Identity};
use bzc_proof::{Proof, ProofError, ProofVerifier};
use bzc_protocol::{ClientTransaction, LedgerConfig, TxAck, CONFIG_INSTANCE_ID};
use bzc_transport::RosterTransport;
use bzc_types::{key_hex, BlockId, Roster};

use crate::cache::ProofCache;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::instance::{Contract, Instance};
use crate::stream::{spawn_poller, StateStream, SubscriptionRegistry};

const DEFAULT_GENESIS_DESCRIPTION: &str = "Genesis darc";

#[derive(Clone, Copy, Debug)]
struct Trusted {
    index: u64,
    id: BlockId,
}

/// Transport plus everything needed to verify what it returns.
struct ChainView {
    transport: Arc<dyn RosterTransport>,
    roster: Roster,
    genesis: BlockId,
    trusted: RwLock<Trusted>,
    cache: Arc<ProofCache>,
}

impl ChainView {
    fn trusted(&self) -> Trusted {
        *self.trusted.read().expect("trusted block lock poisoned")
    }

    async fn fetch(&self, key: &[u8]) -> ClientResult<Arc<Proof>> {
        let trusted = self.trusted();
        let proof = self
            .transport
            .get_proof(&self.genesis, key, &trusted.id)
            .await?;
        self.accept(key, proof, trusted)
    }

    async fn fetch_config(&self) -> ClientResult<Arc<Proof>> {
        let trusted = self.trusted();
        let proof = self
            .transport
            .get_updated_config(&self.genesis, &trusted.id)
            .await?;
        self.accept(CONFIG_INSTANCE_ID.as_bytes(), proof, trusted)
    }

    fn accept(&self, key: &[u8], proof: Proof, trusted: Trusted) -> ClientResult<Arc<Proof>> {
        if proof.key != key {
            return Err(ProofError::KeyMismatch {
                requested: key_hex(key),
                actual: key_hex(&proof.key),
            }
            .into());
        }
        if let Err(e) = ProofVerifier::verify(&proof, &trusted.id, &self.roster) {
            warn!(key = %key_hex(key), trusted = %trusted.id.short_hex(), error = %e, "proof rejected");
            return Err(e.into());
        }

        let proof = Arc::new(proof);
        self.advance(&proof);
        self.cache.record(key, Arc::clone(&proof));
        Ok(proof)
    }

    /// Move the trust anchor forward; never backwards.
    fn advance(&self, proof: &Proof) {
        let mut trusted = self.trusted.write().expect("trusted block lock poisoned");
        if proof.latest.index > trusted.index {
            trusted.index = proof.latest.index;
            trusted.id = proof.latest_block_id();
            debug!(index = trusted.index, block = %trusted.id.short_hex(), "trusted block advanced");
        }
    }
}

pub(crate) struct SessionInner {
    chain: ChainView,
    settings: ClientConfig,
    config: RwLock<LedgerConfig>,
    root_darc: RwLock<Darc>,
    pub(crate) subscriptions: SubscriptionRegistry,
}

impl SessionInner {
    /// Fetch, verify, cache, and publish to any stream tracking `key`.
    pub(crate) async fn get_proof(&self, key: &[u8]) -> ClientResult<Arc<Proof>> {
        let proof = self.chain.fetch(key).await?;
        self.subscriptions.publish(key, &proof);
        Ok(proof)
    }

    pub(crate) fn block_interval(&self) -> Duration {
        self.config.read().expect("config lock poisoned").block_interval
    }

    /// Never faster than the chain makes blocks.
    pub(crate) fn poll_period(&self) -> Duration {
        self.block_interval().max(self.settings.min_poll_interval())
    }
}

/// A session with one ledger.
///
/// Cloning is cheap and every clone shares the trusted block, the proof
/// cache, and the subscriptions. Subscriptions end when [`close`] is called
/// or the last clone is dropped.
///
/// [`close`]: ByzCoinRpc::close
#[derive(Clone)]
pub struct ByzCoinRpc {
    inner: Arc<SessionInner>,
}

impl ByzCoinRpc {
    /// Genesis darc for a new ledger. `signers` may evolve it, spawn from it,
    /// and update the ledger config; the roster may change its own view.
    pub fn make_genesis_darc(
        signers: &[Identity],
        roster: &Roster,
        description: Option<&str>,
    ) -> ClientResult<Darc> {
        if signers.is_empty() {
            return Err(ClientError::Validation(
                "genesis darc needs at least one signer".into(),
            ));
        }
        let mut darc = Darc::basic(
            signers,
            signers,
            description.unwrap_or(DEFAULT_GENESIS_DESCRIPTION),
        );
        darc.rules
            .set(actions::UPDATE_CONFIG, Expression::any_of(signers));
        let nodes: Vec<Identity> = roster
            .members()
            .iter()
            .map(|si| Identity::Ed25519(si.public_key))
            .collect();
        darc.rules.set(
            actions::VIEW_CHANGE,
            Expression::threshold(roster.threshold(), &nodes),
        );
        Ok(darc)
    }

    /// Create a new ledger and open a session on it.
    pub async fn open(
        transport: Arc<dyn RosterTransport>,
        roster: Roster,
        genesis_darc: &Darc,
        block_interval: Duration,
        cache: Option<Arc<ProofCache>>,
    ) -> ClientResult<Self> {
        Self::open_with_config(
            transport,
            roster,
            genesis_darc,
            block_interval,
            cache,
            ClientConfig::default(),
        )
        .await
    }

    pub async fn open_with_config(
        transport: Arc<dyn RosterTransport>,
        roster: Roster,
        genesis_darc: &Darc,
        block_interval: Duration,
        cache: Option<Arc<ProofCache>>,
        settings: ClientConfig,
    ) -> ClientResult<Self> {
        settings.validate()?;
        if block_interval.is_zero() {
            return Err(ClientError::Validation("block interval must be positive".into()));
        }
        if genesis_darc.version != 0 {
            return Err(ClientError::Validation(format!(
                "genesis darc must be version 0, got {}",
                genesis_darc.version
            )));
        }

        let (genesis, header) = transport
            .create_genesis_block(&roster, genesis_darc, block_interval, settings.max_block_size)
            .await?;
        if !header.is_genesis() || header.hash() != genesis || header.roster_id != roster.id() {
            return Err(ProofError::GenesisMismatch.into());
        }
        info!(genesis = %genesis.short_hex(), interval_ms = block_interval.as_millis() as u64, "ledger created");

        Self::bootstrap(transport, roster, genesis, cache, settings).await
    }

    /// Open a session on an existing ledger, identified by its genesis block.
    pub async fn reattach(
        transport: Arc<dyn RosterTransport>,
        roster: Roster,
        genesis: BlockId,
    ) -> ClientResult<Self> {
        Self::reattach_with_config(transport, roster, genesis, None, ClientConfig::default()).await
    }

    pub async fn reattach_with_config(
        transport: Arc<dyn RosterTransport>,
        roster: Roster,
        genesis: BlockId,
        cache: Option<Arc<ProofCache>>,
        settings: ClientConfig,
    ) -> ClientResult<Self> {
        settings.validate()?;
        let session = Self::bootstrap(transport, roster, genesis, cache, settings).await?;
        info!(genesis = %genesis.short_hex(), "reattached to ledger");
        Ok(session)
    }

    /// Trust `genesis`, then load the config and the darc that owns it.
    async fn bootstrap(
        transport: Arc<dyn RosterTransport>,
        roster: Roster,
        genesis: BlockId,
        cache: Option<Arc<ProofCache>>,
        settings: ClientConfig,
    ) -> ClientResult<Self> {
        let chain = ChainView {
            transport,
            roster,
            genesis,
            trusted: RwLock::new(Trusted {
                index: 0,
                id: genesis,
            }),
            cache: cache.unwrap_or_default(),
        };

        let config_instance = Instance::from_proof(chain.fetch_config().await?)?;
        let config = expect_config(&config_instance)?;
        let darc_instance =
            Instance::from_proof(chain.fetch(config_instance.darc_id.as_bytes()).await?)?;
        let root_darc = expect_darc(&darc_instance)?;

        Ok(Self {
            inner: Arc::new(SessionInner {
                chain,
                settings,
                config: RwLock::new(config),
                root_darc: RwLock::new(root_darc),
                subscriptions: SubscriptionRegistry::new(),
            }),
        })
    }

    /// Live, verified proof for `key`. Presence is not checked: an absent
    /// key yields a verified exclusion proof.
    pub async fn get_proof(&self, key: &[u8]) -> ClientResult<Arc<Proof>> {
        self.inner.get_proof(key).await
    }

    /// Re-fetch the ledger config. Updates only the cached config.
    pub async fn refresh_config(&self) -> ClientResult<LedgerConfig> {
        let proof = self.inner.chain.fetch_config().await?;
        self.inner.subscriptions.publish(CONFIG_INSTANCE_ID.as_bytes(), &proof);
        let config = expect_config(&Instance::from_proof(proof)?)?;
        *self.inner.config.write().expect("config lock poisoned") = config.clone();
        debug!(interval_ms = config.block_interval.as_millis() as u64, "config refreshed");
        Ok(config)
    }

    /// Re-fetch the darc that owns the config. Updates only the cached root darc.
    pub async fn refresh_root_rule(&self) -> ClientResult<Darc> {
        let config_proof = self.inner.chain.fetch_config().await?;
        self.inner.subscriptions.publish(CONFIG_INSTANCE_ID.as_bytes(), &config_proof);
        let owner = Instance::from_proof(config_proof)?.darc_id;
        let darc = expect_darc(&Instance::from_proof(self.get_proof(owner.as_bytes()).await?)?)?;
        *self.inner.root_darc.write().expect("root darc lock poisoned") = darc.clone();
        debug!(version = darc.version, "root darc refreshed");
        Ok(darc)
    }

    /// Hand `tx` to the roster. Does not wait for inclusion.
    pub async fn submit(&self, tx: &ClientTransaction) -> ClientResult<TxAck> {
        if tx.instructions.is_empty() {
            return Err(ClientError::Validation("transaction has no instructions".into()));
        }
        let ack = self
            .inner
            .chain
            .transport
            .send_transaction(&self.inner.chain.genesis, tx)
            .await?;
        debug!(nonce = %ack.nonce, instructions = tx.instructions.len(), "transaction submitted");
        Ok(ack)
    }

    /// Stream of verified values for `key`.
    ///
    /// The first `next()` yields the current value; later ones yield only
    /// strictly newer versions. All subscribers to one key share one poller.
    pub async fn subscribe(&self, key: &[u8]) -> ClientResult<StateStream> {
        let subscriptions = &self.inner.subscriptions;
        if subscriptions.is_closed() {
            return Err(ClientError::Validation("subscriptions are closed".into()));
        }
        if let Some(stream) = subscriptions.join(key) {
            return Ok(stream);
        }

        let max_age = self
            .inner
            .settings
            .fresh_proof_max_age(self.inner.block_interval());
        let initial = match self.inner.chain.cache.get_fresh(key, max_age) {
            Some(proof) => Instance::from_proof(proof)?,
            None => Instance::from_proof(self.get_proof(key).await?)?,
        };

        let (stream, new_topic) = subscriptions.register(key, initial);
        if let Some(topic_id) = new_topic {
            spawn_poller(&self.inner, key.to_vec(), topic_id);
            debug!(key = %key_hex(key), "subscription started");
        }
        Ok(stream)
    }

    /// Stop tracking `key`; its streams end. Returns whether it was tracked.
    pub fn unsubscribe(&self, key: &[u8]) -> bool {
        self.inner.subscriptions.remove(key)
    }

    /// End every subscription. Safe to call more than once.
    pub fn close_subscriptions(&self) {
        self.inner.subscriptions.close();
    }

    /// Close this handle's subscriptions and release it.
    pub fn close(self) {
        self.close_subscriptions();
    }

    pub fn genesis(&self) -> BlockId {
        self.inner.chain.genesis
    }

    pub fn roster(&self) -> &Roster {
        &self.inner.chain.roster
    }

    pub fn config(&self) -> LedgerConfig {
        self.inner.config.read().expect("config lock poisoned").clone()
    }

    pub fn root_darc(&self) -> Darc {
        self.inner.root_darc.read().expect("root darc lock poisoned").clone()
    }

    pub fn block_interval(&self) -> Duration {
        self.inner.block_interval()
    }

    /// Latest block this session has verified.
    pub fn trusted_block(&self) -> BlockId {
        self.inner.chain.trusted().id
    }

    pub fn trusted_index(&self) -> u64 {
        self.inner.chain.trusted().index
    }

    pub fn cache(&self) -> Arc<ProofCache> {
        Arc::clone(&self.inner.chain.cache)
    }

    pub fn settings(&self) -> &ClientConfig {
        &self.inner.settings
    }
}

impl fmt::Debug for ByzCoinRpc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByzCoinRpc")
            .field("genesis", &self.inner.chain.genesis)
            .field("trusted_index", &self.trusted_index())
            .field("subscriptions", &self.inner.subscriptions.len())
            .finish()
    }
}

fn expect_config(instance: &Instance) -> ClientResult<LedgerConfig> {
    match &instance.contract {
        Contract::Config(config) => Ok(config.clone()),
        _ => Err(ClientError::TypeMismatch {
            expected: bzc_protocol::contracts::CONFIG.into(),
            actual: instance.contract_id.clone(),
        }),
    }
}

fn expect_darc(instance: &Instance) -> ClientResult<Darc> {
    match &instance.contract {
        Contract::Darc(darc) => Ok(darc.clone()),
        _ => Err(ClientError::TypeMismatch {
            expected: bzc_protocol::contracts::DARC.into(),
            actual: instance.contract_id.clone(),
        }),
    }
}
