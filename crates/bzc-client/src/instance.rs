use std::fmt;
use std::sync::Arc;

use bzc_crypto::SigningKey;
use bzc_darc::Darc;
use bzc_proof::Proof;
use bzc_protocol::{contracts, LedgerConfig};
use bzc_types::{key_hex, InstanceId};

use crate::error::{ClientError, ClientResult};
use crate::session::ByzCoinRpc;
use crate::waiter::InclusionWaiter;

/// Decoded value of an instance.
#[derive(Clone, Debug, PartialEq)]
pub enum Contract {
    Darc(Darc),
    Config(LedgerConfig),
    /// A contract this client does not interpret.
    Opaque { contract_id: String, value: Vec<u8> },
}

impl Contract {
    pub fn kind(&self) -> ContractKind {
        match self {
            Self::Darc(_) => ContractKind::Darc,
            Self::Config(_) => ContractKind::Config,
            Self::Opaque { .. } => ContractKind::Opaque,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContractKind {
    Darc,
    Config,
    Opaque,
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Darc => f.write_str(contracts::DARC),
            Self::Config => f.write_str(contracts::CONFIG),
            Self::Opaque => f.write_str("opaque"),
        }
    }
}

/// Verified, typed snapshot of one ledger instance.
///
/// Immutable: later ledger changes need a new resolve.
#[derive(Clone, Debug)]
pub struct Instance {
    pub key: Vec<u8>,
    pub contract_id: String,
    pub version: u64,
    pub darc_id: InstanceId,
    pub contract: Contract,
    pub proof: Arc<Proof>,
}

impl Instance {
    /// Decode a verified proof. An exclusion proof is `NotFound`.
    pub fn from_proof(proof: Arc<Proof>) -> ClientResult<Self> {
        let body = proof.body().ok_or_else(|| ClientError::NotFound {
            key: key_hex(&proof.key),
        })?;
        let contract = match body.contract_id.as_str() {
            contracts::DARC => Contract::Darc(
                Darc::decode(&body.value).map_err(|e| ClientError::Decode(e.to_string()))?,
            ),
            contracts::CONFIG => Contract::Config(
                LedgerConfig::decode(&body.value).map_err(|e| ClientError::Decode(e.to_string()))?,
            ),
            other => Contract::Opaque {
                contract_id: other.to_string(),
                value: body.value.clone(),
            },
        };
        Ok(Self {
            key: proof.key.clone(),
            contract_id: body.contract_id.clone(),
            version: body.version,
            darc_id: body.darc_id,
            contract,
            proof: Arc::clone(&proof),
        })
    }

    /// Fetch, verify, and decode the instance at `key`.
    pub async fn resolve(session: &ByzCoinRpc, key: &[u8]) -> ClientResult<Self> {
        Self::from_proof(session.get_proof(key).await?)
    }

    /// Like [`resolve`](Self::resolve), but the instance must be of `kind`.
    pub async fn resolve_as(session: &ByzCoinRpc, key: &[u8], kind: ContractKind) -> ClientResult<Self> {
        let instance = Self::resolve(session, key).await?;
        if instance.kind() != kind {
            return Err(ClientError::TypeMismatch {
                expected: kind.to_string(),
                actual: instance.contract_id,
            });
        }
        Ok(instance)
    }

    pub fn kind(&self) -> ContractKind {
        self.contract.kind()
    }

    /// Raw stored bytes.
    pub fn value(&self) -> &[u8] {
        self.proof.value().unwrap_or_default()
    }

    pub fn as_darc(&self) -> Option<&Darc> {
        match &self.contract {
            Contract::Darc(darc) => Some(darc),
            _ => None,
        }
    }

    pub fn as_config(&self) -> Option<&LedgerConfig> {
        match &self.contract {
            Contract::Config(config) => Some(config),
            _ => None,
        }
    }

    /// Index of the block the proof was anchored to.
    pub fn block_index(&self) -> u64 {
        self.proof.block_index()
    }
}

/// A darc instance bound to the session it came from.
#[derive(Clone, Debug)]
pub struct DarcInstance {
    session: ByzCoinRpc,
    instance: Instance,
    darc: Darc,
}

impl DarcInstance {
    pub async fn from_byzcoin(session: &ByzCoinRpc, id: InstanceId) -> ClientResult<Self> {
        let instance = Instance::resolve(session, id.as_bytes()).await?;
        Self::from_instance(session, instance)
    }

    pub(crate) fn from_instance(session: &ByzCoinRpc, instance: Instance) -> ClientResult<Self> {
        let darc = match &instance.contract {
            Contract::Darc(darc) => darc.clone(),
            _ => {
                return Err(ClientError::TypeMismatch {
                    expected: ContractKind::Darc.to_string(),
                    actual: instance.contract_id,
                })
            }
        };
        Ok(Self {
            session: session.clone(),
            instance,
            darc,
        })
    }

    pub fn darc(&self) -> &Darc {
        &self.darc
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn version(&self) -> u64 {
        self.instance.version
    }

    pub fn base_id(&self) -> InstanceId {
        self.darc.base_id()
    }

    /// Replace the snapshot with the latest verified state.
    pub async fn update(&mut self) -> ClientResult<()> {
        let instance = Instance::resolve(&self.session, &self.instance.key).await?;
        *self = Self::from_instance(&self.session, instance)?;
        Ok(())
    }

    /// Submit `new_darc` as the next version and wait until it is included.
    pub async fn evolve_darc_and_wait(
        &self,
        new_darc: Darc,
        signers: &[SigningKey],
        max_attempts: u32,
    ) -> ClientResult<DarcInstance> {
        let instance = InclusionWaiter::new(&self.session)
            .evolve_and_confirm(self, new_darc, signers, max_attempts)
            .await?;
        Self::from_instance(&self.session, instance)
    }

    /// Spawn `new_darc` under this darc and wait until it is included.
    pub async fn spawn_darc_and_wait(
        &self,
        new_darc: Darc,
        signers: &[SigningKey],
        max_attempts: u32,
    ) -> ClientResult<DarcInstance> {
        let instance = InclusionWaiter::new(&self.session)
            .spawn_and_confirm(self, new_darc, signers, max_attempts)
            .await?;
        Self::from_instance(&self.session, instance)
    }

    /// [`Self::evolve_darc_and_wait`] with the session's `default_max_attempts`.
    pub async fn evolve_darc(&self, new_darc: Darc, signers: &[SigningKey]) -> ClientResult<DarcInstance> {
        let attempts = self.session.settings().default_max_attempts;
        self.evolve_darc_and_wait(new_darc, signers, attempts).await
    }

    /// [`Self::spawn_darc_and_wait`] with the session's `default_max_attempts`.
    pub async fn spawn_darc(&self, new_darc: Darc, signers: &[SigningKey]) -> ClientResult<DarcInstance> {
        let attempts = self.session.settings().default_max_attempts;
        self.spawn_darc_and_wait(new_darc, signers, attempts).await
    }
}
