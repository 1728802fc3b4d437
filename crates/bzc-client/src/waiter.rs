use bzc_crypto::SigningKey;
use bzc_darc::Darc;
use bzc_protocol::{ClientTransaction, Instruction};
use bzc_types::key_hex;
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};
use crate::instance::{DarcInstance, Instance};
use crate::session::ByzCoinRpc;

/// Outcome of [`InclusionWaiter::wait_for`].
#[derive(Clone, Debug)]
pub enum Confirmation {
    /// The condition held on this verified instance.
    Confirmed(Instance),
    /// Every attempt ran without the condition holding.
    Exhausted { attempts: u32 },
}

impl Confirmation {
    pub fn into_result(self) -> ClientResult<Instance> {
        match self {
            Self::Confirmed(instance) => Ok(instance),
            Self::Exhausted { attempts } => Err(ClientError::Timeout { attempts }),
        }
    }
}

/// Submits darc changes and polls until the ledger shows them.
///
/// Each attempt waits one block interval and then makes exactly one
/// `get_proof` call. An absent key counts as "not yet"; every other error
/// ends the wait.
pub struct InclusionWaiter<'a> {
    session: &'a ByzCoinRpc,
}

impl<'a> InclusionWaiter<'a> {
    pub fn new(session: &'a ByzCoinRpc) -> Self {
        Self { session }
    }

    /// Poll `key` until `condition` holds or `max_attempts` run out.
    pub async fn wait_for<F>(&self, key: &[u8], condition: F, max_attempts: u32) -> ClientResult<Confirmation>
    where
        F: Fn(&Instance) -> bool,
    {
        if max_attempts == 0 {
            return Err(ClientError::Validation("max_attempts must be at least 1".into()));
        }
        for attempt in 1..=max_attempts {
            tokio::time::sleep(self.session.block_interval()).await;
            let proof = self.session.get_proof(key).await?;
            match Instance::from_proof(proof) {
                Ok(instance) if condition(&instance) => {
                    debug!(key = %key_hex(key), attempt, version = instance.version, "confirmed");
                    return Ok(Confirmation::Confirmed(instance));
                }
                Ok(instance) => {
                    debug!(key = %key_hex(key), attempt, version = instance.version, "not yet");
                }
                Err(e) if e.is_not_found() => {
                    debug!(key = %key_hex(key), attempt, "not yet present");
                }
                Err(e) => return Err(e),
            }
        }
        warn!(key = %key_hex(key), attempts = max_attempts, "gave up waiting for inclusion");
        Ok(Confirmation::Exhausted {
            attempts: max_attempts,
        })
    }

    /// Submit `new_darc` as the next version of `current` and wait for it.
    pub async fn evolve_and_confirm(
        &self,
        current: &DarcInstance,
        new_darc: Darc,
        signers: &[SigningKey],
        max_attempts: u32,
    ) -> ClientResult<Instance> {
        check_signers(signers)?;
        new_darc
            .verify_evolution(current.darc())
            .map_err(|e| ClientError::Validation(e.to_string()))?;

        let mut instruction = Instruction::evolve_darc(&new_darc)
            .map_err(|e| ClientError::Validation(e.to_string()))?;
        instruction.sign(signers);
        self.session.submit(&ClientTransaction::single(instruction)).await?;

        let target = current.version() + 1;
        let key = current.base_id();
        info!(darc = %key.short_hex(), version = target, "evolution submitted");
        self.wait_for(key.as_bytes(), |i| i.version == target, max_attempts)
            .await?
            .into_result()
    }

    /// Spawn `new_darc` under `parent` and wait until it exists.
    pub async fn spawn_and_confirm(
        &self,
        parent: &DarcInstance,
        new_darc: Darc,
        signers: &[SigningKey],
        max_attempts: u32,
    ) -> ClientResult<Instance> {
        check_signers(signers)?;
        if new_darc.version != 0 {
            return Err(ClientError::Validation(format!(
                "spawned darc must be version 0, got {}",
                new_darc.version
            )));
        }

        let mut instruction = Instruction::spawn_darc(parent.base_id(), &new_darc)
            .map_err(|e| ClientError::Validation(e.to_string()))?;
        instruction.sign(signers);
        self.session.submit(&ClientTransaction::single(instruction)).await?;

        let key = new_darc.base_id();
        info!(parent = %parent.base_id().short_hex(), darc = %key.short_hex(), "spawn submitted");
        self.wait_for(key.as_bytes(), |i| i.version == 0, max_attempts)
            .await?
            .into_result()
    }
}

fn check_signers(signers: &[SigningKey]) -> ClientResult<()> {
    if signers.is_empty() {
        return Err(ClientError::Validation("at least one signer is required".into()));
    }
    Ok(())
}
