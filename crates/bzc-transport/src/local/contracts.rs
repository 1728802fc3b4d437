use std::collections::{BTreeMap, HashSet};

use thiserror::Error;

use bzc_darc::{actions, Darc, DarcError, Identity};
use bzc_proof::StateChangeBody;
use bzc_protocol::{
    args, commands, contracts, Action, Instruction, LedgerConfig, ProtocolError, CONFIG_INSTANCE_ID,
};
use bzc_types::InstanceId;

pub(crate) type State = BTreeMap<Vec<u8>, StateChangeBody>;

/// Why a node refused a request or an instruction.
#[derive(Debug, Error)]
pub(crate) enum ExecError {
    #[error("instance {0} not found")]
    MissingInstance(String),

    #[error("instance {key} holds contract {actual}, expected {expected}")]
    WrongContract {
        key: String,
        expected: &'static str,
        actual: String,
    },

    #[error("instance {0} already exists")]
    AlreadyExists(String),

    #[error("missing argument {0}")]
    MissingArgument(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unsupported action {0}")]
    Unsupported(String),

    #[error("unknown block {0}")]
    UnknownBlock(String),

    #[error("darc error: {0}")]
    Darc(#[from] DarcError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Apply one instruction to `state`.
pub(crate) fn execute(state: &mut State, ix: &Instruction) -> Result<(), ExecError> {
    let signers = ix.verified_signers();
    match (&ix.action, ix.action.contract_id()) {
        (Action::Spawn { .. }, contracts::DARC) => spawn_darc(state, ix, &signers),
        (Action::Invoke { command, .. }, contracts::DARC) if command == commands::EVOLVE => {
            evolve_darc(state, ix, &signers)
        }
        (Action::Invoke { command, .. }, contracts::CONFIG) if command == commands::UPDATE_CONFIG => {
            update_config(state, ix, &signers)
        }
        _ => Err(ExecError::Unsupported(ix.action.rule_action())),
    }
}

fn spawn_darc(state: &mut State, ix: &Instruction, signers: &HashSet<Identity>) -> Result<(), ExecError> {
    let (_, parent) = load_darc(state, &ix.instance_id)?;
    parent.rules.check(actions::SPAWN_DARC, signers)?;

    let bytes = arg(ix, args::DARC)?;
    let darc = Darc::decode(bytes)?;
    if darc.version != 0 {
        return Err(ExecError::InvalidArgument(format!(
            "spawned darc must be version 0, got {}",
            darc.version
        )));
    }
    let id = darc.base_id();
    if state.contains_key(id.as_bytes().as_slice()) {
        return Err(ExecError::AlreadyExists(id.to_hex()));
    }
    state.insert(
        id.as_bytes().to_vec(),
        StateChangeBody::new(contracts::DARC, bytes.to_vec(), 0, id),
    );
    Ok(())
}

fn evolve_darc(state: &mut State, ix: &Instruction, signers: &HashSet<Identity>) -> Result<(), ExecError> {
    let (body, current) = load_darc(state, &ix.instance_id)?;
    let bytes = arg(ix, args::DARC)?;
    let next = Darc::decode(bytes)?;
    next.verify_evolution(&current)?;
    current.rules.check(actions::EVOLVE, signers)?;

    state.insert(
        ix.instance_id.as_bytes().to_vec(),
        StateChangeBody::new(contracts::DARC, bytes.to_vec(), body.version + 1, body.darc_id),
    );
    Ok(())
}

fn update_config(state: &mut State, ix: &Instruction, signers: &HashSet<Identity>) -> Result<(), ExecError> {
    if ix.instance_id != CONFIG_INSTANCE_ID {
        return Err(ExecError::InvalidArgument("config lives at the config instance".into()));
    }
    let body = load(state, &CONFIG_INSTANCE_ID, contracts::CONFIG)?.clone();
    let (_, owner) = load_darc(state, &body.darc_id)?;
    owner.rules.check(actions::UPDATE_CONFIG, signers)?;

    let bytes = arg(ix, args::CONFIG)?;
    LedgerConfig::decode(bytes)?;
    state.insert(
        CONFIG_INSTANCE_ID.as_bytes().to_vec(),
        StateChangeBody::new(contracts::CONFIG, bytes.to_vec(), body.version + 1, body.darc_id),
    );
    Ok(())
}

fn load<'a>(state: &'a State, id: &InstanceId, contract: &'static str) -> Result<&'a StateChangeBody, ExecError> {
    let body = state
        .get(id.as_bytes().as_slice())
        .ok_or_else(|| ExecError::MissingInstance(id.to_hex()))?;
    if body.contract_id != contract {
        return Err(ExecError::WrongContract {
            key: id.to_hex(),
            expected: contract,
            actual: body.contract_id.clone(),
        });
    }
    Ok(body)
}

fn load_darc(state: &State, id: &InstanceId) -> Result<(StateChangeBody, Darc), ExecError> {
    let body = load(state, id, contracts::DARC)?;
    let darc = Darc::decode(&body.value)?;
    Ok((body.clone(), darc))
}

fn arg<'a>(ix: &'a Instruction, name: &'static str) -> Result<&'a [u8], ExecError> {
    ix.action.arg(name).ok_or(ExecError::MissingArgument(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bzc_crypto::SigningKey;

    fn genesis_state(owner: &SigningKey) -> (State, Darc) {
        let id = Identity::from_signer(owner);
        let darc = Darc::basic(&[id.clone()], &[id], "genesis");
        let base = darc.base_id();
        let mut state = State::new();
        state.insert(
            base.as_bytes().to_vec(),
            StateChangeBody::new(contracts::DARC, darc.encode().unwrap(), 0, base),
        );
        (state, darc)
    }

    fn signed(mut ix: Instruction, key: &SigningKey) -> Instruction {
        ix.sign(&[key.clone()]);
        ix
    }

    #[test]
    fn evolve_bumps_version() {
        let owner = SigningKey::generate();
        let (mut state, darc) = genesis_state(&owner);
        let ix = signed(Instruction::evolve_darc(&darc.evolve()).unwrap(), &owner);
        execute(&mut state, &ix).unwrap();
        assert_eq!(state[darc.base_id().as_bytes().as_slice()].version, 1);
    }

    #[test]
    fn evolve_requires_owner_signature() {
        let owner = SigningKey::generate();
        let (mut state, darc) = genesis_state(&owner);
        let ix = signed(Instruction::evolve_darc(&darc.evolve()).unwrap(), &SigningKey::generate());
        assert!(matches!(
            execute(&mut state, &ix),
            Err(ExecError::Darc(DarcError::NotAuthorized(_)))
        ));
    }

    #[test]
    fn spawn_inserts_new_base_id_once() {
        let owner = SigningKey::generate();
        let (mut state, darc) = genesis_state(&owner);
        let child = Darc::basic(&[Identity::from_signer(&owner)], &[], "child");
        let ix = signed(Instruction::spawn_darc(darc.base_id(), &child).unwrap(), &owner);
        execute(&mut state, &ix).unwrap();
        let body = &state[child.base_id().as_bytes().as_slice()];
        assert_eq!(body.version, 0);
        assert_eq!(body.darc_id, child.base_id());

        assert!(matches!(execute(&mut state, &ix), Err(ExecError::AlreadyExists(_))));
    }

    #[test]
    fn unknown_contract_is_unsupported() {
        let owner = SigningKey::generate();
        let (mut state, darc) = genesis_state(&owner);
        let ix = Instruction::new(
            darc.base_id(),
            Action::Delete {
                contract_id: contracts::DARC.into(),
            },
        );
        assert!(matches!(execute(&mut state, &ix), Err(ExecError::Unsupported(_))));
    }
}
