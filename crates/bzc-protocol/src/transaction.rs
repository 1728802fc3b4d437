use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bzc_crypto::{ContentHasher, Signature, SigningKey};
use bzc_darc::{Darc, Identity};
use bzc_types::InstanceId;

use crate::config::{contracts, LedgerConfig};
use crate::error::{ProtocolError, ProtocolResult};

/// Well-known argument names.
pub mod args {
    pub const DARC: &str = "darc";
    pub const CONFIG: &str = "config";
}

/// Well-known invoke commands.
pub mod commands {
    pub const EVOLVE: &str = "evolve";
    pub const UPDATE_CONFIG: &str = "update_config";
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    pub value: Vec<u8>,
}

impl Argument {
    pub fn new(name: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// What an instruction does to its target instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Create a new instance of `contract_id`, authorized by the target.
    Spawn {
        contract_id: String,
        args: Vec<Argument>,
    },
    /// Run `command` on the target.
    Invoke {
        contract_id: String,
        command: String,
        args: Vec<Argument>,
    },
    Delete {
        contract_id: String,
    },
}

impl Action {
    pub fn contract_id(&self) -> &str {
        match self {
            Self::Spawn { contract_id, .. }
            | Self::Invoke { contract_id, .. }
            | Self::Delete { contract_id } => contract_id,
        }
    }

    /// Darc rule that must authorize this action, e.g. `invoke:darc.evolve`.
    pub fn rule_action(&self) -> String {
        match self {
            Self::Spawn { contract_id, .. } => format!("spawn:{contract_id}"),
            Self::Invoke {
                contract_id,
                command,
                ..
            } => format!("invoke:{contract_id}.{command}"),
            Self::Delete { contract_id } => format!("delete:{contract_id}"),
        }
    }

    pub fn arg(&self, name: &str) -> Option<&[u8]> {
        let args = match self {
            Self::Spawn { args, .. } | Self::Invoke { args, .. } => args,
            Self::Delete { .. } => return None,
        };
        args.iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_slice())
    }

    fn kind(&self) -> &'static [u8] {
        match self {
            Self::Spawn { .. } => b"spawn",
            Self::Invoke { .. } => b"invoke",
            Self::Delete { .. } => b"delete",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionSignature {
    pub signer: Identity,
    pub signature: Signature,
}

/// One state change requested of a single instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub instance_id: InstanceId,
    pub action: Action,
    pub signatures: Vec<InstructionSignature>,
}

impl Instruction {
    pub fn new(instance_id: InstanceId, action: Action) -> Self {
        Self {
            instance_id,
            action,
            signatures: Vec::new(),
        }
    }

    /// Spawn `darc` under the darc stored at `parent`.
    pub fn spawn_darc(parent: InstanceId, darc: &Darc) -> ProtocolResult<Self> {
        let bytes = darc
            .encode()
            .map_err(|e| ProtocolError::Serialization(e.to_string()))?;
        Ok(Self::new(
            parent,
            Action::Spawn {
                contract_id: contracts::DARC.into(),
                args: vec![Argument::new(args::DARC, bytes)],
            },
        ))
    }

    /// Replace the darc stored at its base id with `darc`, its next version.
    pub fn evolve_darc(darc: &Darc) -> ProtocolResult<Self> {
        let bytes = darc
            .encode()
            .map_err(|e| ProtocolError::Serialization(e.to_string()))?;
        Ok(Self::new(
            darc.base_id(),
            Action::Invoke {
                contract_id: contracts::DARC.into(),
                command: commands::EVOLVE.into(),
                args: vec![Argument::new(args::DARC, bytes)],
            },
        ))
    }

    pub fn update_config(target: InstanceId, config: &LedgerConfig) -> ProtocolResult<Self> {
        Ok(Self::new(
            target,
            Action::Invoke {
                contract_id: contracts::CONFIG.into(),
                command: commands::UPDATE_CONFIG.into(),
                args: vec![Argument::new(args::CONFIG, config.encode()?)],
            },
        ))
    }

    /// Bytes every signer signs: the target and the full action.
    pub fn digest(&self) -> [u8; 32] {
        let contract = self.action.contract_id().as_bytes();
        let (command, args): (&[u8], &[Argument]) = match &self.action {
            Action::Spawn { args, .. } => (&[][..], args.as_slice()),
            Action::Invoke { command, args, .. } => (command.as_bytes(), args.as_slice()),
            Action::Delete { .. } => (&[][..], &[][..]),
        };
        let mut parts: Vec<&[u8]> = vec![
            self.instance_id.as_bytes().as_slice(),
            self.action.kind(),
            contract,
            command,
        ];
        for arg in args {
            parts.push(arg.name.as_bytes());
            parts.push(&arg.value);
        }
        ContentHasher::INSTRUCTION.hash_parts(&parts)
    }

    /// Sign with each key, replacing earlier signatures.
    pub fn sign(&mut self, signers: &[SigningKey]) {
        let digest = self.digest();
        self.signatures = signers
            .iter()
            .map(|key| InstructionSignature {
                signer: Identity::from_signer(key),
                signature: key.sign(&digest),
            })
            .collect();
    }

    /// Identities whose signatures check out against the current digest.
    pub fn verified_signers(&self) -> HashSet<Identity> {
        let digest = self.digest();
        self.signatures
            .iter()
            .filter(|s| {
                s.signer
                    .verifying_key()
                    .map(|k| k.verify(&digest, &s.signature).is_ok())
                    .unwrap_or(false)
            })
            .map(|s| s.signer.clone())
            .collect()
    }
}

/// A batch of instructions applied atomically.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientTransaction {
    /// Time-ordered unique id; also what acknowledgements refer to.
    pub nonce: Uuid,
    pub instructions: Vec<Instruction>,
}

impl ClientTransaction {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self {
            nonce: Uuid::now_v7(),
            instructions,
        }
    }

    pub fn single(instruction: Instruction) -> Self {
        Self::new(vec![instruction])
    }
}

/// Acceptance into a node's pending pool. Says nothing about inclusion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxAck {
    pub nonce: Uuid,
}
