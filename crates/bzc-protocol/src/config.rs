use std::time::Duration;

use serde::{Deserialize, Serialize};

use bzc_types::{InstanceId, Roster};

use crate::error::{ProtocolError, ProtocolResult};

/// Contract tags stored in `StateChangeBody::contract_id`.
pub mod contracts {
    pub const DARC: &str = "darc";
    pub const CONFIG: &str = "config";
}

/// Key under which the ledger configuration lives.
pub const CONFIG_INSTANCE_ID: InstanceId =
    InstanceId::from_hash(*b"bzc-ledger-config-instance-00001");

/// Chain-wide parameters, stored on chain as the `config` contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub block_interval: Duration,
    pub roster: Roster,
    pub max_block_size: u32,
}

impl LedgerConfig {
    pub fn new(block_interval: Duration, roster: Roster, max_block_size: u32) -> ProtocolResult<Self> {
        let config = Self {
            block_interval,
            roster,
            max_block_size,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ProtocolResult<()> {
        if self.block_interval.is_zero() {
            return Err(ProtocolError::InvalidConfig("block interval must be positive".into()));
        }
        if self.max_block_size == 0 {
            return Err(ProtocolError::InvalidConfig("max block size must be positive".into()));
        }
        Ok(())
    }

    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        let config: Self =
            bincode::deserialize(bytes).map_err(|e| ProtocolError::Deserialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bzc_types::ServerIdentity;

    fn roster() -> Roster {
        Roster::new(vec![ServerIdentity::new("tls://127.0.0.1:7000", [1; 32])]).unwrap()
    }

    #[test]
    fn config_key_is_not_zero() {
        assert!(!CONFIG_INSTANCE_ID.is_zero());
    }

    #[test]
    fn zero_interval_rejected() {
        assert!(matches!(
            LedgerConfig::new(Duration::ZERO, roster(), 10),
            Err(ProtocolError::InvalidConfig(_))
        ));
    }

    #[test]
    fn encode_decode() {
        let cfg = LedgerConfig::new(Duration::from_millis(500), roster(), 100).unwrap();
        assert_eq!(LedgerConfig::decode(&cfg.encode().unwrap()).unwrap(), cfg);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(LedgerConfig::decode(&[1, 2, 3]).is_err());
    }
}
