use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::error::{ClientError, ClientResult};

/// Client-side settings. Chain parameters such as the block interval come
/// from the ledger itself, not from here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Lower bound on the subscription poll period.
    pub min_poll_interval_ms: u64,
    /// Attempts used by `DarcInstance::evolve_darc` and `DarcInstance::spawn_darc`.
    pub default_max_attempts: u32,
    /// How old a cached proof may be to seed a new subscription.
    /// `None` means one block interval.
    pub fresh_proof_max_age_ms: Option<u64>,
    /// Requested when creating a new chain.
    pub max_block_size: u32,
    /// `tracing` filter directive used by [`crate::logging::init_from`].
    pub log_filter: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            min_poll_interval_ms: 100,
            default_max_attempts: 10,
            fresh_proof_max_age_ms: None,
            max_block_size: 1_000,
            log_filter: "info".into(),
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(s: &str) -> ClientResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| ClientError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> ClientResult<String> {
        toml::to_string_pretty(self).map_err(|e| ClientError::Config(e.to_string()))
    }

    pub fn validate(&self) -> ClientResult<()> {
        if self.default_max_attempts == 0 {
            return Err(ClientError::Config("default_max_attempts must be at least 1".into()));
        }
        if self.max_block_size == 0 {
            return Err(ClientError::Config("max_block_size must be positive".into()));
        }
        EnvFilter::try_new(&self.log_filter)
            .map_err(|e| ClientError::Config(format!("log_filter: {e}")))?;
        Ok(())
    }

    pub fn min_poll_interval(&self) -> Duration {
        Duration::from_millis(self.min_poll_interval_ms)
    }

    /// Maximum cached-proof age, falling back to `block_interval`.
    pub fn fresh_proof_max_age(&self, block_interval: Duration) -> Duration {
        self.fresh_proof_max_age_ms
            .map(Duration::from_millis)
            .unwrap_or(block_interval)
    }
}
