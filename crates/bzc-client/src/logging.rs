use tracing_subscriber::EnvFilter;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Install a `fmt` subscriber. `RUST_LOG` wins over `default_filter`.
///
/// Calling this again once a global subscriber is set is a no-op.
pub fn init(default_filter: &str) -> ClientResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter).map_err(|e| ClientError::Config(e.to_string()))?,
    };
    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
        tracing::debug!("global subscriber already installed");
    }
    Ok(())
}

/// [`init`] with the filter from `config.log_filter`.
pub fn init_from(config: &ClientConfig) -> ClientResult<()> {
    init(&config.log_filter)
}
