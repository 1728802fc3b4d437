//! Client session for a ByzCoin ledger.
//!
//! [`ByzCoinRpc`] is the entry point: it creates or reattaches to a chain,
//! verifies every proof it receives against its trusted block, and exposes
//! typed instances, reactive per-key streams, and confirmed darc updates.

pub mod cache;
pub mod config;
pub mod error;
pub mod instance;
pub mod logging;
pub mod session;
pub mod stream;
pub mod waiter;

pub use cache::{CachedProof, ProofCache};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use instance::{Contract, ContractKind, DarcInstance, Instance};
pub use session::ByzCoinRpc;
pub use stream::StateStream;
pub use waiter::{Confirmation, InclusionWaiter};

// Re-export key types
pub use bzc_crypto::SigningKey;
pub use bzc_darc::{actions, Darc, Expression, Identity};
pub use bzc_proof::{Proof, ProofError};
pub use bzc_protocol::{ClientTransaction, Instruction, LedgerConfig, TxAck, CONFIG_INSTANCE_ID};
pub use bzc_transport::{LocalRoster, LocalTransport, RosterTransport, TransportError};
pub use bzc_types::{BlockId, InstanceId, Roster, ServerIdentity};
