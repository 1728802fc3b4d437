//! Wire protocol for the ByzCoin client.
//!
//! Defines the messages exchanged with roster members, the framed codec that
//! carries them, the transaction format, and the ledger configuration value
//! stored on chain.

pub mod codec;
pub mod config;
pub mod error;
pub mod message;
pub mod transaction;

pub use codec::BzcCodec;
pub use config::{contracts, LedgerConfig, CONFIG_INSTANCE_ID};
pub use error::{ProtocolError, ProtocolResult};
pub use message::{BzcMessage, Envelope, MAX_MESSAGE_SIZE, PROTOCOL_VERSION};
pub use transaction::{args, commands, Action, Argument, ClientTransaction, Instruction, TxAck};
