//! Foundation types for the ByzCoin client.
//!
//! Every other `bzc-*` crate depends on `bzc-types`.
//!
//! # Key Types
//!
//! - [`InstanceId`]: 32-byte key of a ledger-resident object
//! - [`BlockId`]: Hash of a block; the genesis `BlockId` identifies a chain
//! - [`Roster`]: Ordered set of validators ([`ServerIdentity`])

pub mod block;
pub mod error;
pub mod instance;
pub mod roster;

pub use block::BlockId;
pub use error::TypeError;
pub use instance::{key_hex, InstanceId};
pub use roster::{Roster, ServerIdentity};
