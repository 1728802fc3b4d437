//! Roster transport for the ByzCoin client.
//!
//! [`RosterTransport`] is the RPC surface a client session talks to. The
//! [`local`] module provides an in-process roster of validators that
//! produces blocks on its block interval, for tests, demos, and embedding.

pub mod error;
pub mod local;
pub mod transport;

pub use error::{TransportError, TransportResult};
pub use local::{LocalRoster, LocalTransport};
pub use transport::RosterTransport;
