//! In-process validator roster.
//!
//! Every node shares one view of each chain, so the roster behaves like a
//! healthy BFT deployment. Fault switches make individual nodes go offline
//! or lie about state, drop submitted transactions, or corrupt frames.

mod chain;
mod contracts;
mod roster;
mod transport;

pub use roster::LocalRoster;
pub use transport::LocalTransport;
