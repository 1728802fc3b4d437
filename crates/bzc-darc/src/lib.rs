//! Distributed access-rights controls (darcs) for the ByzCoin client.
//!
//! A [`Darc`] is a versioned authorization rule. Its [`Rules`] map actions
//! such as `invoke:darc.evolve` to [`Expression`]s over signer
//! [`Identity`]s. Evolving a darc keeps its base id and bumps its version;
//! spawning creates an independent darc at version 0.

pub mod darc;
pub mod error;
pub mod expression;
pub mod identity;
pub mod rules;

pub use darc::Darc;
pub use error::{DarcError, DarcResult};
pub use expression::Expression;
pub use identity::Identity;
pub use rules::{actions, Rules};
