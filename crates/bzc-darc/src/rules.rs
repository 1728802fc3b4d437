use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{DarcError, DarcResult};
use crate::expression::Expression;
use crate::identity::Identity;

/// Well-known action names.
pub mod actions {
    /// Evolve the darc itself.
    pub const EVOLVE: &str = "invoke:darc.evolve";
    /// Spawn a new darc authorized by this one.
    pub const SPAWN_DARC: &str = "spawn:darc";
    /// Generic signing right, checked when a darc is referenced by another.
    pub const SIGN: &str = "_sign";
    /// Update the ledger configuration.
    pub const UPDATE_CONFIG: &str = "invoke:config.update_config";
    /// Replace the roster leader; held by the roster itself.
    pub const VIEW_CHANGE: &str = "invoke:config.view_change";
}

/// Action name -> expression that must hold for that action.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rules(BTreeMap<String, Expression>);

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or replace) the expression for `action`.
    pub fn set(&mut self, action: impl Into<String>, expr: Expression) {
        self.0.insert(action.into(), expr);
    }

    pub fn get(&self, action: &str) -> Option<&Expression> {
        self.0.get(action)
    }

    pub fn contains(&self, action: &str) -> bool {
        self.0.contains_key(action)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Expression)> {
        self.0.iter()
    }

    /// Check that `signers` satisfy the rule for `action`.
    pub fn check(&self, action: &str, signers: &HashSet<Identity>) -> DarcResult<()> {
        let expr = self
            .get(action)
            .ok_or_else(|| DarcError::MissingRule(action.to_string()))?;
        if expr.evaluate(signers) {
            Ok(())
        } else {
            tracing::debug!(action, signers = signers.len(), "rule not satisfied");
            Err(DarcError::NotAuthorized(action.to_string()))
        }
    }
}
