use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// Boolean expression over signer identities.
///
/// An expression is satisfied by a set of identities that produced valid
/// signatures. `Or(vec![])` is never satisfied and `And(vec![])` always is,
/// so rule constructors avoid building empty `And`s.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expression {
    Identity(Identity),
    And(Vec<Expression>),
    Or(Vec<Expression>),
    /// At least `k` of the sub-expressions hold.
    Threshold { k: usize, of: Vec<Expression> },
}

impl Expression {
    /// Any one of the given identities suffices.
    pub fn any_of<'a>(identities: impl IntoIterator<Item = &'a Identity>) -> Self {
        Self::Or(identities.into_iter().cloned().map(Self::Identity).collect())
    }

    /// Every one of the given identities must sign.
    pub fn all_of<'a>(identities: impl IntoIterator<Item = &'a Identity>) -> Self {
        Self::And(identities.into_iter().cloned().map(Self::Identity).collect())
    }

    /// At least `k` of the given identities must sign.
    pub fn threshold<'a>(k: usize, identities: impl IntoIterator<Item = &'a Identity>) -> Self {
        Self::Threshold {
            k,
            of: identities.into_iter().cloned().map(Self::Identity).collect(),
        }
    }

    pub fn evaluate(&self, signers: &HashSet<Identity>) -> bool {
        match self {
            Self::Identity(id) => signers.contains(id),
            Self::And(terms) => terms.iter().all(|t| t.evaluate(signers)),
            Self::Or(terms) => terms.iter().any(|t| t.evaluate(signers)),
            Self::Threshold { k, of } => {
                of.iter().filter(|t| t.evaluate(signers)).count() >= *k
            }
        }
    }

    /// Every identity mentioned anywhere in the expression.
    pub fn identities(&self) -> Vec<&Identity> {
        let mut out = Vec::new();
        self.collect_identities(&mut out);
        out
    }

    fn collect_identities<'a>(&'a self, out: &mut Vec<&'a Identity>) {
        match self {
            Self::Identity(id) => out.push(id),
            Self::And(terms) | Self::Or(terms) | Self::Threshold { of: terms, .. } => {
                for t in terms {
                    t.collect_identities(out);
                }
            }
        }
    }
}

/// Canonical text form; also what darc ids are computed over.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, terms: &[Expression], sep: &str) -> fmt::Result {
            for (i, t) in terms.iter().enumerate() {
                if i > 0 {
                    write!(f, "{sep}")?;
                }
                write!(f, "{t}")?;
            }
            Ok(())
        }

        match self {
            Self::Identity(id) => write!(f, "{id}"),
            Self::And(terms) => {
                write!(f, "(")?;
                join(f, terms, " & ")?;
                write!(f, ")")
            }
            Self::Or(terms) => {
                write!(f, "(")?;
                join(f, terms, " | ")?;
                write!(f, ")")
            }
            Self::Threshold { k, of } => {
                write!(f, "{k}-of(")?;
                join(f, of, ", ")?;
                write!(f, ")")
            }
        }
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expression{self}")
    }
}
