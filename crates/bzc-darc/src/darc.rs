use bzc_crypto::ContentHasher;
use bzc_types::InstanceId;
use serde::{Deserialize, Serialize};

use crate::error::{DarcError, DarcResult};
use crate::expression::Expression;
use crate::identity::Identity;
use crate::rules::{actions, Rules};

/// Versioned authorization rule.
///
/// Version 0 carries neither `base_id` nor `prev_id`; its own [`Darc::id`]
/// becomes the base id that every later version carries. A darc is stored in
/// the ledger under its base id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Darc {
    pub version: u64,
    pub description: Vec<u8>,
    pub base_id: Option<InstanceId>,
    pub prev_id: Option<InstanceId>,
    pub rules: Rules,
}

impl Darc {
    /// A fresh darc at version 0.
    pub fn new(rules: Rules, description: impl Into<Vec<u8>>) -> Self {
        Self {
            version: 0,
            description: description.into(),
            base_id: None,
            prev_id: None,
            rules,
        }
    }

    /// Darc with the standard rule set: owners may evolve it, signers may
    /// spawn new darcs and sign on its behalf.
    pub fn basic(owners: &[Identity], signers: &[Identity], description: impl Into<Vec<u8>>) -> Self {
        let mut rules = Rules::new();
        rules.set(actions::EVOLVE, Expression::any_of(owners));
        rules.set(actions::SIGN, Expression::any_of(signers));
        rules.set(actions::SPAWN_DARC, Expression::any_of(signers));
        Self::new(rules, description)
    }

    /// Content id of this exact version.
    pub fn id(&self) -> InstanceId {
        let version = self.version.to_le_bytes();
        let base = self.base_id.map(|b| *b.as_bytes());
        let prev = self.prev_id.map(|p| *p.as_bytes());
        let rules: Vec<u8> = self
            .rules
            .iter()
            .flat_map(|(action, expr)| format!("{action}={expr};").into_bytes())
            .collect();
        let empty: &[u8] = &[];
        let hash = ContentHasher::DARC.hash_parts(&[
            version.as_slice(),
            self.description.as_slice(),
            base.as_ref().map(|b| b.as_slice()).unwrap_or(empty),
            prev.as_ref().map(|p| p.as_slice()).unwrap_or(empty),
            rules.as_slice(),
        ]);
        InstanceId::from_hash(hash)
    }

    /// Stable identity shared by every version.
    pub fn base_id(&self) -> InstanceId {
        self.base_id.unwrap_or_else(|| self.id())
    }

    /// The next version: same base id, `prev_id` pointing at this version.
    pub fn evolve(&self) -> Self {
        Self {
            version: self.version + 1,
            description: self.description.clone(),
            base_id: Some(self.base_id()),
            prev_id: Some(self.id()),
            rules: self.rules.clone(),
        }
    }

    /// Check that `self` is the direct successor of `previous`.
    pub fn verify_evolution(&self, previous: &Darc) -> DarcResult<()> {
        if self.version != previous.version + 1 {
            return Err(DarcError::InvalidEvolution(format!(
                "expected version {}, got {}",
                previous.version + 1,
                self.version
            )));
        }
        if self.base_id != Some(previous.base_id()) {
            return Err(DarcError::InvalidEvolution("base id changed".into()));
        }
        if self.prev_id != Some(previous.id()) {
            return Err(DarcError::InvalidEvolution(
                "prev id does not reference the previous version".into(),
            ));
        }
        Ok(())
    }

    /// Description as text, lossily.
    pub fn description_str(&self) -> String {
        String::from_utf8_lossy(&self.description).into_owned()
    }

    pub fn encode(&self) -> DarcResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| DarcError::Encode(e.to_string()))
    }

    /// Decode and check the evolution-chain fields.
    pub fn decode(bytes: &[u8]) -> DarcResult<Self> {
        let darc: Darc =
            bincode::deserialize(bytes).map_err(|e| DarcError::Decode(e.to_string()))?;
        match (darc.version, darc.base_id, darc.prev_id) {
            (0, None, None) => Ok(darc),
            (0, _, _) => Err(DarcError::Decode(
                "version 0 must not reference a base or previous darc".into(),
            )),
            (_, Some(_), Some(_)) => Ok(darc),
            (v, _, _) => Err(DarcError::Decode(format!(
                "version {v} must reference its base and previous darc"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bzc_crypto::SigningKey;
    use proptest::prelude::*;

    fn signer() -> Identity {
        Identity::from_signer(&SigningKey::generate())
    }

    #[test]
    fn version_zero_base_id_is_own_id() {
        let d = Darc::basic(&[signer()], &[signer()], "initial");
        assert_eq!(d.version, 0);
        assert_eq!(d.base_id(), d.id());
    }

    #[test]
    fn evolve_keeps_base_and_links_prev() {
        let d = Darc::basic(&[signer()], &[signer()], "initial");
        let e = d.evolve();
        assert_eq!(e.version, 1);
        assert_eq!(e.base_id(), d.base_id());
        assert_eq!(e.prev_id, Some(d.id()));
        assert_ne!(e.id(), d.id());
        assert!(e.verify_evolution(&d).is_ok());
    }

    #[test]
    fn verify_evolution_rejects_skipped_version() {
        let d = Darc::basic(&[signer()], &[signer()], "x");
        let skipped = d.evolve().evolve();
        assert!(matches!(
            skipped.verify_evolution(&d),
            Err(DarcError::InvalidEvolution(_))
        ));
    }

    #[test]
    fn verify_evolution_rejects_foreign_base() {
        let d = Darc::basic(&[signer()], &[signer()], "x");
        let other = Darc::basic(&[signer()], &[signer()], "y");
        let mut e = d.evolve();
        e.base_id = Some(other.base_id());
        assert!(e.verify_evolution(&d).is_err());
    }

    #[test]
    fn different_descriptions_give_different_ids() {
        let owner = signer();
        let a = Darc::basic(&[owner.clone()], &[owner.clone()], "a");
        let b = Darc::basic(&[owner.clone()], &[owner], "b");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn encode_decode() {
        let d = Darc::basic(&[signer()], &[signer()], "initial").evolve();
        let decoded = Darc::decode(&d.encode().unwrap()).unwrap();
        assert_eq!(decoded, d);
        assert_eq!(decoded.id(), d.id());
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(Darc::decode(&[0xFF, 0x01]), Err(DarcError::Decode(_))));
    }

    #[test]
    fn decode_rejects_inconsistent_chain_fields() {
        let mut d = Darc::basic(&[signer()], &[signer()], "x");
        d.version = 3;
        let err = Darc::decode(&d.encode().unwrap()).unwrap_err();
        assert!(matches!(err, DarcError::Decode(_)));

        let mut d0 = Darc::basic(&[signer()], &[signer()], "x");
        d0.prev_id = Some(InstanceId::random());
        assert!(Darc::decode(&d0.encode().unwrap()).is_err());
    }

    #[test]
    fn description_str_is_lossy() {
        let d = Darc::basic(&[], &[], vec![b'o', b'k', 0xFF]);
        assert!(d.description_str().starts_with("ok"));
    }

    proptest! {
        #[test]
        fn evolution_chain_preserves_base(steps in 1usize..8, desc in ".{0,16}") {
            let root = Darc::basic(&[Identity::Ed25519([1; 32])], &[Identity::Ed25519([2; 32])], desc);
            let mut current = root.clone();
            for _ in 0..steps {
                let next = current.evolve();
                prop_assert!(next.verify_evolution(&current).is_ok());
                current = next;
            }
            prop_assert_eq!(current.base_id(), root.base_id());
            prop_assert_eq!(current.version, steps as u64);
        }
    }
}
