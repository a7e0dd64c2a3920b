//! Constraint weights supplied by configuration instead of constraint code.

use std::collections::{BTreeMap, BTreeSet};

use scoreforge_config::ScoringConfig;
use scoreforge_core::{ConstraintRef, ParseableScore, Score};

use crate::error::ConstraintConfigError;

/// Weight overrides, applied when a network is compiled.
///
/// A key with a slash (`rooms/Conflict`) only matches the constraint in that
/// package; a bare key matches the name in any package. Scoped keys win. A
/// zero weight disables the constraint.
#[derive(Debug, Clone, Default)]
pub struct ConstraintWeightOverrides<Sc: Score> {
    scoped: BTreeMap<ConstraintRef, Sc>,
    bare: BTreeMap<String, Sc>,
}

impl<Sc: Score> ConstraintWeightOverrides<Sc> {
    pub fn new() -> Self {
        Self {
            scoped: BTreeMap::new(),
            bare: BTreeMap::new(),
        }
    }

    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Sc)>,
        K: AsRef<str>,
    {
        let mut overrides = Self::new();
        for (key, weight) in pairs {
            overrides.insert(key.as_ref(), weight);
        }
        overrides
    }

    pub fn insert(&mut self, key: &str, weight: Sc) {
        let constraint = ConstraintRef::parse(key);
        if constraint.package.is_empty() {
            self.bare.insert(constraint.name, weight);
        } else {
            self.scoped.insert(constraint, weight);
        }
    }

    /// The overriding weight for a constraint, if any.
    pub fn resolve(&self, constraint: &ConstraintRef) -> Option<Sc> {
        self.scoped
            .get(constraint)
            .or_else(|| self.bare.get(&constraint.name))
            .copied()
    }

    /// Keys that match none of the given constraints, sorted.
    pub fn unknown_keys<'a>(&self, constraints: impl IntoIterator<Item = &'a ConstraintRef>) -> Vec<String> {
        let mut scoped: BTreeSet<&ConstraintRef> = self.scoped.keys().collect();
        let mut bare: BTreeSet<&str> = self.bare.keys().map(String::as_str).collect();
        for constraint in constraints {
            scoped.remove(constraint);
            bare.remove(constraint.name.as_str());
        }
        let mut unknown: Vec<String> = scoped
            .into_iter()
            .map(ConstraintRef::full_name)
            .chain(bare.into_iter().map(str::to_string))
            .collect();
        unknown.sort_unstable();
        unknown
    }

    pub fn len(&self) -> usize {
        self.scoped.len() + self.bare.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scoped.is_empty() && self.bare.is_empty()
    }
}

impl<Sc: ParseableScore> ConstraintWeightOverrides<Sc> {
    /// Parses the `constraint_weights` table of a configuration.
    pub fn from_config(config: &ScoringConfig) -> Result<Self, ConstraintConfigError> {
        let mut overrides = Self::new();
        for (key, weight) in &config.constraint_weights {
            let parsed = Sc::parse(weight).map_err(|source| ConstraintConfigError::InvalidWeight {
                constraint: key.clone(),
                source,
            })?;
            overrides.insert(key, parsed);
        }
        Ok(overrides)
    }
}
