use std::collections::BTreeMap;
use std::sync::OnceLock;

use scoreforge_core::{ConstraintRef, ImpactType, Score};

use super::{duplicate, unknown, Node, Side};
use crate::api::analysis::{ConstraintJustification, ConstraintMatch};
use crate::error::PropagationError;
use crate::fact::Value;
use crate::stream::{IntMapper, Indicter, Justifier};
use crate::tuple::{PropagationQueue, Row, TupleArena, TupleId};

/// Everything a terminal node needs to know about its constraint.
#[derive(Clone)]
pub(crate) struct ScorerConfig<Sc: Score> {
    pub(crate) constraint_ref: ConstraintRef,
    pub(crate) impact: ImpactType,
    pub(crate) weight: Sc,
    pub(crate) match_weight: Option<IntMapper>,
    pub(crate) justifier: Option<Justifier>,
    pub(crate) indicter: Option<Indicter>,
}

struct MatchEntry<Sc> {
    score: Sc,
    // filled on first inspection, dropped with the match
    justification: OnceLock<ConstraintJustification>,
    indicted: OnceLock<Vec<Value>>,
}

impl<Sc> MatchEntry<Sc> {
    fn new(score: Sc) -> Self {
        Self {
            score,
            justification: OnceLock::new(),
            indicted: OnceLock::new(),
        }
    }
}

/// Terminal node of one constraint: one live match per incoming tuple.
pub(crate) struct ScorerNode<Sc: Score> {
    label: String,
    config: ScorerConfig<Sc>,
    matches: BTreeMap<TupleId, MatchEntry<Sc>>,
    total: Sc,
}

impl<Sc: Score> ScorerNode<Sc> {
    pub(crate) fn new(label: String, config: ScorerConfig<Sc>) -> Self {
        Self {
            label,
            config,
            matches: BTreeMap::new(),
            total: Sc::zero(),
        }
    }

    fn score_of(&self, row: Row<'_>) -> Result<Sc, PropagationError> {
        let match_weight = self
            .config
            .match_weight
            .as_ref()
            .map_or(1, |weigher| weigher.apply(row));
        self.config
            .impact
            .impact(self.config.weight, match_weight)
            .ok_or_else(|| self.overflow())
    }

    fn overflow(&self) -> PropagationError {
        PropagationError::ScoreOverflow {
            constraint: self.config.constraint_ref.full_name(),
        }
    }

    /// Sum of the impacts of all live matches.
    pub(crate) fn total(&self) -> Sc {
        self.total
    }

    pub(crate) fn match_count(&self) -> usize {
        self.matches.len()
    }

    /// Snapshots every live match, computing justifications on first use.
    pub(crate) fn constraint_matches(&self, arena: &TupleArena) -> Result<Vec<ConstraintMatch<Sc>>, PropagationError> {
        self.matches
            .iter()
            .map(|(tuple, entry)| {
                let row = arena.row(*tuple)?;
                let justification = entry
                    .justification
                    .get_or_init(|| match &self.config.justifier {
                        Some(justifier) => justifier(row),
                        None => ConstraintJustification::of_row(row),
                    })
                    .clone();
                let indicted = entry
                    .indicted
                    .get_or_init(|| match &self.config.indicter {
                        Some(indicter) => indicter(row),
                        None => row.values().iter().filter(|v| !v.is_null()).cloned().collect(),
                    })
                    .clone();
                Ok(ConstraintMatch {
                    constraint_ref: self.config.constraint_ref.clone(),
                    score: entry.score,
                    justification,
                    indicted,
                })
            })
            .collect()
    }
}

impl<Sc: Score> Node<Sc> for ScorerNode<Sc> {
    fn label(&self) -> &str {
        &self.label
    }

    fn insert(&mut self, _side: Side, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError> {
        if self.matches.contains_key(&tuple) {
            return Err(duplicate(&self.label, tuple));
        }
        let score = self.score_of(arena.row(tuple)?)?;
        self.total = self.total.checked_add(&score).ok_or_else(|| self.overflow())?;
        self.matches.insert(tuple, MatchEntry::new(score));
        Ok(())
    }

    fn update(&mut self, _side: Side, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError> {
        let score = self.score_of(arena.row(tuple)?)?;
        let previous = self
            .matches
            .get(&tuple)
            .ok_or_else(|| unknown(&self.label, tuple))?
            .score;
        self.total = self
            .total
            .checked_sub(&previous)
            .and_then(|total| total.checked_add(&score))
            .ok_or_else(|| self.overflow())?;
        self.matches.insert(tuple, MatchEntry::new(score));
        Ok(())
    }

    fn retract(&mut self, _side: Side, tuple: TupleId, _arena: &mut TupleArena) -> Result<(), PropagationError> {
        let entry = self
            .matches
            .remove(&tuple)
            .ok_or_else(|| unknown(&self.label, tuple))?;
        self.total = self.total.checked_sub(&entry.score).ok_or_else(|| self.overflow())?;
        Ok(())
    }

    fn queue_mut(&mut self) -> Option<&mut PropagationQueue> {
        None
    }

    fn stored(&self) -> usize {
        self.matches.len()
    }

    fn as_scorer(&self) -> Option<&ScorerNode<Sc>> {
        Some(self)
    }
}
