// Match inspection.
//
// Every query settles pending changes first, so it sees the same state as
// calculate_score would.

use std::collections::BTreeMap;

use scoreforge_core::{ConstraintRef, Score};

use super::ScoreDirector;
use crate::api::analysis::{
    ConstraintAnalysis, ConstraintMatch, ConstraintMatchTotal, IndictmentMap, ScoreExplanation,
};
use crate::error::{ProtocolViolation, Result};
use crate::network::CompiledConstraint;

impl<Sc: Score> ScoreDirector<Sc> {
    /// Live matches per constraint, inactive constraints included.
    ///
    /// # Errors
    ///
    /// Requires `constraint_match_enabled`; fails with
    /// [`ProtocolViolation::MatchTrackingDisabled`] otherwise.
    pub fn constraint_match_total_map(&mut self) -> Result<BTreeMap<ConstraintRef, ConstraintMatchTotal<Sc>>> {
        self.prepare_inspection()?;
        let mut totals = BTreeMap::new();
        for constraint in &self.network.constraints {
            let mut total = ConstraintMatchTotal::new(constraint.constraint_ref.clone(), constraint.weight);
            for constraint_match in self.matches_of(constraint)? {
                total.add_match(constraint_match);
            }
            totals.insert(constraint.constraint_ref.clone(), total);
        }
        Ok(totals)
    }

    /// Every indicted object with the live matches that blame it.
    ///
    /// # Errors
    ///
    /// Requires `constraint_match_enabled`, like
    /// [`constraint_match_total_map`](Self::constraint_match_total_map).
    pub fn indictment_map(&mut self) -> Result<IndictmentMap<Sc>> {
        self.prepare_inspection()?;
        let mut matches = Vec::new();
        for constraint in &self.network.constraints {
            matches.extend(self.matches_of(constraint)?);
        }
        Ok(IndictmentMap::from_matches(&matches))
    }

    /// Score breakdown per constraint.
    ///
    /// Match counts are always available; the individual matches are only
    /// listed when match tracking is enabled.
    pub fn explain(&mut self) -> Result<ScoreExplanation<Sc>> {
        let score = self.calculate_score()?;
        let tracking = self.network.is_constraint_match_enabled();
        let mut constraint_analyses = Vec::with_capacity(self.network.constraints.len());
        for constraint in &self.network.constraints {
            let scorer = constraint
                .scorer
                .and_then(|id| self.nodes[id].as_scorer());
            let matches = if tracking {
                self.matches_of(constraint)?
            } else {
                Vec::new()
            };
            constraint_analyses.push(ConstraintAnalysis {
                constraint_ref: constraint.constraint_ref.clone(),
                weight: constraint.weight,
                score: scorer.map_or(Sc::zero(), |scorer| scorer.total()),
                match_count: scorer.map_or(0, |scorer| scorer.match_count()),
                matches,
            });
        }
        Ok(ScoreExplanation {
            score,
            constraint_analyses,
        })
    }

    fn prepare_inspection(&mut self) -> Result<()> {
        if !self.network.is_constraint_match_enabled() {
            return Err(ProtocolViolation::MatchTrackingDisabled.into());
        }
        self.ensure_no_open_mutations()?;
        self.settle()?;
        Ok(())
    }

    fn matches_of(&self, constraint: &CompiledConstraint<Sc>) -> Result<Vec<ConstraintMatch<Sc>>> {
        let Some(scorer) = constraint
            .scorer
            .and_then(|id| self.nodes[id].as_scorer())
        else {
            return Ok(Vec::new());
        };
        Ok(scorer.constraint_matches(&self.arena)?)
    }
}
