//! Score director factory for creating score directors.

use std::sync::Arc;

use scoreforge_core::Score;

use super::{ScoreDirector, WorkingSolution};
use crate::error::Result;
use crate::network::ConstraintNetwork;

/// Builds score directors against one shared network.
///
/// Cloning the factory is cheap; every clone hands out directors with
/// independent state, which makes it the natural handle to pass to worker
/// threads.
pub struct ScoreDirectorFactory<Sc: Score> {
    network: Arc<ConstraintNetwork<Sc>>,
}

impl<Sc: Score> ScoreDirectorFactory<Sc> {
    pub fn new(network: Arc<ConstraintNetwork<Sc>>) -> Self {
        Self { network }
    }

    /// Creates a director with no facts.
    pub fn build_score_director(&self) -> ScoreDirector<Sc> {
        ScoreDirector::new(Arc::clone(&self.network))
    }

    /// Creates a director already loaded with a working solution.
    pub fn build_for<W: WorkingSolution + ?Sized>(&self, solution: &W) -> Result<ScoreDirector<Sc>> {
        let mut director = self.build_score_director();
        director.set_working_solution(solution)?;
        Ok(director)
    }

    pub fn network(&self) -> &Arc<ConstraintNetwork<Sc>> {
        &self.network
    }
}

impl<Sc: Score> Clone for ScoreDirectorFactory<Sc> {
    fn clone(&self) -> Self {
        Self {
            network: Arc::clone(&self.network),
        }
    }
}
