//! Score directors: per-session state over a compiled network.
//!
//! A [`ScoreDirector`] owns the tuple arena, the node states and the fact
//! registry of one working solution. Fact lifecycle calls only touch the
//! entry nodes; the propagation through the rest of the network is deferred
//! to the next query, so any number of changes settle in one calculation
//! cycle.
//!
//! # Lifecycle calls
//!
//! | change | calls |
//! |---|---|
//! | entity added | [`before_entity_added`](ScoreDirector::before_entity_added), [`after_entity_added`](ScoreDirector::after_entity_added) |
//! | entity removed | [`before_entity_removed`](ScoreDirector::before_entity_removed), [`after_entity_removed`](ScoreDirector::after_entity_removed) |
//! | planning variable changed | [`before_variable_changed`](ScoreDirector::before_variable_changed), [`after_variable_changed`](ScoreDirector::after_variable_changed) |
//! | problem fact added / removed / changed | `before_problem_*` / `after_problem_*` |
//!
//! [`insert_fact`](ScoreDirector::insert_fact), [`update_fact`](ScoreDirector::update_fact)
//! and [`retract_fact`](ScoreDirector::retract_fact) do the same without the
//! pairing, for callers that have no use for the before notification.

mod factory;
mod query;
mod session;
mod settle;

#[cfg(test)]
mod tests;

pub use factory::ScoreDirectorFactory;
pub use session::ScoreDirector;

use crate::fact::FactRef;

/// Snapshot of every fact of a working solution.
pub trait WorkingSolution {
    fn facts(&self) -> Vec<FactRef>;
}

impl WorkingSolution for [FactRef] {
    fn facts(&self) -> Vec<FactRef> {
        self.to_vec()
    }
}

impl WorkingSolution for Vec<FactRef> {
    fn facts(&self) -> Vec<FactRef> {
        self.clone()
    }
}
