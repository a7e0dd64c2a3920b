// Calculation cycles.
//
// Layers flush in order. Within a layer every node first runs its
// before_flush hook and drains its queue, then the drained tuples are
// propagated to the children in three phases: retracts, updates, inserts.
// Children always sit in a later layer, so each node flushes once per cycle.

use std::sync::Arc;

use scoreforge_config::EnvironmentMode;
use scoreforge_core::Score;
use tracing::{debug, trace};

use super::ScoreDirector;
use crate::error::{PropagationError, ProtocolViolation, Result, ScoringError};
use crate::node::NodeId;
use crate::tuple::{TupleId, TupleState};

#[derive(Default)]
struct Flush {
    retracted: Vec<(NodeId, TupleId)>,
    updated: Vec<(NodeId, TupleId)>,
    inserted: Vec<(NodeId, TupleId)>,
}

impl<Sc: Score> ScoreDirector<Sc> {
    /// Runs one calculation cycle and returns the current score.
    ///
    /// # Errors
    ///
    /// Fails with [`ProtocolViolation::OpenMutations`] while any `before_*`
    /// call is still waiting for its `after_*`, and with
    /// [`ScoringError::ScoreCorruption`] when the full-assert mode finds the
    /// incremental score differs from a rebuild. A score or `sum` that no
    /// longer fits in an `i64` fails with a [`PropagationError`].
    pub fn calculate_score(&mut self) -> Result<Sc> {
        self.ensure_no_open_mutations()?;
        let dirty = self.settle()?;
        let score = self.current_score()?;
        debug!(
            event = "score_calculated",
            cycle = self.cycles,
            dirty,
            score = %score,
        );
        if self.mode.is_asserted() {
            self.assert_settled()?;
        }
        if self.mode.is_fully_asserted() {
            self.assert_matches_rebuild(score)?;
        }
        Ok(score)
    }

    pub(super) fn ensure_no_open_mutations(&self) -> Result<(), ProtocolViolation> {
        match self.registry.open_mutations() {
            0 => Ok(()),
            count => Err(ProtocolViolation::OpenMutations { count }),
        }
    }

    pub(super) fn current_score(&self) -> Result<Sc, PropagationError> {
        let mut total = Sc::zero();
        for constraint in &self.network.constraints {
            let Some(scorer) = constraint.scorer.and_then(|id| self.nodes[id].as_scorer()) else {
                continue;
            };
            total = total
                .checked_add(&scorer.total())
                .ok_or_else(|| PropagationError::ScoreOverflow {
                    constraint: constraint.constraint_ref.full_name(),
                })?;
        }
        Ok(total)
    }

    /// Flushes every layer; returns the number of tuples propagated.
    pub(super) fn settle(&mut self) -> Result<usize, PropagationError> {
        let network = Arc::clone(&self.network);
        let mut propagated = 0;
        for layer in &network.layers {
            let flush = self.drain_layer(layer)?;
            propagated += flush.retracted.len() + flush.updated.len() + flush.inserted.len();

            for (id, tuple) in flush.retracted {
                for &(child, side) in &network.children[id] {
                    self.nodes[child].retract(side, tuple, &mut self.arena)?;
                }
                self.arena.free(tuple)?;
            }
            for (id, tuple) in flush.updated {
                self.arena.set_state(tuple, TupleState::Ok)?;
                for &(child, side) in &network.children[id] {
                    self.nodes[child].update(side, tuple, &mut self.arena)?;
                }
            }
            for (id, tuple) in flush.inserted {
                self.arena.set_state(tuple, TupleState::Ok)?;
                for &(child, side) in &network.children[id] {
                    self.nodes[child].insert(side, tuple, &mut self.arena)?;
                }
            }
        }
        self.cycles += 1;
        Ok(propagated)
    }

    fn drain_layer(&mut self, layer: &[NodeId]) -> Result<Flush, PropagationError> {
        let mut flush = Flush::default();
        for &id in layer {
            let node = &mut self.nodes[id];
            node.before_flush(&mut self.arena)?;
            let Some(queue) = node.queue_mut() else {
                continue;
            };
            let dirty = queue.take();
            if dirty.is_empty() {
                continue;
            }
            trace!(event = "node_flush", node = node.label(), dirty = dirty.len());
            for tuple in dirty {
                match self.arena.state(tuple)? {
                    TupleState::Creating => flush.inserted.push((id, tuple)),
                    TupleState::Updating => flush.updated.push((id, tuple)),
                    TupleState::Dying => flush.retracted.push((id, tuple)),
                    // created and retracted within the cycle; never seen downstream
                    TupleState::Aborting => self.arena.free(tuple)?,
                    state => {
                        return Err(PropagationError::IllegalTransition {
                            node: node.label().to_string(),
                            tuple,
                            state,
                            operation: "flush",
                        })
                    }
                }
            }
        }
        Ok(flush)
    }

    // Fast-assert checks: drained queues, settled tuples, and no leftovers
    // once the last fact is gone.
    fn assert_settled(&mut self) -> Result<(), PropagationError> {
        for node in &mut self.nodes {
            let count = node.queue_mut().map_or(0, |queue| queue.len());
            if count > 0 {
                return Err(PropagationError::UnflushedQueue {
                    node: node.label().to_string(),
                    count,
                });
            }
        }
        if let Some((tuple, state)) = self
            .arena
            .iter()
            .map(|(id, tuple)| (id, tuple.state()))
            .find(|(_, state)| *state != TupleState::Ok)
        {
            return Err(PropagationError::UnsettledTuple { tuple, state });
        }
        if self.registry.is_empty() {
            if let Some(node) = self.nodes.iter().find(|node| node.stored() > 0) {
                return Err(PropagationError::LeakedTuples {
                    node: node.label().to_string(),
                    count: node.stored(),
                });
            }
            if !self.arena.is_empty() {
                return Err(PropagationError::LeakedTuples {
                    node: "arena".to_string(),
                    count: self.arena.len(),
                });
            }
        }
        Ok(())
    }

    // Full-assert check: a fresh session over the same facts must agree.
    fn assert_matches_rebuild(&self, score: Sc) -> Result<()> {
        let mut scratch = Self::with_mode(Arc::clone(&self.network), EnvironmentMode::NonReproducible);
        for fact in self.registry.facts() {
            scratch.insert_fact(fact)?;
        }
        let expected = scratch.calculate_score()?;
        if expected != score {
            return Err(ScoringError::ScoreCorruption {
                expected: expected.to_string(),
                actual: score.to_string(),
            });
        }
        Ok(())
    }
}
