use std::collections::HashMap;

use scoreforge_core::Score;

use super::{duplicate, elements_of, unknown, Node, Side};
use crate::error::PropagationError;
use crate::stream::Predicate;
use crate::tuple::{PropagationQueue, TupleArena, TupleId};

/// Forwards the parent tuples that pass a predicate.
///
/// Every parent tuple is remembered, passing or not, so an update can flip
/// it in either direction.
pub(crate) struct FilterNode {
    label: String,
    predicate: Predicate,
    outs: HashMap<TupleId, Option<TupleId>>,
    queue: PropagationQueue,
}

impl FilterNode {
    pub(crate) fn new(label: String, predicate: Predicate) -> Self {
        Self {
            label,
            predicate,
            outs: HashMap::new(),
            queue: PropagationQueue::new(),
        }
    }

    fn emit(&mut self, parent: TupleId, arena: &mut TupleArena) -> Result<TupleId, PropagationError> {
        let elements = elements_of(arena, parent)?;
        Ok(self.queue.insert(arena, elements))
    }
}

impl<Sc: Score> Node<Sc> for FilterNode {
    fn label(&self) -> &str {
        &self.label
    }

    fn insert(&mut self, _side: Side, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError> {
        if self.outs.contains_key(&tuple) {
            return Err(duplicate(&self.label, tuple));
        }
        let out = if self.predicate.test(arena.row(tuple)?) {
            Some(self.emit(tuple, arena)?)
        } else {
            None
        };
        self.outs.insert(tuple, out);
        Ok(())
    }

    fn update(&mut self, _side: Side, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError> {
        let current = *self
            .outs
            .get(&tuple)
            .ok_or_else(|| unknown(&self.label, tuple))?;
        let passes = self.predicate.test(arena.row(tuple)?);
        match (current, passes) {
            (Some(out), true) => {
                let elements = elements_of(arena, tuple)?;
                self.queue.refresh(arena, out, elements, &self.label)
            }
            (Some(out), false) => {
                self.outs.insert(tuple, None);
                self.queue.retract(arena, out, &self.label)
            }
            (None, true) => {
                let out = self.emit(tuple, arena)?;
                self.outs.insert(tuple, Some(out));
                Ok(())
            }
            (None, false) => Ok(()),
        }
    }

    fn retract(&mut self, _side: Side, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError> {
        match self.outs.remove(&tuple) {
            Some(Some(out)) => self.queue.retract(arena, out, &self.label),
            Some(None) => Ok(()),
            None => Err(unknown(&self.label, tuple)),
        }
    }

    fn queue_mut(&mut self) -> Option<&mut PropagationQueue> {
        Some(&mut self.queue)
    }

    fn stored(&self) -> usize {
        self.outs.len()
    }
}
