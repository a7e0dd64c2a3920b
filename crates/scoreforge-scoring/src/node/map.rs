use std::collections::HashMap;

use scoreforge_core::Score;

use super::{duplicate, unknown, Node, Side};
use crate::error::PropagationError;
use crate::stream::Mapper;
use crate::tuple::{Elements, PropagationQueue, Row, TupleArena, TupleId};

/// Replaces (or, for `expand`, extends) each tuple by computed values.
///
/// Outputs are value-based: two parents mapping to equal content produce
/// two equal tuples.
pub(crate) struct MapNode {
    label: String,
    mappers: Vec<Mapper>,
    retain_input: bool,
    outs: HashMap<TupleId, TupleId>,
    queue: PropagationQueue,
}

impl MapNode {
    pub(crate) fn new(label: String, mappers: Vec<Mapper>, retain_input: bool) -> Self {
        Self {
            label,
            mappers,
            retain_input,
            outs: HashMap::new(),
            queue: PropagationQueue::new(),
        }
    }

    fn compute(&self, row: Row<'_>) -> Elements {
        let mut elements = Elements::new();
        if self.retain_input {
            elements.extend(row.values().iter().cloned());
        }
        elements.extend(self.mappers.iter().map(|mapper| mapper.apply(row)));
        elements
    }
}

impl<Sc: Score> Node<Sc> for MapNode {
    fn label(&self) -> &str {
        &self.label
    }

    fn insert(&mut self, _side: Side, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError> {
        if self.outs.contains_key(&tuple) {
            return Err(duplicate(&self.label, tuple));
        }
        let elements = self.compute(arena.row(tuple)?);
        let out = self.queue.insert(arena, elements);
        self.outs.insert(tuple, out);
        Ok(())
    }

    fn update(&mut self, _side: Side, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError> {
        let out = *self
            .outs
            .get(&tuple)
            .ok_or_else(|| unknown(&self.label, tuple))?;
        let elements = self.compute(arena.row(tuple)?);
        self.queue.refresh(arena, out, elements, &self.label)
    }

    fn retract(&mut self, _side: Side, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError> {
        let out = self
            .outs
            .remove(&tuple)
            .ok_or_else(|| unknown(&self.label, tuple))?;
        self.queue.retract(arena, out, &self.label)
    }

    fn queue_mut(&mut self) -> Option<&mut PropagationQueue> {
        Some(&mut self.queue)
    }

    fn stored(&self) -> usize {
        self.outs.len()
    }
}
