use std::collections::HashMap;

use scoreforge_core::Score;

use super::{duplicate, unknown, Node, Side};
use crate::error::PropagationError;
use crate::fact::Value;
use crate::tuple::{Elements, PropagationQueue, Row, TupleArena, TupleId};

/// Union of two inputs, keeping multiplicity.
///
/// Tuples shorter than the node's arity are padded with `Null`. A parent
/// that feeds both sides produces two outputs per tuple.
pub(crate) struct ConcatNode {
    label: String,
    arity: usize,
    outs: HashMap<(Side, TupleId), TupleId>,
    queue: PropagationQueue,
}

impl ConcatNode {
    pub(crate) fn new(label: String, arity: usize) -> Self {
        Self {
            label,
            arity,
            outs: HashMap::new(),
            queue: PropagationQueue::new(),
        }
    }

    fn padded(&self, row: Row<'_>) -> Elements {
        let mut elements: Elements = row.values().iter().cloned().collect();
        elements.resize(self.arity.max(row.len()), Value::Null);
        elements
    }
}

impl<Sc: Score> Node<Sc> for ConcatNode {
    fn label(&self) -> &str {
        &self.label
    }

    fn insert(&mut self, side: Side, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError> {
        if self.outs.contains_key(&(side, tuple)) {
            return Err(duplicate(&self.label, tuple));
        }
        let elements = self.padded(arena.row(tuple)?);
        let out = self.queue.insert(arena, elements);
        self.outs.insert((side, tuple), out);
        Ok(())
    }

    fn update(&mut self, side: Side, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError> {
        let out = *self
            .outs
            .get(&(side, tuple))
            .ok_or_else(|| unknown(&self.label, tuple))?;
        let elements = self.padded(arena.row(tuple)?);
        self.queue.refresh(arena, out, elements, &self.label)
    }

    fn retract(&mut self, side: Side, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError> {
        let out = self
            .outs
            .remove(&(side, tuple))
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

#[cfg(test)]
mod tests {
    use scoreforge_core::SimpleScore;

    use super::*;
    use crate::node::test_support::{flush, ok_tuple};

    #[test]
    fn test_pads_shorter_side_and_keeps_duplicates() {
        let mut arena = TupleArena::new();
        let mut node = ConcatNode::new("concat#4".to_string(), 2);
        let pair = ok_tuple(&mut arena, &[Value::Int(1), Value::Int(2)]);
        let single = ok_tuple(&mut arena, &[Value::Int(1)]);

        Node::<SimpleScore>::insert(&mut node, Side::Left, pair, &mut arena).unwrap();
        Node::<SimpleScore>::insert(&mut node, Side::Right, single, &mut arena).unwrap();
        Node::<SimpleScore>::insert(&mut node, Side::Right, pair, &mut arena).unwrap();
        let (inserted, _, _) = flush::<SimpleScore>(&mut node, &mut arena);
        assert_eq!(inserted.len(), 3);
        let padded: Vec<&[Value]> = inserted
            .iter()
            .map(|id| arena.elements(*id).unwrap())
            .filter(|elements| elements[1].is_null())
            .collect();
        assert_eq!(padded, vec![&[Value::Int(1), Value::Null][..]]);

        Node::<SimpleScore>::retract(&mut node, Side::Left, pair, &mut arena).unwrap();
        let (_, _, retracted) = flush::<SimpleScore>(&mut node, &mut arena);
        assert_eq!(retracted.len(), 1);
        assert_eq!(Node::<SimpleScore>::stored(&node), 2);
    }
}
