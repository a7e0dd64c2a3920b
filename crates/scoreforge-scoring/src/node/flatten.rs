use std::collections::HashMap;

use scoreforge_core::Score;

use super::{duplicate, unknown, Node, Side};
use crate::error::PropagationError;
use crate::stream::Flattener;
use crate::tuple::{Elements, PropagationQueue, TupleArena, TupleId};

/// Replaces the last element of each tuple by every value it expands to.
pub(crate) struct FlattenLastNode {
    label: String,
    flattener: Flattener,
    outs: HashMap<TupleId, Vec<TupleId>>,
    queue: PropagationQueue,
}

impl FlattenLastNode {
    pub(crate) fn new(label: String, flattener: Flattener) -> Self {
        Self {
            label,
            flattener,
            outs: HashMap::new(),
            queue: PropagationQueue::new(),
        }
    }

    fn expand(&mut self, tuple: TupleId, arena: &mut TupleArena) -> Result<Vec<TupleId>, PropagationError> {
        let row = arena.row(tuple)?;
        let prefix = &row.values()[..row.len().saturating_sub(1)];
        let expansions: Vec<Elements> = self
            .flattener
            .apply(row)
            .into_iter()
            .map(|value| prefix.iter().cloned().chain(std::iter::once(value)).collect())
            .collect();
        Ok(expansions
            .into_iter()
            .map(|elements| self.queue.insert(arena, elements))
            .collect())
    }
}

impl<Sc: Score> Node<Sc> for FlattenLastNode {
    fn label(&self) -> &str {
        &self.label
    }

    fn insert(&mut self, _side: Side, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError> {
        if self.outs.contains_key(&tuple) {
            return Err(duplicate(&self.label, tuple));
        }
        let outs = self.expand(tuple, arena)?;
        self.outs.insert(tuple, outs);
        Ok(())
    }

    // Expansions carry no identity across updates: retract all, insert all.
    fn update(&mut self, _side: Side, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError> {
        let previous = self
            .outs
            .remove(&tuple)
            .ok_or_else(|| unknown(&self.label, tuple))?;
        for out in previous {
            self.queue.retract(arena, out, &self.label)?;
        }
        let outs = self.expand(tuple, arena)?;
        self.outs.insert(tuple, outs);
        Ok(())
    }

    fn retract(&mut self, _side: Side, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError> {
        let outs = self
            .outs
            .remove(&tuple)
            .ok_or_else(|| unknown(&self.label, tuple))?;
        for out in outs {
            self.queue.retract(arena, out, &self.label)?;
        }
        Ok(())
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
    use crate::fact::Value;
    use crate::node::test_support::{flush, ok_tuple};
    use crate::tuple::Row;

    fn split() -> Flattener {
        Flattener::new(|r: Row| {
            r.last()
                .as_list()
                .map(|items| items.to_vec())
                .unwrap_or_default()
        })
    }

    #[test]
    fn test_flatten_last_replaces_last_element() {
        let mut arena = TupleArena::new();
        let mut node = FlattenLastNode::new("flatten_last#3".to_string(), split());
        let parent = ok_tuple(
            &mut arena,
            &[Value::from("a"), Value::list([Value::Int(1), Value::Int(2)])],
        );

        Node::<SimpleScore>::insert(&mut node, Side::Left, parent, &mut arena).unwrap();
        let (inserted, _, _) = flush::<SimpleScore>(&mut node, &mut arena);
        let mut rows: Vec<Vec<Value>> = inserted
            .iter()
            .map(|id| arena.elements(*id).unwrap().to_vec())
            .collect();
        rows.sort();
        assert_eq!(
            rows,
            vec![
                vec![Value::from("a"), Value::Int(1)],
                vec![Value::from("a"), Value::Int(2)],
            ]
        );
    }

    #[test]
    fn test_update_reexpands_everything() {
        let mut arena = TupleArena::new();
        let mut node = FlattenLastNode::new("flatten_last#3".to_string(), split());
        let parent = ok_tuple(&mut arena, &[Value::list([Value::Int(1), Value::Int(2)])]);
        Node::<SimpleScore>::insert(&mut node, Side::Left, parent, &mut arena).unwrap();
        let (first, _, _) = flush::<SimpleScore>(&mut node, &mut arena);

        arena
            .set_elements(parent, [Value::list([Value::Int(3)])].into_iter().collect())
            .unwrap();
        Node::<SimpleScore>::update(&mut node, Side::Left, parent, &mut arena).unwrap();
        let (inserted, updated, retracted) = flush::<SimpleScore>(&mut node, &mut arena);
        assert!(updated.is_empty());
        assert_eq!(retracted.len(), first.len());
        assert_eq!(inserted.len(), 1);
        assert_eq!(arena.elements(inserted[0]).unwrap(), &[Value::Int(3)]);
    }
}
