use std::collections::{BTreeMap, HashMap};

use scoreforge_core::Score;

use super::index::Indexer;
use super::{duplicate, unknown, Node, Side};
use crate::error::PropagationError;
use crate::stream::joiner::{IndexKey, Joiner, JoinerSet};
use crate::tuple::{Elements, PropagationQueue, TupleArena, TupleId};

struct JoinEntry {
    key: IndexKey,
    // partner on the other side -> combined output
    outs: BTreeMap<TupleId, TupleId>,
}

#[derive(Default)]
struct JoinSide {
    entries: HashMap<TupleId, JoinEntry>,
    index: Indexer,
}

/// Binary join producing `left ++ right` for every matching pair.
///
/// Equal joiners select a hash bucket of the opposite side's index, the
/// first comparison joiner narrows it to an ordered range, and the remaining
/// joiners are evaluated per candidate pair.
pub(crate) struct JoinNode {
    label: String,
    joiners: JoinerSet,
    left: JoinSide,
    right: JoinSide,
    queue: PropagationQueue,
}

impl JoinNode {
    pub(crate) fn new(label: String, joiners: &[Joiner]) -> Self {
        Self {
            label,
            joiners: JoinerSet::new(joiners),
            left: JoinSide::default(),
            right: JoinSide::default(),
            queue: PropagationQueue::new(),
        }
    }

    fn key(&self, side: Side, tuple: TupleId, arena: &TupleArena) -> Result<IndexKey, PropagationError> {
        let row = arena.row(tuple)?;
        Ok(match side {
            Side::Left => self.joiners.left_key(row),
            Side::Right => self.joiners.right_key(row),
        })
    }

    fn pair_matches(&self, left: TupleId, right: TupleId, arena: &TupleArena) -> Result<bool, PropagationError> {
        if !self.joiners.has_residual() {
            return Ok(true);
        }
        Ok(self
            .joiners
            .residual_matches(arena.row(left)?, arena.row(right)?))
    }

    fn candidates(&self, side: Side, key: &IndexKey) -> Vec<TupleId> {
        let other = match side {
            Side::Left => &self.right.index,
            Side::Right => &self.left.index,
        };
        other.lookup(key, self.joiners.range_type(), side)
    }

    fn do_insert(&mut self, side: Side, tuple: TupleId, key: IndexKey, arena: &mut TupleArena) -> Result<(), PropagationError> {
        let mut entry = JoinEntry {
            key,
            outs: BTreeMap::new(),
        };
        for partner in self.candidates(side, &entry.key) {
            let (left, right) = orient(side, tuple, partner);
            if !self.pair_matches(left, right, arena)? {
                continue;
            }
            let elements = combined(left, right, arena)?;
            let out = self.queue.insert(arena, elements);
            entry.outs.insert(partner, out);
        }
        let (own, other) = split(&mut self.left, &mut self.right, side);
        for (partner, out) in &entry.outs {
            other
                .entries
                .get_mut(partner)
                .ok_or_else(|| unknown(&self.label, *partner))?
                .outs
                .insert(tuple, *out);
        }
        own.index.put(&entry.key, tuple);
        own.entries.insert(tuple, entry);
        Ok(())
    }

    fn do_retract(&mut self, side: Side, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError> {
        let (own, other) = split(&mut self.left, &mut self.right, side);
        let entry = own
            .entries
            .remove(&tuple)
            .ok_or_else(|| unknown(&self.label, tuple))?;
        own.index.remove(&entry.key, tuple);
        for (partner, out) in entry.outs {
            if let Some(partner_entry) = other.entries.get_mut(&partner) {
                partner_entry.outs.remove(&tuple);
            }
            self.queue.retract(arena, out, &self.label)?;
        }
        Ok(())
    }
}

// (own, other) stores for a tuple arriving on `side`
fn split<'a>(left: &'a mut JoinSide, right: &'a mut JoinSide, side: Side) -> (&'a mut JoinSide, &'a mut JoinSide) {
    match side {
        Side::Left => (left, right),
        Side::Right => (right, left),
    }
}

fn orient(side: Side, tuple: TupleId, partner: TupleId) -> (TupleId, TupleId) {
    match side {
        Side::Left => (tuple, partner),
        Side::Right => (partner, tuple),
    }
}

fn combined(left: TupleId, right: TupleId, arena: &TupleArena) -> Result<Elements, PropagationError> {
    Ok(arena
        .elements(left)?
        .iter()
        .chain(arena.elements(right)?)
        .cloned()
        .collect())
}

impl<Sc: Score> Node<Sc> for JoinNode {
    fn label(&self) -> &str {
        &self.label
    }

    fn insert(&mut self, side: Side, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError> {
        let (own, _) = split(&mut self.left, &mut self.right, side);
        if own.entries.contains_key(&tuple) {
            return Err(duplicate(&self.label, tuple));
        }
        let key = self.key(side, tuple, arena)?;
        self.do_insert(side, tuple, key, arena)
    }

    fn update(&mut self, side: Side, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError> {
        let key = self.key(side, tuple, arena)?;
        let (own, _) = split(&mut self.left, &mut self.right, side);
        let Some(entry) = own.entries.get(&tuple) else {
            return Err(unknown(&self.label, tuple));
        };
        if entry.key != key {
            self.do_retract(side, tuple, arena)?;
            return self.do_insert(side, tuple, key, arena);
        }

        // Same bucket and range: every current partner is still a candidate.
        for partner in self.candidates(side, &key) {
            let (left, right) = orient(side, tuple, partner);
            let matches = self.pair_matches(left, right, arena)?;
            let (own, other) = split(&mut self.left, &mut self.right, side);
            let entry = own
                .entries
                .get_mut(&tuple)
                .ok_or_else(|| unknown(&self.label, tuple))?;
            match (entry.outs.get(&partner).copied(), matches) {
                (Some(out), true) => {
                    let elements = combined(left, right, arena)?;
                    self.queue.refresh(arena, out, elements, &self.label)?;
                }
                (Some(out), false) => {
                    entry.outs.remove(&partner);
                    if let Some(partner_entry) = other.entries.get_mut(&partner) {
                        partner_entry.outs.remove(&tuple);
                    }
                    self.queue.retract(arena, out, &self.label)?;
                }
                (None, true) => {
                    let elements = combined(left, right, arena)?;
                    let out = self.queue.insert(arena, elements);
                    entry.outs.insert(partner, out);
                    other
                        .entries
                        .get_mut(&partner)
                        .ok_or_else(|| unknown(&self.label, partner))?
                        .outs
                        .insert(tuple, out);
                }
                (None, false) => {}
            }
        }
        Ok(())
    }

    fn retract(&mut self, side: Side, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError> {
        self.do_retract(side, tuple, arena)
    }

    fn queue_mut(&mut self) -> Option<&mut PropagationQueue> {
        Some(&mut self.queue)
    }

    fn stored(&self) -> usize {
        self.left.entries.len() + self.right.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use scoreforge_core::SimpleScore;

    use super::*;
    use crate::fact::Value;
    use crate::node::test_support::{flush, ok_tuple};
    use crate::stream::joiner::{equal, filtering, less_than};
    use crate::tuple::Row;

    fn insert(node: &mut JoinNode, side: Side, tuple: TupleId, arena: &mut TupleArena) {
        Node::<SimpleScore>::insert(node, side, tuple, arena).unwrap();
    }

    fn contents(ids: &[TupleId], arena: &TupleArena) -> Vec<Vec<Value>> {
        let mut rows: Vec<Vec<Value>> = ids
            .iter()
            .map(|id| arena.elements(*id).unwrap().to_vec())
            .collect();
        rows.sort();
        rows
    }

    #[test]
    fn test_equal_join_emits_cross_product_per_key() {
        let mut arena = TupleArena::new();
        let mut node = JoinNode::new("join#5".to_string(), &[equal(|r: Row| r.get(0).clone())]);
        let a = ok_tuple(&mut arena, &[Value::Int(1)]);
        let b = ok_tuple(&mut arena, &[Value::Int(1)]);
        let c = ok_tuple(&mut arena, &[Value::Int(2)]);
        insert(&mut node, Side::Left, a, &mut arena);
        insert(&mut node, Side::Right, b, &mut arena);
        insert(&mut node, Side::Right, c, &mut arena);
        let (inserted, _, _) = flush::<SimpleScore>(&mut node, &mut arena);
        assert_eq!(
            contents(&inserted, &arena),
            vec![vec![Value::Int(1), Value::Int(1)]]
        );

        // moving c into key 1 joins it with a
        arena.set_elements(c, [Value::Int(1)].into_iter().collect()).unwrap();
        Node::<SimpleScore>::update(&mut node, Side::Right, c, &mut arena).unwrap();
        let (inserted, _, _) = flush::<SimpleScore>(&mut node, &mut arena);
        assert_eq!(inserted.len(), 1);

        Node::<SimpleScore>::retract(&mut node, Side::Left, a, &mut arena).unwrap();
        let (_, _, retracted) = flush::<SimpleScore>(&mut node, &mut arena);
        assert_eq!(retracted.len(), 2);
        assert!(node.right.entries.values().all(|entry| entry.outs.is_empty()));
    }

    #[test]
    fn test_range_and_filtering_joiners() {
        let mut arena = TupleArena::new();
        let mut node = JoinNode::new(
            "join#6".to_string(),
            &[
                less_than(|r: Row| r.get(0).clone()),
                filtering(|l: Row, r: Row| l.get(1) != r.get(1)),
            ],
        );
        let left = ok_tuple(&mut arena, &[Value::Int(5), Value::from("x")]);
        let above = ok_tuple(&mut arena, &[Value::Int(9), Value::from("y")]);
        let above_same = ok_tuple(&mut arena, &[Value::Int(9), Value::from("x")]);
        let below = ok_tuple(&mut arena, &[Value::Int(1), Value::from("y")]);
        for right in [above, above_same, below] {
            insert(&mut node, Side::Right, right, &mut arena);
        }
        insert(&mut node, Side::Left, left, &mut arena);
        let (inserted, _, _) = flush::<SimpleScore>(&mut node, &mut arena);
        assert_eq!(
            contents(&inserted, &arena),
            vec![vec![
                Value::Int(5),
                Value::from("x"),
                Value::Int(9),
                Value::from("y")
            ]]
        );

        // same range key, but the filtering joiner now rejects the pair
        arena
            .set_elements(left, [Value::Int(5), Value::from("y")].into_iter().collect())
            .unwrap();
        Node::<SimpleScore>::update(&mut node, Side::Left, left, &mut arena).unwrap();
        let (inserted, updated, retracted) = flush::<SimpleScore>(&mut node, &mut arena);
        assert_eq!(retracted.len(), 1);
        assert!(updated.is_empty());
        assert_eq!(inserted.len(), 1);
    }

    #[test]
    fn test_self_join_pairs_each_tuple_with_itself_once() {
        let mut arena = TupleArena::new();
        let mut node = JoinNode::new("join#7".to_string(), &[equal(|r: Row| r.get(0).clone())]);
        let a = ok_tuple(&mut arena, &[Value::Int(1)]);
        insert(&mut node, Side::Left, a, &mut arena);
        insert(&mut node, Side::Right, a, &mut arena);
        let (inserted, _, _) = flush::<SimpleScore>(&mut node, &mut arena);
        assert_eq!(inserted.len(), 1);

        Node::<SimpleScore>::retract(&mut node, Side::Left, a, &mut arena).unwrap();
        Node::<SimpleScore>::retract(&mut node, Side::Right, a, &mut arena).unwrap();
        let (_, _, retracted) = flush::<SimpleScore>(&mut node, &mut arena);
        assert_eq!(retracted.len(), 1);
        assert_eq!(Node::<SimpleScore>::stored(&node), 0);
    }
}
