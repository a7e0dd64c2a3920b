use std::collections::{BTreeSet, HashMap};

use scoreforge_core::Score;

use super::index::Indexer;
use super::{duplicate, elements_of, unknown, Node, Side};
use crate::error::PropagationError;
use crate::stream::joiner::{IndexKey, Joiner, JoinerSet};
use crate::tuple::{PropagationQueue, TupleArena, TupleId};

/// Whether a left tuple needs at least one partner or none at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExistenceMode {
    Exists,
    NotExists,
}

impl ExistenceMode {
    fn emits(self, partners: &BTreeSet<TupleId>) -> bool {
        match self {
            ExistenceMode::Exists => !partners.is_empty(),
            ExistenceMode::NotExists => partners.is_empty(),
        }
    }
}

struct LeftEntry {
    key: IndexKey,
    partners: BTreeSet<TupleId>,
    out: Option<TupleId>,
}

struct RightEntry {
    key: IndexKey,
    partners: BTreeSet<TupleId>,
}

/// Semi-join: forwards left tuples depending on whether any right tuple
/// matches them.
///
/// Matches are kept as explicit partner sets on both sides rather than
/// counters, so a right tuple whose filtering joiners flip on update
/// releases exactly the lefts it was counted for.
pub(crate) struct IfExistsNode {
    label: String,
    mode: ExistenceMode,
    joiners: JoinerSet,
    lefts: HashMap<TupleId, LeftEntry>,
    rights: HashMap<TupleId, RightEntry>,
    left_index: Indexer,
    right_index: Indexer,
    queue: PropagationQueue,
}

impl IfExistsNode {
    pub(crate) fn new(label: String, mode: ExistenceMode, joiners: &[Joiner]) -> Self {
        Self {
            label,
            mode,
            joiners: JoinerSet::new(joiners),
            lefts: HashMap::new(),
            rights: HashMap::new(),
            left_index: Indexer::new(),
            right_index: Indexer::new(),
            queue: PropagationQueue::new(),
        }
    }

    fn pair_matches(&self, left: TupleId, right: TupleId, arena: &TupleArena) -> Result<bool, PropagationError> {
        if !self.joiners.has_residual() {
            return Ok(true);
        }
        Ok(self
            .joiners
            .residual_matches(arena.row(left)?, arena.row(right)?))
    }

    fn partners_of_left(&self, left: TupleId, key: &IndexKey, arena: &TupleArena) -> Result<BTreeSet<TupleId>, PropagationError> {
        let mut partners = BTreeSet::new();
        for right in self.right_index.lookup(key, self.joiners.range_type(), Side::Left) {
            if self.pair_matches(left, right, arena)? {
                partners.insert(right);
            }
        }
        Ok(partners)
    }

    fn partners_of_right(&self, right: TupleId, key: &IndexKey, arena: &TupleArena) -> Result<BTreeSet<TupleId>, PropagationError> {
        let mut partners = BTreeSet::new();
        for left in self.left_index.lookup(key, self.joiners.range_type(), Side::Right) {
            if self.pair_matches(left, right, arena)? {
                partners.insert(left);
            }
        }
        Ok(partners)
    }

    fn insert_left(&mut self, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError> {
        if self.lefts.contains_key(&tuple) {
            return Err(duplicate(&self.label, tuple));
        }
        let key = self.joiners.left_key(arena.row(tuple)?);
        let partners = self.partners_of_left(tuple, &key, arena)?;
        for right in &partners {
            self.right_entry(*right)?.partners.insert(tuple);
        }
        let out = if self.mode.emits(&partners) {
            let elements = elements_of(arena, tuple)?;
            Some(self.queue.insert(arena, elements))
        } else {
            None
        };
        self.left_index.put(&key, tuple);
        self.lefts.insert(tuple, LeftEntry { key, partners, out });
        Ok(())
    }

    // The left tuple's own content changed: re-match it and refresh its output.
    fn update_left(&mut self, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError> {
        let key = self.joiners.left_key(arena.row(tuple)?);
        let entry = self
            .lefts
            .remove(&tuple)
            .ok_or_else(|| unknown(&self.label, tuple))?;
        for right in &entry.partners {
            self.right_entry(*right)?.partners.remove(&tuple);
        }
        self.left_index.remove(&entry.key, tuple);

        let partners = self.partners_of_left(tuple, &key, arena)?;
        for right in &partners {
            self.right_entry(*right)?.partners.insert(tuple);
        }
        let out = match (entry.out, self.mode.emits(&partners)) {
            (Some(out), true) => {
                let elements = elements_of(arena, tuple)?;
                self.queue.refresh(arena, out, elements, &self.label)?;
                Some(out)
            }
            (Some(out), false) => {
                self.queue.retract(arena, out, &self.label)?;
                None
            }
            (None, true) => {
                let elements = elements_of(arena, tuple)?;
                Some(self.queue.insert(arena, elements))
            }
            (None, false) => None,
        };
        self.left_index.put(&key, tuple);
        self.lefts.insert(tuple, LeftEntry { key, partners, out });
        Ok(())
    }

    fn retract_left(&mut self, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError> {
        let entry = self
            .lefts
            .remove(&tuple)
            .ok_or_else(|| unknown(&self.label, tuple))?;
        for right in &entry.partners {
            self.right_entry(*right)?.partners.remove(&tuple);
        }
        self.left_index.remove(&entry.key, tuple);
        match entry.out {
            Some(out) => self.queue.retract(arena, out, &self.label),
            None => Ok(()),
        }
    }

    fn insert_right(&mut self, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError> {
        if self.rights.contains_key(&tuple) {
            return Err(duplicate(&self.label, tuple));
        }
        let key = self.joiners.right_key(arena.row(tuple)?);
        let partners = self.partners_of_right(tuple, &key, arena)?;
        for left in &partners {
            self.left_entry(*left)?.partners.insert(tuple);
        }
        self.right_index.put(&key, tuple);
        let affected: Vec<TupleId> = partners.iter().copied().collect();
        self.rights.insert(tuple, RightEntry { key, partners });
        self.refresh_lefts(affected, arena)
    }

    fn update_right(&mut self, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError> {
        let key = self.joiners.right_key(arena.row(tuple)?);
        let entry = self
            .rights
            .remove(&tuple)
            .ok_or_else(|| unknown(&self.label, tuple))?;
        for left in &entry.partners {
            self.left_entry(*left)?.partners.remove(&tuple);
        }
        self.right_index.remove(&entry.key, tuple);

        let partners = self.partners_of_right(tuple, &key, arena)?;
        for left in &partners {
            self.left_entry(*left)?.partners.insert(tuple);
        }
        self.right_index.put(&key, tuple);
        let affected: Vec<TupleId> = entry.partners.union(&partners).copied().collect();
        self.rights.insert(tuple, RightEntry { key, partners });
        self.refresh_lefts(affected, arena)
    }

    fn retract_right(&mut self, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError> {
        let entry = self
            .rights
            .remove(&tuple)
            .ok_or_else(|| unknown(&self.label, tuple))?;
        for left in &entry.partners {
            self.left_entry(*left)?.partners.remove(&tuple);
        }
        self.right_index.remove(&entry.key, tuple);
        self.refresh_lefts(entry.partners.into_iter().collect(), arena)
    }

    // Partner sets of these lefts changed, their content did not.
    fn refresh_lefts(&mut self, lefts: Vec<TupleId>, arena: &mut TupleArena) -> Result<(), PropagationError> {
        for left in lefts {
            let mode = self.mode;
            let entry = self
                .lefts
                .get_mut(&left)
                .ok_or_else(|| unknown(&self.label, left))?;
            match (entry.out, mode.emits(&entry.partners)) {
                (Some(out), false) => {
                    entry.out = None;
                    self.queue.retract(arena, out, &self.label)?;
                }
                (None, true) => {
                    let elements = elements_of(arena, left)?;
                    entry.out = Some(self.queue.insert(arena, elements));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn left_entry(&mut self, tuple: TupleId) -> Result<&mut LeftEntry, PropagationError> {
        self.lefts
            .get_mut(&tuple)
            .ok_or_else(|| unknown(&self.label, tuple))
    }

    fn right_entry(&mut self, tuple: TupleId) -> Result<&mut RightEntry, PropagationError> {
        self.rights
            .get_mut(&tuple)
            .ok_or_else(|| unknown(&self.label, tuple))
    }
}

impl<Sc: Score> Node<Sc> for IfExistsNode {
    fn label(&self) -> &str {
        &self.label
    }

    fn insert(&mut self, side: Side, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError> {
        match side {
            Side::Left => self.insert_left(tuple, arena),
            Side::Right => self.insert_right(tuple, arena),
        }
    }

    fn update(&mut self, side: Side, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError> {
        match side {
            Side::Left => self.update_left(tuple, arena),
            Side::Right => self.update_right(tuple, arena),
        }
    }

    fn retract(&mut self, side: Side, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError> {
        match side {
            Side::Left => self.retract_left(tuple, arena),
            Side::Right => self.retract_right(tuple, arena),
        }
    }

    fn queue_mut(&mut self) -> Option<&mut PropagationQueue> {
        Some(&mut self.queue)
    }

    fn stored(&self) -> usize {
        self.lefts.len() + self.rights.len()
    }
}

#[cfg(test)]
mod tests {
    use scoreforge_core::SimpleScore;

    use super::*;
    use crate::fact::Value;
    use crate::node::test_support::{flush, ok_tuple};
    use crate::stream::joiner::equal;
    use crate::tuple::Row;

    fn node(mode: ExistenceMode) -> IfExistsNode {
        IfExistsNode::new("if_exists#8".to_string(), mode, &[equal(|r: Row| r.get(0).clone())])
    }

    fn send(node: &mut IfExistsNode, side: Side, tuple: TupleId, arena: &mut TupleArena) {
        Node::<SimpleScore>::insert(node, side, tuple, arena).unwrap();
    }

    #[test]
    fn test_exists_and_not_exists_partition_the_left_side() {
        let mut arena = TupleArena::new();
        let lefts: Vec<TupleId> = [1, 2, 3]
            .iter()
            .map(|k| ok_tuple(&mut arena, &[Value::Int(*k)]))
            .collect();
        let right = ok_tuple(&mut arena, &[Value::Int(2)]);

        let mut exists = node(ExistenceMode::Exists);
        let mut absent = node(ExistenceMode::NotExists);
        for n in [&mut exists, &mut absent] {
            for left in &lefts {
                send(n, Side::Left, *left, &mut arena);
            }
            send(n, Side::Right, right, &mut arena);
        }
        let (emitted, _, _) = flush::<SimpleScore>(&mut exists, &mut arena);
        let (missing, _, _) = flush::<SimpleScore>(&mut absent, &mut arena);
        assert_eq!(emitted.len(), 1);
        assert_eq!(missing.len(), 2);
        assert_eq!(arena.elements(emitted[0]).unwrap(), &[Value::Int(2)]);
    }

    #[test]
    fn test_right_update_moves_existence_between_lefts() {
        let mut arena = TupleArena::new();
        let one = ok_tuple(&mut arena, &[Value::Int(1)]);
        let two = ok_tuple(&mut arena, &[Value::Int(2)]);
        let right = ok_tuple(&mut arena, &[Value::Int(1)]);
        let mut n = node(ExistenceMode::NotExists);
        send(&mut n, Side::Left, one, &mut arena);
        send(&mut n, Side::Left, two, &mut arena);
        send(&mut n, Side::Right, right, &mut arena);
        let (inserted, _, _) = flush::<SimpleScore>(&mut n, &mut arena);
        assert_eq!(inserted.len(), 1);

        arena.set_elements(right, [Value::Int(2)].into_iter().collect()).unwrap();
        Node::<SimpleScore>::update(&mut n, Side::Right, right, &mut arena).unwrap();
        let (inserted_now, updated, retracted) = flush::<SimpleScore>(&mut n, &mut arena);
        assert_eq!(retracted, inserted);
        assert!(updated.is_empty());
        assert_eq!(arena.elements(inserted_now[0]).unwrap(), &[Value::Int(1)]);

        Node::<SimpleScore>::retract(&mut n, Side::Right, right, &mut arena).unwrap();
        let (inserted, _, _) = flush::<SimpleScore>(&mut n, &mut arena);
        assert_eq!(inserted.len(), 1);
        assert_eq!(arena.elements(inserted[0]).unwrap(), &[Value::Int(2)]);
    }
}
