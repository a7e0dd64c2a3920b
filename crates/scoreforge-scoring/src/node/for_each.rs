use std::any::TypeId;
use std::collections::HashMap;

use scoreforge_core::Score;
use smallvec::smallvec;

use super::{duplicate, Node, Side};
use crate::error::PropagationError;
use crate::fact::{FactId, FactRef, Value};
use crate::fact::FactPredicate;
use crate::tuple::{PropagationQueue, TupleArena, TupleId};

/// Entry point of a class: one arity-1 tuple per visible fact.
pub(crate) struct ForEachNode {
    label: String,
    // assignment filter per concrete type; absent means every fact passes
    filters: HashMap<TypeId, FactPredicate>,
    emitted: HashMap<FactId, TupleId>,
    queue: PropagationQueue,
}

impl ForEachNode {
    pub(crate) fn new(label: String, filters: HashMap<TypeId, FactPredicate>) -> Self {
        Self {
            label,
            filters,
            emitted: HashMap::new(),
            queue: PropagationQueue::new(),
        }
    }

    fn passes(&self, fact: &FactRef) -> bool {
        self.filters
            .get(&fact.type_id())
            .map_or(true, |assigned| assigned(fact))
    }

    /// Fails if the fact already has a tuple here.
    pub(crate) fn ensure_absent(&self, fact: &FactRef) -> Result<(), PropagationError> {
        match self.emitted.get(&fact.id()) {
            Some(&id) => Err(duplicate(&self.label, id)),
            None => Ok(()),
        }
    }

    pub(crate) fn insert_fact(&mut self, fact: &FactRef, arena: &mut TupleArena) -> Result<(), PropagationError> {
        self.ensure_absent(fact)?;
        if self.passes(fact) {
            let id = self.queue.insert(arena, smallvec![Value::Fact(fact.clone())]);
            self.emitted.insert(fact.id(), id);
        }
        Ok(())
    }

    /// Re-evaluates the assignment filter; may insert, update or retract.
    pub(crate) fn update_fact(&mut self, fact: &FactRef, arena: &mut TupleArena) -> Result<(), PropagationError> {
        let passes = self.passes(fact);
        match (self.emitted.get(&fact.id()).copied(), passes) {
            (Some(id), true) => self.queue.update(arena, id, &self.label),
            (Some(id), false) => {
                self.emitted.remove(&fact.id());
                self.queue.retract(arena, id, &self.label)
            }
            (None, true) => {
                let id = self.queue.insert(arena, smallvec![Value::Fact(fact.clone())]);
                self.emitted.insert(fact.id(), id);
                Ok(())
            }
            (None, false) => Ok(()),
        }
    }

    pub(crate) fn retract_fact(&mut self, fact: &FactRef, arena: &mut TupleArena) -> Result<(), PropagationError> {
        match self.emitted.remove(&fact.id()) {
            Some(id) => self.queue.retract(arena, id, &self.label),
            None => Ok(()),
        }
    }

    fn not_an_entry(&self) -> PropagationError {
        PropagationError::NotAnEntryNode {
            node: self.label.clone(),
        }
    }
}

impl<Sc: Score> Node<Sc> for ForEachNode {
    fn label(&self) -> &str {
        &self.label
    }

    fn insert(&mut self, _side: Side, _tuple: TupleId, _arena: &mut TupleArena) -> Result<(), PropagationError> {
        Err(self.not_an_entry())
    }

    fn update(&mut self, _side: Side, _tuple: TupleId, _arena: &mut TupleArena) -> Result<(), PropagationError> {
        Err(self.not_an_entry())
    }

    fn retract(&mut self, _side: Side, _tuple: TupleId, _arena: &mut TupleArena) -> Result<(), PropagationError> {
        Err(self.not_an_entry())
    }

    fn queue_mut(&mut self) -> Option<&mut PropagationQueue> {
        Some(&mut self.queue)
    }

    fn stored(&self) -> usize {
        self.emitted.len()
    }

    fn as_for_each_mut(&mut self) -> Option<&mut ForEachNode> {
        Some(self)
    }
}
