use std::mem;

use super::{Elements, TupleArena, TupleId, TupleState};
use crate::error::PropagationError;

/// Dirty output tuples of one node, waiting for the next flush.
///
/// A tuple is queued at most once per cycle: it enters on insert (or on the
/// first update/retract of an `Ok` tuple) and later transitions only change
/// its state.
#[derive(Debug, Default)]
pub struct PropagationQueue {
    dirty: Vec<TupleId>,
}

impl PropagationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an output tuple in the `Creating` state.
    pub fn insert(&mut self, arena: &mut TupleArena, elements: Elements) -> TupleId {
        let id = arena.alloc(elements);
        self.dirty.push(id);
        id
    }

    /// Marks an output tuple as changed.
    pub fn update(&mut self, arena: &mut TupleArena, id: TupleId, node: &str) -> Result<(), PropagationError> {
        match arena.state(id)? {
            TupleState::Ok => {
                arena.set_state(id, TupleState::Updating)?;
                self.dirty.push(id);
                Ok(())
            }
            TupleState::Creating | TupleState::Updating => Ok(()),
            state => Err(illegal(node, id, state, "update")),
        }
    }

    /// Marks an output tuple for removal.
    pub fn retract(&mut self, arena: &mut TupleArena, id: TupleId, node: &str) -> Result<(), PropagationError> {
        match arena.state(id)? {
            TupleState::Creating => arena.set_state(id, TupleState::Aborting),
            TupleState::Updating => arena.set_state(id, TupleState::Dying),
            TupleState::Ok => {
                arena.set_state(id, TupleState::Dying)?;
                self.dirty.push(id);
                Ok(())
            }
            state => Err(illegal(node, id, state, "retract")),
        }
    }

    /// Replaces an output tuple's content and marks it changed.
    pub fn refresh(
        &mut self,
        arena: &mut TupleArena,
        id: TupleId,
        elements: Elements,
        node: &str,
    ) -> Result<(), PropagationError> {
        self.update(arena, id, node)?;
        arena.set_elements(id, elements)
    }

    pub fn is_empty(&self) -> bool {
        self.dirty.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dirty.len()
    }

    /// Drains the queue for a flush.
    pub fn take(&mut self) -> Vec<TupleId> {
        mem::take(&mut self.dirty)
    }
}

fn illegal(node: &str, tuple: TupleId, state: TupleState, operation: &'static str) -> PropagationError {
    PropagationError::IllegalTransition {
        node: node.to_string(),
        tuple,
        state,
        operation,
    }
}
