//! Tuples and their storage.
//!
//! Every tuple produced by any node lives in one [`TupleArena`] owned by the
//! score director. Nodes refer to tuples by [`TupleId`]; ids carry a
//! generation so a reused slot never aliases a dead tuple.

mod queue;
mod row;

pub use queue::PropagationQueue;
pub use row::Row;

use smallvec::SmallVec;

use crate::error::PropagationError;
use crate::fact::Value;

/// Largest tuple a stream may carry.
pub const MAX_ARITY: usize = 4;

/// Elements of one tuple.
pub type Elements = SmallVec<[Value; MAX_ARITY]>;

/// Handle to a tuple in a [`TupleArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TupleId {
    index: u32,
    generation: u32,
}

/// Lifecycle state of a tuple.
///
/// Only `Ok` content is visible downstream. `Creating`, `Updating`, `Dying`
/// and `Aborting` tuples wait in their owner's [`PropagationQueue`] until the
/// next flush; `Dead` tuples are about to be reclaimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TupleState {
    Creating,
    Ok,
    Updating,
    Dying,
    Aborting,
    Dead,
}

impl TupleState {
    /// Pending a flush.
    pub fn is_dirty(self) -> bool {
        !matches!(self, TupleState::Ok | TupleState::Dead)
    }

    /// Will be (or is) visible downstream after the next flush.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            TupleState::Creating | TupleState::Ok | TupleState::Updating
        )
    }
}

#[derive(Debug)]
pub struct Tuple {
    elements: Elements,
    state: TupleState,
}

impl Tuple {
    pub fn elements(&self) -> &[Value] {
        &self.elements
    }

    pub fn state(&self) -> TupleState {
        self.state
    }

    pub fn arity(&self) -> usize {
        self.elements.len()
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    tuple: Option<Tuple>,
}

/// Generational slab holding every live tuple of a session.
#[derive(Debug, Default)]
pub struct TupleArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl TupleArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new tuple in the `Creating` state.
    pub fn alloc(&mut self, elements: Elements) -> TupleId {
        let tuple = Tuple {
            elements,
            state: TupleState::Creating,
        };
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.tuple = Some(tuple);
            return TupleId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            tuple: Some(tuple),
        });
        TupleId {
            index,
            generation: 0,
        }
    }

    /// Reclaims a tuple's slot; its id goes stale.
    pub fn free(&mut self, id: TupleId) -> Result<(), PropagationError> {
        let slot = self.slot_mut(id)?;
        slot.tuple = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Ok(())
    }

    pub fn get(&self, id: TupleId) -> Result<&Tuple, PropagationError> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.tuple.as_ref())
            .ok_or(PropagationError::StaleTuple(id))
    }

    pub fn contains(&self, id: TupleId) -> bool {
        self.get(id).is_ok()
    }

    pub fn elements(&self, id: TupleId) -> Result<&[Value], PropagationError> {
        self.get(id).map(Tuple::elements)
    }

    pub fn row(&self, id: TupleId) -> Result<Row<'_>, PropagationError> {
        self.elements(id).map(Row::new)
    }

    pub fn state(&self, id: TupleId) -> Result<TupleState, PropagationError> {
        self.get(id).map(Tuple::state)
    }

    pub fn set_state(&mut self, id: TupleId, state: TupleState) -> Result<(), PropagationError> {
        self.tuple_mut(id)?.state = state;
        Ok(())
    }

    /// Replaces a tuple's content without touching its state.
    pub fn set_elements(&mut self, id: TupleId, elements: Elements) -> Result<(), PropagationError> {
        self.tuple_mut(id)?.elements = elements;
        Ok(())
    }

    /// Number of tuples not yet reclaimed.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live tuples, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (TupleId, &Tuple)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.tuple.as_ref().map(|tuple| {
                (
                    TupleId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    tuple,
                )
            })
        })
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.live = 0;
    }

    fn slot_mut(&mut self, id: TupleId) -> Result<&mut Slot, PropagationError> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation && slot.tuple.is_some())
            .ok_or(PropagationError::StaleTuple(id))
    }

    fn tuple_mut(&mut self, id: TupleId) -> Result<&mut Tuple, PropagationError> {
        self.slot_mut(id)?
            .tuple
            .as_mut()
            .ok_or(PropagationError::StaleTuple(id))
    }
}
