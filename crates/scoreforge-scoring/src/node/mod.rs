//! Stateful operators of a compiled network.
//!
//! A node receives insert, update and retract calls for its parents' tuples
//! while those parents flush, and records its own output changes in a
//! [`PropagationQueue`]. The score director flushes that queue when the
//! node's layer comes up; children therefore only ever observe `Ok` content.
//!
//! Every operator is arity-generic: tuples are slices of [`Value`](crate::fact::Value)
//! and the user functions see them through [`Row`](crate::tuple::Row).

mod concat;
mod filter;
mod flatten;
mod for_each;
mod group;
mod if_exists;
mod index;
mod join;
mod map;
mod scorer;

pub(crate) use concat::ConcatNode;
pub(crate) use filter::FilterNode;
pub(crate) use flatten::FlattenLastNode;
pub(crate) use for_each::ForEachNode;
pub(crate) use group::{GroupKeys, GroupNode};
pub(crate) use if_exists::{ExistenceMode, IfExistsNode};
pub(crate) use join::JoinNode;
pub(crate) use map::MapNode;
pub(crate) use scorer::{ScorerConfig, ScorerNode};

use scoreforge_core::Score;

use crate::error::PropagationError;
use crate::tuple::{Elements, PropagationQueue, TupleArena, TupleId};

/// Position of a node in its network.
pub(crate) type NodeId = usize;

/// Which input of a two-parent node a tuple arrives on.
///
/// Single-parent nodes only ever see `Left`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum Side {
    Left,
    Right,
}

pub(crate) trait Node<Sc: Score>: Send {
    /// Name used in errors and traces, e.g. `join#7`.
    fn label(&self) -> &str;

    fn insert(&mut self, side: Side, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError>;

    fn update(&mut self, side: Side, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError>;

    fn retract(&mut self, side: Side, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError>;

    /// Runs once per cycle, right before the node's queue is flushed.
    fn before_flush(&mut self, _arena: &mut TupleArena) -> Result<(), PropagationError> {
        Ok(())
    }

    /// Output queue; `None` for terminal nodes.
    fn queue_mut(&mut self) -> Option<&mut PropagationQueue>;

    /// Number of input tuples held in the node's stores.
    fn stored(&self) -> usize;

    fn as_for_each_mut(&mut self) -> Option<&mut ForEachNode> {
        None
    }

    fn as_scorer(&self) -> Option<&ScorerNode<Sc>> {
        None
    }
}

/// Copies a tuple's elements out of the arena.
pub(crate) fn elements_of(arena: &TupleArena, tuple: TupleId) -> Result<Elements, PropagationError> {
    Ok(arena.elements(tuple)?.iter().cloned().collect())
}

pub(crate) fn unknown(node: &str, tuple: TupleId) -> PropagationError {
    PropagationError::UnknownTuple {
        node: node.to_string(),
        tuple,
    }
}

pub(crate) fn duplicate(node: &str, tuple: TupleId) -> PropagationError {
    PropagationError::DuplicateTuple {
        node: node.to_string(),
        tuple,
    }
}
