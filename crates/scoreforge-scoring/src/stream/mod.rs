//! Fluent constraint stream API.
//!
//! Streams are immutable descriptions of a tuple pipeline. Building one never
//! fails; the network compiler validates classes, arities and mappings and
//! reports a [`ConstraintConfigError`](crate::error::ConstraintConfigError).
//!
//! # Example
//!
//! ```
//! use scoreforge_core::SimpleScore;
//! use scoreforge_scoring::stream::{ConstraintFactory, joiner::equal};
//! use scoreforge_scoring::stream::collector::count;
//!
//! #[derive(Debug)]
//! struct Shift { employee: i64 }
//!
//! let factory = ConstraintFactory::with_package("scheduling");
//! let overlap = factory
//!     .for_each_unique_pair("Shift", vec![equal(|r| r.fact::<Shift>(0).employee)])
//!     .penalize(SimpleScore::of(1))
//!     .as_constraint("Overlap");
//! let load = factory
//!     .for_each("Shift")
//!     .group_by_collect(|r| r.fact::<Shift>(0).employee, vec![count()])
//!     .filter(|r| r.get(1).as_int().unwrap_or(0) > 5)
//!     .penalize(SimpleScore::of(1))
//!     .as_constraint("Overload");
//! assert_eq!(overlap.constraint_ref().full_name(), "scheduling/Overlap");
//! assert_eq!(load.constraint_ref().name, "Overload");
//! ```

pub mod collector;
mod constraint;
mod factory;
pub mod function;
pub mod joiner;
mod stream;

pub use constraint::{ConstraintBuilder, ConstraintDefinition, ConstraintProvider};
pub use factory::ConstraintFactory;
pub use function::{BiPredicate, Flattener, FunctionKey, IntMapper, Lambda, Mapper, Predicate};
pub use stream::Stream;

pub(crate) use constraint::{Indicter, Justifier};

use collector::SharedCollector;
use joiner::Joiner;

/// One operator of a stream pipeline.
pub(crate) enum StreamOp {
    ForEach {
        class: String,
        include_unassigned: bool,
    },
    UniquePair {
        class: String,
        joiners: Vec<Joiner>,
    },
    Filter(Predicate),
    Join(Vec<Joiner>),
    IfExists {
        should_exist: bool,
        joiners: Vec<Joiner>,
        // class named by `if_exists(class, ..)`; checked for assignability
        target: Option<String>,
    },
    Map {
        mappers: Vec<Mapper>,
        retain_input: bool,
    },
    FlattenLast(Flattener),
    Concat,
    GroupBy {
        keys: Vec<Mapper>,
        collectors: Vec<SharedCollector>,
    },
    Distinct,
    Complement {
        class: String,
        padding: Vec<Mapper>,
    },
}

impl StreamOp {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            StreamOp::ForEach { .. } => "for_each",
            StreamOp::UniquePair { .. } => "for_each_unique_pair",
            StreamOp::Filter(_) => "filter",
            StreamOp::Join(_) => "join",
            StreamOp::IfExists {
                should_exist: true, ..
            } => "if_exists",
            StreamOp::IfExists { .. } => "if_not_exists",
            StreamOp::Map {
                retain_input: true, ..
            } => "expand",
            StreamOp::Map { .. } => "map",
            StreamOp::FlattenLast(_) => "flatten_last",
            StreamOp::Concat => "concat",
            StreamOp::GroupBy { .. } => "group_by",
            StreamOp::Distinct => "distinct",
            StreamOp::Complement { .. } => "complement",
        }
    }
}

/// A node of the stream description tree.
pub(crate) struct StreamDef {
    pub(crate) op: StreamOp,
    pub(crate) parents: Vec<Stream>,
    pub(crate) arity: usize,
}
