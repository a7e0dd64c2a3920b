//! Incremental tuple-propagation constraint scoring for ScoreForge.
//!
//! This crate turns declarative constraint streams into a network of
//! stateful nodes and keeps a score up to date as facts come and go:
//! - Fluent stream API ([`ConstraintFactory`], [`Stream`], joiners, collectors)
//! - A compiler that lowers streams into a shareable [`ConstraintNetwork`]
//! - Per-session [`ScoreDirector`]s that propagate fact changes through it
//! - Match analysis: justifications, indictments, score explanations
//!
//! # Architecture
//!
//! Tuples are arity-generic rows of [`Value`]s living in one arena per
//! session. A fact change only touches the entry nodes; the rest of the
//! network settles layer by layer on the next query, so a batch of changes
//! costs one pass over the affected tuples.

pub mod api;
pub mod director;
pub mod error;
pub mod fact;
pub mod network;
mod node;
pub mod stream;
pub mod tuple;

#[cfg(test)]
pub(crate) mod test_utils;

// ============================================================================
// Facts and Tuples
// ============================================================================

pub use fact::{DomainSchema, FactKind, FactRef, Value};
pub use tuple::{Row, MAX_ARITY};

// ============================================================================
// Fluent Constraint Stream API
// ============================================================================

pub use stream::{
    ConstraintBuilder, ConstraintDefinition, ConstraintFactory, ConstraintProvider, Stream,
};

// ============================================================================
// Compiled Networks and Score Directors
// ============================================================================

pub use director::{ScoreDirector, ScoreDirectorFactory, WorkingSolution};
pub use network::{CompiledConstraint, ConstraintNetwork};

// ============================================================================
// Analysis and Weights
// ============================================================================

pub use api::analysis::{
    ConstraintAnalysis, ConstraintJustification, ConstraintMatch, ConstraintMatchTotal,
    Indictment, IndictmentMap, ScoreExplanation,
};
pub use api::weight_overrides::ConstraintWeightOverrides;

// ============================================================================
// Errors
// ============================================================================

pub use error::{CollectorError, ConstraintConfigError, PropagationError, ProtocolViolation, ScoringError};
