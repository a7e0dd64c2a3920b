//! Error taxonomy for the scoring engine.
//!
//! Three families, none of which is ever recovered internally:
//! - [`ConstraintConfigError`]: the constraint definitions or the domain
//!   schema are malformed; raised while compiling a network.
//! - [`ProtocolViolation`]: the caller broke the fact lifecycle contract.
//! - [`PropagationError`]: the engine reached an impossible state, or an
//!   aggregate no longer fits in an `i64`.

use scoreforge_core::ScoreParseError;
use thiserror::Error;

use crate::tuple::{TupleId, TupleState};

/// Raised while compiling constraints into a node network.
#[derive(Debug, Error)]
pub enum ConstraintConfigError {
    #[error("Constraint ({constraint}) configures more than one justification mapping")]
    DuplicateJustificationMapping { constraint: String },

    #[error("Constraint ({constraint}) configures more than one indictment mapping")]
    DuplicateIndictmentMapping { constraint: String },

    #[error("Constraint ({0}) is defined more than once")]
    DuplicateConstraint(String),

    #[error("Unknown fact class ({0})")]
    UnknownClass(String),

    #[error("Fact class ({0}) is registered more than once")]
    DuplicateClass(String),

    #[error("Type ({type_name}) is registered as both ({first}) and ({second})")]
    DuplicateType {
        type_name: &'static str,
        first: String,
        second: String,
    },

    #[error("Fact class ({class}) extends unknown class ({parent})")]
    UnknownSuperclass { class: String, parent: String },

    #[error("Fact class ({0}) is its own supertype")]
    SupertypeCycle(String),

    #[error(
        "Existence target ({class}) is not assignable from any registered concrete class; \
         the existence check could never match"
    )]
    UnrelatedExistsTarget { class: String },

    #[error("{operation} would produce a tuple of arity {arity}, but only arities 1 to 4 are supported")]
    ArityOverflow {
        operation: &'static str,
        arity: usize,
    },

    #[error("{operation} expects {expected} element(s), got {actual}")]
    ArityMismatch {
        operation: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("groupBy needs at least one group key or collector")]
    EmptyGroupBy,

    #[error("Fact class ({0}) has no planning id, which forEachUniquePair requires")]
    MissingPlanningId(String),

    #[error("Weight override for constraint ({constraint}) is invalid: {source}")]
    InvalidWeight {
        constraint: String,
        #[source]
        source: ScoreParseError,
    },

    #[error("Weight override ({0}) does not name any constraint")]
    UnknownWeightOverride(String),
}

/// Raised when a caller breaks the fact lifecycle contract.
#[derive(Debug, Error)]
pub enum ProtocolViolation {
    #[error("Fact ({fact}) is already tracked; it cannot be inserted again")]
    AlreadyTracked { fact: String },

    #[error("Fact ({fact}) is not tracked; call ({call}) requires an inserted fact")]
    NotTracked { fact: String, call: &'static str },

    #[error("Type ({type_name}) is not registered in the domain schema")]
    UnregisteredType { type_name: &'static str },

    #[error("Call ({call}) on fact ({fact}) has no matching before call")]
    UnpairedAfter { fact: String, call: &'static str },

    #[error("Call ({call}) on fact ({fact}) while its ({pending}) mutation is still open")]
    MutationInProgress {
        fact: String,
        pending: String,
        call: &'static str,
    },

    #[error("Call ({call}) on fact ({fact}) names variable ({actual}) but ({expected}) was announced")]
    VariableMismatch {
        fact: String,
        call: &'static str,
        expected: String,
        actual: String,
    },

    #[error("Call ({call}) is only valid for {expected} facts, but ({fact}) is not one")]
    WrongFactKind {
        fact: String,
        call: &'static str,
        expected: &'static str,
    },

    #[error("{count} fact mutation(s) are still open; finish them before querying the score")]
    OpenMutations { count: usize },

    #[error("Constraint match tracking is disabled; enable constraint_match_enabled to inspect matches")]
    MatchTrackingDisabled,
}

/// Raised by a collector's accumulator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectorError {
    #[error("Collector ({collector}) overflowed i64")]
    Overflow { collector: &'static str },

    #[error("Impossible state: collector ({collector}) was handed a retraction ({retraction}) it never issued")]
    MismatchedRetraction { collector: &'static str, retraction: String },
}

/// Raised when the propagation network reaches an impossible state.
///
/// Correct operator implementations never produce these, except for the
/// overflow variants, which depend on the magnitudes of the data.
#[derive(Debug, Error)]
pub enum PropagationError {
    #[error("Impossible state: node ({node}) cannot {operation} tuple ({tuple:?}) in state ({state:?})")]
    IllegalTransition {
        node: String,
        tuple: TupleId,
        state: TupleState,
        operation: &'static str,
    },

    #[error("Impossible state: node ({node}) received tuple ({tuple:?}) it never stored")]
    UnknownTuple { node: String, tuple: TupleId },

    #[error("Impossible state: node ({node}) received tuple ({tuple:?}) twice")]
    DuplicateTuple { node: String, tuple: TupleId },

    #[error("Impossible state: tuple ({0:?}) is no longer alive")]
    StaleTuple(TupleId),

    #[error("Impossible state: node ({node}) has no group for key ({key})")]
    MissingGroup { node: String, key: String },

    #[error("Impossible state: node ({node}) is not an entry node")]
    NotAnEntryNode { node: String },

    #[error("Impossible state: tuple ({tuple:?}) is still in state ({state:?}) after a calculation cycle")]
    UnsettledTuple { tuple: TupleId, state: TupleState },

    #[error("Impossible state: node ({node}) still holds {count} tuple(s) with no fact tracked")]
    LeakedTuples { node: String, count: usize },

    #[error("Impossible state: node ({node}) has {count} unflushed tuple(s) after a calculation cycle")]
    UnflushedQueue { node: String, count: usize },

    #[error("Node ({node}) failed to aggregate: {source}")]
    Collector {
        node: String,
        #[source]
        source: CollectorError,
    },

    #[error("Score of constraint ({constraint}) overflowed i64")]
    ScoreOverflow { constraint: String },
}

/// Any failure surfaced by a score director or the network compiler.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error(transparent)]
    Config(#[from] ConstraintConfigError),

    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),

    #[error(transparent)]
    Propagation(#[from] PropagationError),

    #[error(
        "Score corruption: the incremental score ({actual}) differs from the score after a full rebuild ({expected})"
    )]
    ScoreCorruption { expected: String, actual: String },
}

/// Result type alias for scoring operations.
pub type Result<T, E = ScoringError> = std::result::Result<T, E>;
