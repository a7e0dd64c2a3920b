//! ScoreForge - Incremental Constraint Scoring in Rust
//!
//! Declare constraints as streams over your domain objects, compile them
//! once into a node network, and let a score director keep the score up to
//! date as facts are inserted, changed and retracted.
//!
//! # Example
//!
//! ```rust
//! use std::sync::{Arc, RwLock};
//! use scoreforge::prelude::*;
//!
//! #[derive(Debug)]
//! struct Task { worker: RwLock<Option<i64>> }
//!
//! let mut schema = DomainSchema::new();
//! schema.entity::<Task>("Task");
//!
//! let provider = |factory: &ConstraintFactory| -> Vec<ConstraintDefinition<HardSoftScore>> {
//!     vec![factory
//!         .for_each("Task")
//!         .filter(|r| r.fact::<Task>(0).worker.read().unwrap().is_none())
//!         .penalize(HardSoftScore::ONE_SOFT)
//!         .as_constraint("Unassigned task")]
//! };
//! let network = ConstraintNetwork::compile(schema, &provider, &ScoringConfig::default()).unwrap();
//! let mut director = network.build_score_director();
//!
//! let task = Arc::new(Task { worker: RwLock::new(None) });
//! director.insert_fact(&FactRef::new(task)).unwrap();
//! assert_eq!(director.calculate_score().unwrap(), HardSoftScore::of(0, -1));
//! ```

// Score types
pub use scoreforge_core::{
    ConstraintRef, HardMediumSoftScore, HardSoftScore, ImpactType, ParseableScore, Score,
    SimpleScore,
};

// Configuration
pub use scoreforge_config::{EnvironmentMode, ScoringConfig};

// Constraint stream API
pub use scoreforge_scoring::stream;

// Domain registration and networks
pub use scoreforge_scoring::{
    ConstraintDefinition, ConstraintFactory, ConstraintNetwork, ConstraintProvider, DomainSchema,
    FactRef, Row, ScoreDirector, ScoreDirectorFactory, Stream, Value, WorkingSolution,
};

// Analysis
pub use scoreforge_scoring::{
    ConstraintJustification, ConstraintMatchTotal, IndictmentMap, ScoreExplanation,
};

// Errors
pub use scoreforge_scoring::{
    ConstraintConfigError, PropagationError, ProtocolViolation, ScoringError,
};

#[cfg(feature = "console")]
pub mod console;

pub mod prelude {
    pub use super::stream::{collector, joiner};
    pub use super::{
        ConstraintDefinition, ConstraintFactory, ConstraintNetwork, DomainSchema, FactRef, Row,
        ScoreDirector, ScoreDirectorFactory, Value,
    };
    pub use super::{EnvironmentMode, ScoringConfig};
    pub use super::{HardMediumSoftScore, HardSoftScore, Score, SimpleScore};
}
