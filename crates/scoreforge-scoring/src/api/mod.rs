//! Constraint analysis and weight configuration.
//!
//! This module provides:
//! - Analysis types for score explanation and indictments
//! - Runtime weight override configuration

pub mod analysis;
pub mod weight_overrides;


pub use analysis::{
    ConstraintAnalysis, ConstraintJustification, ConstraintMatch, ConstraintMatchTotal,
    Indictment, IndictmentMap, ScoreExplanation,
};
pub use weight_overrides::ConstraintWeightOverrides;
