//! ScoreForge Core - score types and constraint identities.
//!
//! This crate provides the value types shared by every ScoreForge crate:
//! - Score types for representing solution quality
//! - Constraint identification and impact direction

pub mod constraint;
pub mod score;

pub use constraint::{ConstraintRef, ImpactType};
pub use score::{
    HardMediumSoftScore, HardSoftScore, ParseableScore, Score, ScoreLevel, ScoreParseError,
    SimpleScore,
};
