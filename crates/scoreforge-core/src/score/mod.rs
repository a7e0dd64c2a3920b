//! Score types for representing solution quality.
//!
//! All score types are immutable `Copy` values with level-wise arithmetic.
//! Constraint impacts are computed by scaling a constraint weight with an
//! integer match weight, so running totals stay exact under retraction.

#[macro_use]
mod macros;

mod hard_medium_soft;
mod hard_soft;
mod simple;
pub(crate) mod traits;

#[cfg(test)]
mod tests;

pub use hard_medium_soft::HardMediumSoftScore;
pub use hard_soft::HardSoftScore;
pub use simple::SimpleScore;
pub use traits::{ParseableScore, Score, ScoreLevel, ScoreParseError};
