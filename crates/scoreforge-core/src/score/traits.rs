//! The `Score` trait and its text format.

use std::fmt::{self, Debug, Display};
use std::hash::Hash;
use std::ops::{Add, Neg, Sub};

use thiserror::Error;

/// Priority class of one score level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreLevel {
    Hard,
    Medium,
    Soft,
}

/// A fixed number of `i64` levels, compared highest priority first.
///
/// Running totals are kept by adding and subtracting per-match impacts, so
/// every operation must be exact: `a + b - b == a` for all scores.
pub trait Score:
    Copy
    + Debug
    + Display
    + Default
    + Send
    + Sync
    + Eq
    + Hash
    + Ord
    + Add<Output = Self>
    + Sub<Output = Self>
    + Neg<Output = Self>
    + 'static
{
    /// Priority class of each level, highest priority first.
    const LEVELS: &'static [ScoreLevel];

    /// Text suffix of each level, e.g. `"hard"` in `-1hard/0soft`.
    const SUFFIXES: &'static [&'static str];

    fn to_level_numbers(&self) -> Vec<i64>;

    /// Builds a score from one number per level; `None` on a length mismatch.
    fn from_level_numbers(levels: &[i64]) -> Option<Self>;

    /// Multiplies every level by an integer match weight; `None` if a level
    /// overflows.
    fn checked_scale(&self, factor: i64) -> Option<Self>;

    /// Level-wise sum; `None` if a level overflows.
    fn checked_add(&self, other: &Self) -> Option<Self>;

    /// Level-wise difference; `None` if a level overflows.
    fn checked_sub(&self, other: &Self) -> Option<Self>;

    fn abs(&self) -> Self;

    fn zero() -> Self {
        Self::default()
    }

    fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    fn level_label(index: usize) -> Option<ScoreLevel> {
        Self::LEVELS.get(index).copied()
    }

    /// Every hard level is non-negative. Scores without a hard level are
    /// feasible when all their levels are non-negative.
    fn is_feasible(&self) -> bool {
        let levels = self.to_level_numbers();
        let has_hard = Self::LEVELS.contains(&ScoreLevel::Hard);
        levels
            .iter()
            .zip(Self::LEVELS)
            .filter(|(_, label)| !has_hard || **label == ScoreLevel::Hard)
            .all(|(level, _)| *level >= 0)
    }

    /// Any hard level is non-zero.
    fn has_hard_component(&self) -> bool {
        self.to_level_numbers()
            .iter()
            .zip(Self::LEVELS)
            .any(|(level, label)| *level != 0 && *label == ScoreLevel::Hard)
    }
}

/// Scores that can be read from configuration strings such as
/// `"0hard/-5soft"`.
pub trait ParseableScore: Score {
    fn parse(text: &str) -> Result<Self, ScoreParseError> {
        let text = text.trim();
        let parts: Vec<&str> = text.split('/').map(str::trim).collect();
        if parts.len() != Self::SUFFIXES.len() {
            return Err(ScoreParseError::new(format!(
                "'{}' has {} levels, expected {}",
                text,
                parts.len(),
                Self::SUFFIXES.len()
            )));
        }

        let mut levels = Vec::with_capacity(parts.len());
        for (part, suffix) in parts.iter().zip(Self::SUFFIXES) {
            let number = part.strip_suffix(suffix).ok_or_else(|| {
                ScoreParseError::new(format!("level '{}' must end with '{}'", part, suffix))
            })?;
            let value = number
                .parse::<i64>()
                .map_err(|e| ScoreParseError::new(format!("level '{}': {}", part, e)))?;
            levels.push(value);
        }
        Self::from_level_numbers(&levels)
            .ok_or_else(|| ScoreParseError::new(format!("'{}' does not fit the score type", text)))
    }

    /// The form accepted by [`ParseableScore::parse`].
    fn to_string_repr(&self) -> String {
        self.to_string()
    }
}

/// Error when parsing a score from string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Score parse error: {message}")]
pub struct ScoreParseError {
    pub message: String,
}

impl ScoreParseError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Writes `levels` joined by `/`, each followed by its suffix.
pub(crate) fn write_levels<Sc: Score>(score: &Sc, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, (level, suffix)) in score.to_level_numbers().iter().zip(Sc::SUFFIXES).enumerate() {
        if i > 0 {
            f.write_str("/")?;
        }
        write!(f, "{}{}", level, suffix)?;
    }
    Ok(())
}
