//! Constraint identification and impact direction.

use std::fmt;

use crate::score::Score;

/// Identity of a constraint: an optional package plus a name.
///
/// Full names are unique within one network.
///
/// # Example
///
/// ```
/// use scoreforge_core::ConstraintRef;
///
/// let scoped = ConstraintRef::new("shifts", "Overlap");
/// assert_eq!(scoped.full_name(), "shifts/Overlap");
/// assert_eq!(ConstraintRef::new("", "Overlap").full_name(), "Overlap");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintRef {
    /// Empty for constraints declared without a package.
    pub package: String,
    pub name: String,
}

impl ConstraintRef {
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }

    /// Splits a `package/name` string at its last slash.
    ///
    /// ```
    /// use scoreforge_core::ConstraintRef;
    ///
    /// let cr = ConstraintRef::parse("org.rooms/Room conflict");
    /// assert_eq!(cr.package, "org.rooms");
    /// assert_eq!(cr.name, "Room conflict");
    /// assert_eq!(ConstraintRef::parse("Plain").package, "");
    /// ```
    pub fn parse(full_name: &str) -> Self {
        match full_name.rsplit_once('/') {
            Some((package, name)) => Self::new(package, name),
            None => Self::new("", full_name),
        }
    }

    /// `package/name`, or just `name` without a package.
    pub fn full_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ConstraintRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.package.is_empty() {
            write!(f, "{}/", self.package)?;
        }
        f.write_str(&self.name)
    }
}

/// Direction in which a constraint's matches move the score.
///
/// # Example
///
/// ```
/// use scoreforge_core::{ImpactType, SimpleScore};
///
/// let weight = SimpleScore::of(3);
/// assert_eq!(ImpactType::Penalty.impact(weight, 2), Some(SimpleScore::of(-6)));
/// assert_eq!(ImpactType::Reward.impact(weight, 2), Some(SimpleScore::of(6)));
/// assert_eq!(ImpactType::Reward.impact(weight, i64::MAX), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImpactType {
    Penalty,
    Reward,
}

impl ImpactType {
    /// Signed score contribution of one match with the given match weight;
    /// `None` if a level overflows.
    pub fn impact<Sc: Score>(self, constraint_weight: Sc, match_weight: i64) -> Option<Sc> {
        let factor = match self {
            ImpactType::Penalty => match_weight.checked_neg()?,
            ImpactType::Reward => match_weight,
        };
        constraint_weight.checked_scale(factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::HardSoftScore;

    #[test]
    fn test_display_matches_full_name() {
        let cr = ConstraintRef::new("org.shifts", "Rest time");
        assert_eq!(cr.to_string(), cr.full_name());
        assert_eq!(ConstraintRef::parse(&cr.full_name()), cr);
    }

    #[test]
    fn test_constraint_ref_parse_keeps_slashes_in_package() {
        let cr = ConstraintRef::parse("a/b/Name");
        assert_eq!(cr.package, "a/b");
        assert_eq!(cr.name, "Name");
    }

    #[test]
    fn test_impact_sign() {
        let weight = HardSoftScore::of(1, 2);
        assert_eq!(
            ImpactType::Penalty.impact(weight, 3),
            Some(HardSoftScore::of(-3, -6))
        );
        assert_eq!(ImpactType::Reward.impact(weight, -1), Some(HardSoftScore::of(-1, -2)));
    }

    #[test]
    fn test_impact_overflow_is_none() {
        let weight = HardSoftScore::of(0, 2);
        assert_eq!(ImpactType::Penalty.impact(weight, i64::MIN), None);
        assert_eq!(ImpactType::Reward.impact(weight, i64::MAX / 2 + 1), None);
        assert_eq!(
            ImpactType::Penalty.impact(HardSoftScore::ONE_HARD, i64::MAX),
            Some(HardSoftScore::of(-i64::MAX, 0))
        );
    }
}
