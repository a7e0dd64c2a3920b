//! Comparison joiners: `left(a) OP right(b)` over ordered values.
//!
//! The first comparison joiner of a join is answered by an ordered index;
//! any further ones are checked pair by pair.

use super::{Joiner, JoinerType};
use crate::fact::Value;
use crate::stream::function::Mapper;
use crate::tuple::Row;

macro_rules! comparison_joiner {
    ($(#[$doc:meta])* $same:ident, $by:ident, $joiner_type:expr) => {
        $(#[$doc])*
        ///
        /// Applies the same mapping to both sides.
        pub fn $same<F, V>(mapping: F) -> Joiner
        where
            F: for<'a> Fn(Row<'a>) -> V + Send + Sync + 'static,
            V: Into<Value>,
        {
            let mapping = Mapper::new(mapping);
            Joiner::mapping($joiner_type, mapping.clone(), mapping)
        }

        $(#[$doc])*
        pub fn $by<L, R, V, W>(left: L, right: R) -> Joiner
        where
            L: for<'a> Fn(Row<'a>) -> V + Send + Sync + 'static,
            R: for<'a> Fn(Row<'a>) -> W + Send + Sync + 'static,
            V: Into<Value>,
            W: Into<Value>,
        {
            Joiner::mapping($joiner_type, Mapper::new(left), Mapper::new(right))
        }
    };
}

comparison_joiner!(
    /// Matches when the left value is strictly less than the right value.
    less_than,
    less_than_by,
    JoinerType::LessThan
);
comparison_joiner!(
    /// Matches when the left value is less than or equal to the right value.
    less_than_or_equal,
    less_than_or_equal_by,
    JoinerType::LessThanOrEqual
);
comparison_joiner!(
    /// Matches when the left value is strictly greater than the right value.
    greater_than,
    greater_than_by,
    JoinerType::GreaterThan
);
comparison_joiner!(
    /// Matches when the left value is greater than or equal to the right value.
    greater_than_or_equal,
    greater_than_or_equal_by,
    JoinerType::GreaterThanOrEqual
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_less_than_by_maps_each_side() {
        let joiner = less_than_by(|l: Row| l.get(0).clone(), |r: Row| r.get(1).clone());
        let left = [Value::Int(5)];
        let right = [Value::Int(0), Value::Int(6)];
        assert!(joiner.matches(Row::new(&left), Row::new(&right)));
        let right = [Value::Int(9), Value::Int(5)];
        assert!(!joiner.matches(Row::new(&left), Row::new(&right)));
    }

    #[test]
    fn test_greater_than_or_equal_accepts_ties() {
        let joiner = greater_than_or_equal(|r: Row| r.get(0).clone());
        let a = [Value::Int(5)];
        assert!(joiner.matches(Row::new(&a), Row::new(&a)));
    }
}
