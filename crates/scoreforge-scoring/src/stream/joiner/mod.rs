// Joiners: matching conditions between a left and a right tuple.
//
// Mapping joiners (`equal`, `less_than`, ...) extract one value per side and
// compare them; the join node indexes them. `filtering` joiners see both
// tuples and run after the index lookup.
//
// # Example
//
// ```
// use std::sync::Arc;
// use scoreforge_scoring::fact::{FactRef, Value};
// use scoreforge_scoring::stream::joiner::{equal, less_than};
// use scoreforge_scoring::tuple::Row;
//
// #[derive(Debug)]
// struct Shift { employee: i64, start: i64 }
//
// let row = |s: Shift| [Value::from(FactRef::new(Arc::new(s)))];
// let a = row(Shift { employee: 1, start: 8 });
// let b = row(Shift { employee: 1, start: 16 });
//
// let same_employee = equal(|r: Row| r.fact::<Shift>(0).employee);
// let starts_before = less_than(|r: Row| r.fact::<Shift>(0).start);
// assert!(same_employee.matches(Row::new(&a), Row::new(&b)));
// assert!(starts_before.matches(Row::new(&a), Row::new(&b)));
// assert!(!starts_before.matches(Row::new(&b), Row::new(&a)));
// ```

mod comparison;
mod equal;
mod filtering;

pub use comparison::{
    greater_than, greater_than_by, greater_than_or_equal, greater_than_or_equal_by, less_than,
    less_than_by, less_than_or_equal, less_than_or_equal_by,
};
pub use equal::{equal, equal_by};
pub use filtering::filtering;

use std::cmp::Ordering;

use super::function::{BiPredicate, FunctionKey, Mapper};
use crate::fact::Value;
use crate::tuple::Row;

/// Comparison applied by a mapping joiner, as `left OP right`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinerType {
    Equal,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl JoinerType {
    pub fn matches(self, left: &Value, right: &Value) -> bool {
        let ordering = left.cmp(right);
        match self {
            JoinerType::Equal => ordering == Ordering::Equal,
            JoinerType::LessThan => ordering == Ordering::Less,
            JoinerType::LessThanOrEqual => ordering != Ordering::Greater,
            JoinerType::GreaterThan => ordering == Ordering::Greater,
            JoinerType::GreaterThanOrEqual => ordering != Ordering::Less,
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            JoinerType::Equal => "equal",
            JoinerType::LessThan => "less_than",
            JoinerType::LessThanOrEqual => "less_than_or_equal",
            JoinerType::GreaterThan => "greater_than",
            JoinerType::GreaterThanOrEqual => "greater_than_or_equal",
        }
    }
}

#[derive(Debug, Clone)]
enum JoinerKind {
    Mapping {
        joiner_type: JoinerType,
        left: Mapper,
        right: Mapper,
    },
    Filtering(BiPredicate),
}

/// A condition that a left and a right tuple must satisfy to be joined.
#[derive(Debug, Clone)]
pub struct Joiner {
    kind: JoinerKind,
}

impl Joiner {
    pub(crate) fn mapping(joiner_type: JoinerType, left: Mapper, right: Mapper) -> Self {
        Self {
            kind: JoinerKind::Mapping {
                joiner_type,
                left,
                right,
            },
        }
    }

    pub(crate) fn filter(predicate: BiPredicate) -> Self {
        Self {
            kind: JoinerKind::Filtering(predicate),
        }
    }

    /// Evaluates the joiner on its own, outside any index.
    pub fn matches(&self, left: Row<'_>, right: Row<'_>) -> bool {
        match &self.kind {
            JoinerKind::Mapping {
                joiner_type,
                left: left_mapping,
                right: right_mapping,
            } => joiner_type.matches(&left_mapping.apply(left), &right_mapping.apply(right)),
            JoinerKind::Filtering(predicate) => predicate.test(left, right),
        }
    }

    pub(crate) fn sharing_key(&self, params: &mut Vec<Value>, functions: &mut Vec<FunctionKey>) {
        match &self.kind {
            JoinerKind::Mapping {
                joiner_type,
                left,
                right,
            } => {
                params.push(Value::from(joiner_type.label()));
                functions.push(left.key());
                functions.push(right.key());
            }
            JoinerKind::Filtering(predicate) => {
                params.push(Value::from("filtering"));
                functions.push(predicate.key());
            }
        }
    }
}

/// Key under which a tuple is stored in a join or existence index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct IndexKey {
    pub(crate) equal: Vec<Value>,
    pub(crate) range: Value,
}

struct MappingPair {
    joiner_type: JoinerType,
    left: Mapper,
    right: Mapper,
}

/// Joiners of one join, split by how the index uses them.
///
/// Every `equal` joiner becomes part of the hash key. The first comparison
/// joiner becomes the ordered range key; later comparisons and all
/// `filtering` joiners are checked per candidate pair.
pub(crate) struct JoinerSet {
    equal: Vec<MappingPair>,
    range: Option<MappingPair>,
    residual: Vec<Joiner>,
}

impl JoinerSet {
    pub(crate) fn new(joiners: &[Joiner]) -> Self {
        let mut set = JoinerSet {
            equal: Vec::new(),
            range: None,
            residual: Vec::new(),
        };
        for joiner in joiners {
            match &joiner.kind {
                JoinerKind::Mapping {
                    joiner_type: JoinerType::Equal,
                    left,
                    right,
                } => set.equal.push(MappingPair {
                    joiner_type: JoinerType::Equal,
                    left: left.clone(),
                    right: right.clone(),
                }),
                JoinerKind::Mapping {
                    joiner_type,
                    left,
                    right,
                } if set.range.is_none() => {
                    set.range = Some(MappingPair {
                        joiner_type: *joiner_type,
                        left: left.clone(),
                        right: right.clone(),
                    })
                }
                _ => set.residual.push(joiner.clone()),
            }
        }
        set
    }

    pub(crate) fn range_type(&self) -> Option<JoinerType> {
        self.range.as_ref().map(|pair| pair.joiner_type)
    }

    pub(crate) fn left_key(&self, row: Row<'_>) -> IndexKey {
        IndexKey {
            equal: self.equal.iter().map(|pair| pair.left.apply(row)).collect(),
            range: self
                .range
                .as_ref()
                .map_or(Value::Null, |pair| pair.left.apply(row)),
        }
    }

    pub(crate) fn right_key(&self, row: Row<'_>) -> IndexKey {
        IndexKey {
            equal: self.equal.iter().map(|pair| pair.right.apply(row)).collect(),
            range: self
                .range
                .as_ref()
                .map_or(Value::Null, |pair| pair.right.apply(row)),
        }
    }

    pub(crate) fn has_residual(&self) -> bool {
        !self.residual.is_empty()
    }

    /// Conditions the index cannot answer.
    pub(crate) fn residual_matches(&self, left: Row<'_>, right: Row<'_>) -> bool {
        self.residual.iter().all(|joiner| joiner.matches(left, right))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().map(|v| Value::Int(*v)).collect()
    }

    #[test]
    fn test_comparison_types() {
        let (one, two) = (Value::Int(1), Value::Int(2));
        assert!(JoinerType::LessThan.matches(&one, &two));
        assert!(!JoinerType::LessThan.matches(&one, &one));
        assert!(JoinerType::LessThanOrEqual.matches(&one, &one));
        assert!(JoinerType::GreaterThan.matches(&two, &one));
        assert!(JoinerType::GreaterThanOrEqual.matches(&two, &two));
        assert!(JoinerType::Equal.matches(&Value::Null, &Value::Null));
    }

    #[test]
    fn test_joiner_set_splits_index_and_residual() {
        let joiners = vec![
            less_than(|r: Row| r.get(1).clone()),
            equal(|r: Row| r.get(0).clone()),
            greater_than(|r: Row| r.get(1).clone()),
            filtering(|l: Row, r: Row| l.get(0) == r.get(0)),
        ];
        let set = JoinerSet::new(&joiners);
        assert_eq!(set.range_type(), Some(JoinerType::LessThan));
        assert!(set.has_residual());

        let left = ints(&[7, 3]);
        let key = set.left_key(Row::new(&left));
        assert_eq!(key.equal, vec![Value::Int(7)]);
        assert_eq!(key.range, Value::Int(3));

        // greater_than on the same value can never hold alongside less_than
        let right = ints(&[7, 5]);
        assert!(!set.residual_matches(Row::new(&left), Row::new(&right)));
    }
}
