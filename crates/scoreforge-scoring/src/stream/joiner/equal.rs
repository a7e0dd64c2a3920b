// Equal joiner for matching on value equality.

use super::{Joiner, JoinerType};
use crate::fact::Value;
use crate::stream::function::Mapper;
use crate::tuple::Row;

/// Matches when both sides map to equal values.
///
/// The same mapping is applied to both sides, which is what self-joins and
/// `for_each_unique_pair` need. `Null` equals `Null`.
pub fn equal<F, V>(mapping: F) -> Joiner
where
    F: for<'a> Fn(Row<'a>) -> V + Send + Sync + 'static,
    V: Into<Value>,
{
    let mapping = Mapper::new(mapping);
    Joiner::mapping(JoinerType::Equal, mapping.clone(), mapping)
}

/// Matches when `left(a) == right(b)`, for joins across different shapes.
pub fn equal_by<L, R, V, W>(left: L, right: R) -> Joiner
where
    L: for<'a> Fn(Row<'a>) -> V + Send + Sync + 'static,
    R: for<'a> Fn(Row<'a>) -> W + Send + Sync + 'static,
    V: Into<Value>,
    W: Into<Value>,
{
    Joiner::mapping(JoinerType::Equal, Mapper::new(left), Mapper::new(right))
}
