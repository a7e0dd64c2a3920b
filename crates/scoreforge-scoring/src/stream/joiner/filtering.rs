// Filtering joiner for arbitrary predicates over both tuples.

use super::Joiner;
use crate::stream::function::BiPredicate;
use crate::tuple::Row;

/// Matches when `predicate(left, right)` holds.
///
/// Never indexed: it is evaluated for every candidate pair that passed the
/// indexed joiners.
pub fn filtering<F>(predicate: F) -> Joiner
where
    F: for<'a, 'b> Fn(Row<'a>, Row<'b>) -> bool + Send + Sync + 'static,
{
    Joiner::filter(BiPredicate::new(predicate))
}
