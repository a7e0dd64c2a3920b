use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;

use super::Side;
use crate::fact::Value;
use crate::stream::joiner::{IndexKey, JoinerType};
use crate::tuple::TupleId;

/// Tuples of one join side, bucketed by their equal-joiner values and
/// ordered inside each bucket by their comparison-joiner value.
#[derive(Debug, Default)]
pub(crate) struct Indexer {
    buckets: HashMap<Vec<Value>, BTreeMap<Value, BTreeSet<TupleId>>>,
}

impl Indexer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn put(&mut self, key: &IndexKey, tuple: TupleId) {
        self.buckets
            .entry(key.equal.clone())
            .or_default()
            .entry(key.range.clone())
            .or_default()
            .insert(tuple);
    }

    /// Removes a tuple, dropping emptied buckets. Returns whether it was present.
    pub(crate) fn remove(&mut self, key: &IndexKey, tuple: TupleId) -> bool {
        let Some(bucket) = self.buckets.get_mut(&key.equal) else {
            return false;
        };
        let Some(tuples) = bucket.get_mut(&key.range) else {
            return false;
        };
        let removed = tuples.remove(&tuple);
        if tuples.is_empty() {
            bucket.remove(&key.range);
        }
        if bucket.is_empty() {
            self.buckets.remove(&key.equal);
        }
        removed
    }

    /// Tuples of this index that match a tuple with `key` arriving on the
    /// opposite side.
    pub(crate) fn lookup(&self, key: &IndexKey, range_type: Option<JoinerType>, from: Side) -> Vec<TupleId> {
        let Some(bucket) = self.buckets.get(&key.equal) else {
            return Vec::new();
        };
        bucket
            .range(bounds(range_type, from, &key.range))
            .flat_map(|(_, tuples)| tuples.iter().copied())
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.buckets
            .values()
            .flat_map(BTreeMap::values)
            .map(BTreeSet::len)
            .sum()
    }
}

// Joiners read `left OP right`. A left tuple looks up the right index for
// values on the far side of OP; a right tuple looks up the mirror image.
fn bounds(range_type: Option<JoinerType>, from: Side, value: &Value) -> (Bound<&Value>, Bound<&Value>) {
    use Bound::{Excluded, Included, Unbounded};
    match (range_type, from) {
        (None | Some(JoinerType::Equal), _) => (Unbounded, Unbounded),
        (Some(JoinerType::LessThan), Side::Left) => (Excluded(value), Unbounded),
        (Some(JoinerType::LessThanOrEqual), Side::Left) => (Included(value), Unbounded),
        (Some(JoinerType::GreaterThan), Side::Left) => (Unbounded, Excluded(value)),
        (Some(JoinerType::GreaterThanOrEqual), Side::Left) => (Unbounded, Included(value)),
        (Some(JoinerType::LessThan), Side::Right) => (Unbounded, Excluded(value)),
        (Some(JoinerType::LessThanOrEqual), Side::Right) => (Unbounded, Included(value)),
        (Some(JoinerType::GreaterThan), Side::Right) => (Excluded(value), Unbounded),
        (Some(JoinerType::GreaterThanOrEqual), Side::Right) => (Included(value), Unbounded),
    }
}
