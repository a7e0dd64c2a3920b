// Collectors for grouping and aggregating tuples.
//
// A collector creates one accumulator per group. Each `accumulate` call
// returns a `Retraction` token; handing that token back to `retract` undoes
// exactly that contribution, so the group node never needs to replay its
// members.

mod collection;
mod conditional;
mod count;
mod extremum;
mod sum;


use std::collections::BTreeMap;
use std::sync::Arc;

pub use collection::{to_list, to_set};
pub use conditional::conditionally;
pub use count::{count, count_distinct};
pub use extremum::{max, min};
pub use sum::{average, sum};

use super::function::FunctionKey;
use crate::error::CollectorError;
use crate::fact::Value;
use crate::tuple::Row;

/// Shared handle to a collector definition.
pub type SharedCollector = Arc<dyn Collector>;

/// Factory of per-group accumulators.
pub trait Collector: Send + Sync {
    fn create_accumulator(&self) -> Box<dyn Accumulator>;

    /// Structural identity used by node sharing.
    fn sharing_key(&self) -> CollectorKey;
}

/// Running aggregate of one group.
pub trait Accumulator: Send {
    /// Adds a tuple and returns the token that undoes it.
    fn accumulate(&mut self, row: Row<'_>) -> Result<Retraction, CollectorError>;

    /// Removes a contribution previously returned by `accumulate`.
    fn retract(&mut self, retraction: Retraction) -> Result<(), CollectorError>;

    /// Current aggregate value.
    fn result(&self) -> Value;
}

/// Undo token for one accumulated tuple.
#[derive(Debug)]
pub enum Retraction {
    /// Nothing was recorded.
    Skipped,
    /// One occurrence was counted.
    Counted,
    /// An integer was added to a running total.
    Int(i64),
    /// A value was added to a multiset.
    Value(Value),
    /// An entry was appended under a sequence number.
    Entry(u64),
    /// Token of a wrapped collector.
    Inner(Box<Retraction>),
}

/// Drops one occurrence of `value` from a counted multiset, handing the
/// value back if it is not there.
fn release(counts: &mut BTreeMap<Value, usize>, value: Value) -> Result<(), Value> {
    let Some(count) = counts.get_mut(&value) else {
        return Err(value);
    };
    *count -= 1;
    if *count == 0 {
        counts.remove(&value);
    }
    Ok(())
}

fn mismatched(collector: &'static str, retraction: Retraction) -> CollectorError {
    CollectorError::MismatchedRetraction {
        collector,
        retraction: format!("{retraction:?}"),
    }
}

/// Sharing identity of a collector.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectorKey {
    pub kind: &'static str,
    pub functions: Vec<FunctionKey>,
    pub nested: Vec<CollectorKey>,
}

impl CollectorKey {
    pub fn new(kind: &'static str, functions: Vec<FunctionKey>) -> Self {
        Self {
            kind,
            functions,
            nested: Vec::new(),
        }
    }
}
