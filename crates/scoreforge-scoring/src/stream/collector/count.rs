//! Counting collectors.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{mismatched, release, Accumulator, Collector, CollectorKey, Retraction, SharedCollector};
use crate::error::CollectorError;
use crate::fact::Value;
use crate::stream::function::Mapper;
use crate::tuple::Row;

/// Counts the tuples in a group, as `Value::Int`.
///
/// # Example
///
/// ```
/// use scoreforge_scoring::stream::collector::count;
/// use scoreforge_scoring::fact::Value;
/// use scoreforge_scoring::tuple::Row;
///
/// let collector = count();
/// let mut acc = collector.create_accumulator();
/// let row = [Value::Int(1)];
/// let first = acc.accumulate(Row::new(&row)).unwrap();
/// acc.accumulate(Row::new(&row)).unwrap();
/// assert_eq!(acc.result(), Value::Int(2));
///
/// acc.retract(first).unwrap();
/// assert_eq!(acc.result(), Value::Int(1));
/// ```
pub fn count() -> SharedCollector {
    Arc::new(CountCollector)
}

/// Counts distinct mapped values, as `Value::Int`.
pub fn count_distinct<F, V>(mapping: F) -> SharedCollector
where
    F: for<'a> Fn(Row<'a>) -> V + Send + Sync + 'static,
    V: Into<Value>,
{
    Arc::new(CountDistinctCollector {
        mapping: Mapper::new(mapping),
    })
}

struct CountCollector;

impl Collector for CountCollector {
    fn create_accumulator(&self) -> Box<dyn Accumulator> {
        Box::new(CountAccumulator { count: 0 })
    }

    fn sharing_key(&self) -> CollectorKey {
        CollectorKey::new("count", Vec::new())
    }
}

struct CountAccumulator {
    count: i64,
}

impl Accumulator for CountAccumulator {
    fn accumulate(&mut self, _row: Row<'_>) -> Result<Retraction, CollectorError> {
        self.count += 1;
        Ok(Retraction::Counted)
    }

    fn retract(&mut self, retraction: Retraction) -> Result<(), CollectorError> {
        match retraction {
            Retraction::Counted => {
                self.count -= 1;
                Ok(())
            }
            other => Err(mismatched("count", other)),
        }
    }

    fn result(&self) -> Value {
        Value::Int(self.count)
    }
}

struct CountDistinctCollector {
    mapping: Mapper,
}

impl Collector for CountDistinctCollector {
    fn create_accumulator(&self) -> Box<dyn Accumulator> {
        Box::new(CountDistinctAccumulator {
            mapping: self.mapping.clone(),
            counts: BTreeMap::new(),
        })
    }

    fn sharing_key(&self) -> CollectorKey {
        CollectorKey::new("count_distinct", vec![self.mapping.key()])
    }
}

struct CountDistinctAccumulator {
    mapping: Mapper,
    counts: BTreeMap<Value, usize>,
}

impl Accumulator for CountDistinctAccumulator {
    fn accumulate(&mut self, row: Row<'_>) -> Result<Retraction, CollectorError> {
        let value = self.mapping.apply(row);
        *self.counts.entry(value.clone()).or_insert(0) += 1;
        Ok(Retraction::Value(value))
    }

    fn retract(&mut self, retraction: Retraction) -> Result<(), CollectorError> {
        let value = match retraction {
            Retraction::Value(value) => value,
            other => return Err(mismatched("count_distinct", other)),
        };
        release(&mut self.counts, value).map_err(|value| mismatched("count_distinct", Retraction::Value(value)))
    }

    fn result(&self) -> Value {
        Value::Int(self.counts.len() as i64)
    }
}
