//! Integer sum and average collectors.

use std::sync::Arc;

use super::{mismatched, Accumulator, Collector, CollectorKey, Retraction, SharedCollector};
use crate::error::CollectorError;
use crate::fact::Value;
use crate::stream::function::IntMapper;
use crate::tuple::Row;

/// Sums an integer mapping, as `Value::Int`.
///
/// A total outside the `i64` range fails the calculation instead of
/// wrapping.
///
/// # Example
///
/// ```
/// use scoreforge_scoring::stream::collector::sum;
/// use scoreforge_scoring::fact::Value;
/// use scoreforge_scoring::tuple::Row;
///
/// let collector = sum(|row: Row| row.get(0).as_int().unwrap_or(0));
/// let mut acc = collector.create_accumulator();
/// let five = [Value::Int(5)];
/// let three = [Value::Int(3)];
/// let token = acc.accumulate(Row::new(&five)).unwrap();
/// acc.accumulate(Row::new(&three)).unwrap();
/// assert_eq!(acc.result(), Value::Int(8));
/// acc.retract(token).unwrap();
/// assert_eq!(acc.result(), Value::Int(3));
/// ```
pub fn sum<F>(mapping: F) -> SharedCollector
where
    F: for<'a> Fn(Row<'a>) -> i64 + Send + Sync + 'static,
{
    Arc::new(SumCollector {
        mapping: IntMapper::new(mapping),
    })
}

/// Averages an integer mapping, as `Value::Float`; `Null` for an empty group.
pub fn average<F>(mapping: F) -> SharedCollector
where
    F: for<'a> Fn(Row<'a>) -> i64 + Send + Sync + 'static,
{
    Arc::new(AverageCollector {
        mapping: IntMapper::new(mapping),
    })
}

struct SumCollector {
    mapping: IntMapper,
}

impl Collector for SumCollector {
    fn create_accumulator(&self) -> Box<dyn Accumulator> {
        Box::new(SumAccumulator {
            mapping: self.mapping.clone(),
            total: 0,
            count: 0,
            average: false,
        })
    }

    fn sharing_key(&self) -> CollectorKey {
        CollectorKey::new("sum", vec![self.mapping.key()])
    }
}

struct AverageCollector {
    mapping: IntMapper,
}

impl Collector for AverageCollector {
    fn create_accumulator(&self) -> Box<dyn Accumulator> {
        Box::new(SumAccumulator {
            mapping: self.mapping.clone(),
            total: 0,
            count: 0,
            average: true,
        })
    }

    fn sharing_key(&self) -> CollectorKey {
        CollectorKey::new("average", vec![self.mapping.key()])
    }
}

struct SumAccumulator {
    mapping: IntMapper,
    total: i64,
    count: i64,
    average: bool,
}

impl SumAccumulator {
    fn kind(&self) -> &'static str {
        if self.average {
            "average"
        } else {
            "sum"
        }
    }

    fn overflow(&self) -> CollectorError {
        CollectorError::Overflow { collector: self.kind() }
    }
}

impl Accumulator for SumAccumulator {
    fn accumulate(&mut self, row: Row<'_>) -> Result<Retraction, CollectorError> {
        let value = self.mapping.apply(row);
        self.total = self.total.checked_add(value).ok_or_else(|| self.overflow())?;
        self.count += 1;
        Ok(Retraction::Int(value))
    }

    // the remaining members can overflow even when every prefix fit
    fn retract(&mut self, retraction: Retraction) -> Result<(), CollectorError> {
        let value = match retraction {
            Retraction::Int(value) => value,
            other => return Err(mismatched(self.kind(), other)),
        };
        self.total = self.total.checked_sub(value).ok_or_else(|| self.overflow())?;
        self.count -= 1;
        Ok(())
    }

    fn result(&self) -> Value {
        if !self.average {
            return Value::Int(self.total);
        }
        if self.count == 0 {
            Value::Null
        } else {
            Value::Float(self.total as f64 / self.count as f64)
        }
    }
}
