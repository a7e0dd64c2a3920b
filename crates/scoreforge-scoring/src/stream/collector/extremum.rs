//! Minimum and maximum collectors.
//!
//! Both keep every mapped value in an ordered multiset, so retracting the
//! current extremum falls back to the next one in O(log n).

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{mismatched, release, Accumulator, Collector, CollectorKey, Retraction, SharedCollector};
use crate::error::CollectorError;
use crate::fact::Value;
use crate::stream::function::Mapper;
use crate::tuple::Row;

/// Smallest mapped value of the group; `Null` when empty.
pub fn min<F, V>(mapping: F) -> SharedCollector
where
    F: for<'a> Fn(Row<'a>) -> V + Send + Sync + 'static,
    V: Into<Value>,
{
    Arc::new(ExtremumCollector {
        mapping: Mapper::new(mapping),
        largest: false,
    })
}

/// Largest mapped value of the group; `Null` when empty.
pub fn max<F, V>(mapping: F) -> SharedCollector
where
    F: for<'a> Fn(Row<'a>) -> V + Send + Sync + 'static,
    V: Into<Value>,
{
    Arc::new(ExtremumCollector {
        mapping: Mapper::new(mapping),
        largest: true,
    })
}

struct ExtremumCollector {
    mapping: Mapper,
    largest: bool,
}

impl Collector for ExtremumCollector {
    fn create_accumulator(&self) -> Box<dyn Accumulator> {
        Box::new(ExtremumAccumulator {
            mapping: self.mapping.clone(),
            largest: self.largest,
            values: BTreeMap::new(),
        })
    }

    fn sharing_key(&self) -> CollectorKey {
        let kind = if self.largest { "max" } else { "min" };
        CollectorKey::new(kind, vec![self.mapping.key()])
    }
}

struct ExtremumAccumulator {
    mapping: Mapper,
    largest: bool,
    values: BTreeMap<Value, usize>,
}

impl ExtremumAccumulator {
    fn kind(&self) -> &'static str {
        if self.largest {
            "max"
        } else {
            "min"
        }
    }
}

impl Accumulator for ExtremumAccumulator {
    fn accumulate(&mut self, row: Row<'_>) -> Result<Retraction, CollectorError> {
        let value = self.mapping.apply(row);
        *self.values.entry(value.clone()).or_insert(0) += 1;
        Ok(Retraction::Value(value))
    }

    fn retract(&mut self, retraction: Retraction) -> Result<(), CollectorError> {
        let value = match retraction {
            Retraction::Value(value) => value,
            other => return Err(mismatched(self.kind(), other)),
        };
        release(&mut self.values, value).map_err(|value| mismatched(self.kind(), Retraction::Value(value)))
    }

    fn result(&self) -> Value {
        let extremum = if self.largest {
            self.values.keys().next_back()
        } else {
            self.values.keys().next()
        };
        extremum.cloned().unwrap_or(Value::Null)
    }
}
