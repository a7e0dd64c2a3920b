//! Set and list collectors.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::{mismatched, release, Accumulator, Collector, CollectorKey, Retraction, SharedCollector};
use crate::error::CollectorError;
use crate::fact::Value;
use crate::stream::function::Mapper;
use crate::tuple::Row;

/// Distinct mapped values, as `Value::Set`.
///
/// Values are reference counted: a value leaves the set only when every
/// tuple that contributed it has been retracted.
pub fn to_set<F, V>(mapping: F) -> SharedCollector
where
    F: for<'a> Fn(Row<'a>) -> V + Send + Sync + 'static,
    V: Into<Value>,
{
    Arc::new(SetCollector {
        mapping: Mapper::new(mapping),
    })
}

/// Mapped values in accumulation order, duplicates kept, as `Value::List`.
pub fn to_list<F, V>(mapping: F) -> SharedCollector
where
    F: for<'a> Fn(Row<'a>) -> V + Send + Sync + 'static,
    V: Into<Value>,
{
    Arc::new(ListCollector {
        mapping: Mapper::new(mapping),
    })
}

struct SetCollector {
    mapping: Mapper,
}

impl Collector for SetCollector {
    fn create_accumulator(&self) -> Box<dyn Accumulator> {
        Box::new(SetAccumulator {
            mapping: self.mapping.clone(),
            counts: BTreeMap::new(),
        })
    }

    fn sharing_key(&self) -> CollectorKey {
        CollectorKey::new("to_set", vec![self.mapping.key()])
    }
}

struct SetAccumulator {
    mapping: Mapper,
    counts: BTreeMap<Value, usize>,
}

impl Accumulator for SetAccumulator {
    fn accumulate(&mut self, row: Row<'_>) -> Result<Retraction, CollectorError> {
        let value = self.mapping.apply(row);
        *self.counts.entry(value.clone()).or_insert(0) += 1;
        Ok(Retraction::Value(value))
    }

    fn retract(&mut self, retraction: Retraction) -> Result<(), CollectorError> {
        let value = match retraction {
            Retraction::Value(value) => value,
            other => return Err(mismatched("to_set", other)),
        };
        release(&mut self.counts, value).map_err(|value| mismatched("to_set", Retraction::Value(value)))
    }

    fn result(&self) -> Value {
        Value::from(self.counts.keys().cloned().collect::<BTreeSet<Value>>())
    }
}

struct ListCollector {
    mapping: Mapper,
}

impl Collector for ListCollector {
    fn create_accumulator(&self) -> Box<dyn Accumulator> {
        Box::new(ListAccumulator {
            mapping: self.mapping.clone(),
            entries: BTreeMap::new(),
            next: 0,
        })
    }

    fn sharing_key(&self) -> CollectorKey {
        CollectorKey::new("to_list", vec![self.mapping.key()])
    }
}

struct ListAccumulator {
    mapping: Mapper,
    entries: BTreeMap<u64, Value>,
    next: u64,
}

impl Accumulator for ListAccumulator {
    fn accumulate(&mut self, row: Row<'_>) -> Result<Retraction, CollectorError> {
        let sequence = self.next;
        self.next += 1;
        self.entries.insert(sequence, self.mapping.apply(row));
        Ok(Retraction::Entry(sequence))
    }

    fn retract(&mut self, retraction: Retraction) -> Result<(), CollectorError> {
        match retraction {
            Retraction::Entry(sequence) if self.entries.remove(&sequence).is_some() => Ok(()),
            other => Err(mismatched("to_list", other)),
        }
    }

    fn result(&self) -> Value {
        Value::list(self.entries.values().cloned())
    }
}
