use std::sync::Arc;

use super::{mismatched, Accumulator, Collector, CollectorKey, Retraction, SharedCollector};
use crate::error::CollectorError;
use crate::fact::Value;
use crate::stream::function::Predicate;
use crate::tuple::Row;

/// Feeds `collector` only the tuples that pass `predicate`.
pub fn conditionally<F>(predicate: F, collector: SharedCollector) -> SharedCollector
where
    F: for<'a> Fn(Row<'a>) -> bool + Send + Sync + 'static,
{
    Arc::new(ConditionalCollector {
        predicate: Predicate::new(predicate),
        inner: collector,
    })
}

struct ConditionalCollector {
    predicate: Predicate,
    inner: SharedCollector,
}

impl Collector for ConditionalCollector {
    fn create_accumulator(&self) -> Box<dyn Accumulator> {
        Box::new(ConditionalAccumulator {
            predicate: self.predicate.clone(),
            inner: self.inner.create_accumulator(),
        })
    }

    fn sharing_key(&self) -> CollectorKey {
        CollectorKey {
            kind: "conditionally",
            functions: vec![self.predicate.key()],
            nested: vec![self.inner.sharing_key()],
        }
    }
}

struct ConditionalAccumulator {
    predicate: Predicate,
    inner: Box<dyn Accumulator>,
}

impl Accumulator for ConditionalAccumulator {
    fn accumulate(&mut self, row: Row<'_>) -> Result<Retraction, CollectorError> {
        if self.predicate.test(row) {
            Ok(Retraction::Inner(Box::new(self.inner.accumulate(row)?)))
        } else {
            Ok(Retraction::Skipped)
        }
    }

    fn retract(&mut self, retraction: Retraction) -> Result<(), CollectorError> {
        match retraction {
            Retraction::Inner(inner) => self.inner.retract(*inner),
            Retraction::Skipped => Ok(()),
            other => Err(mismatched("conditionally", other)),
        }
    }

    fn result(&self) -> Value {
        self.inner.result()
    }
}
