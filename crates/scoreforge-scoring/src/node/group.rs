use std::collections::HashMap;

use scoreforge_core::Score;

use super::{duplicate, unknown, Node, Side};
use crate::error::{CollectorError, PropagationError};
use crate::fact::Value;
use crate::stream::collector::{Accumulator, Retraction, SharedCollector};
use crate::stream::Mapper;
use crate::tuple::{Elements, PropagationQueue, Row, TupleArena, TupleId};

/// How a group node derives the group key of a tuple.
#[derive(Clone)]
pub(crate) enum GroupKeys {
    Mappers(Vec<Mapper>),
    /// The whole tuple is the key; used for `distinct`.
    Identity,
}

impl GroupKeys {
    fn key(&self, row: Row<'_>) -> Vec<Value> {
        match self {
            GroupKeys::Mappers(mappers) => mappers.iter().map(|m| m.apply(row)).collect(),
            GroupKeys::Identity => row.values().to_vec(),
        }
    }
}

struct Group {
    out: TupleId,
    members: usize,
    accumulators: Vec<Box<dyn Accumulator>>,
    dirty: bool,
}

struct Member {
    key: Vec<Value>,
    retractions: Vec<Retraction>,
}

/// Groups tuples by key and maintains one accumulator per collector and
/// group.
///
/// The output of a group is `key ++ results`. It is created with the first
/// member and retracted with the last; collector results are written once
/// per cycle, just before the node flushes.
pub(crate) struct GroupNode {
    label: String,
    keys: GroupKeys,
    collectors: Vec<SharedCollector>,
    groups: HashMap<Vec<Value>, Group>,
    members: HashMap<TupleId, Member>,
    dirty: Vec<Vec<Value>>,
    queue: PropagationQueue,
}

impl GroupNode {
    pub(crate) fn new(label: String, keys: GroupKeys, collectors: Vec<SharedCollector>) -> Self {
        Self {
            label,
            keys,
            collectors,
            groups: HashMap::new(),
            members: HashMap::new(),
            dirty: Vec::new(),
            queue: PropagationQueue::new(),
        }
    }

    fn join_group(&mut self, tuple: TupleId, key: Vec<Value>, arena: &mut TupleArena) -> Result<(), PropagationError> {
        if !self.groups.contains_key(&key) {
            // results are filled in by before_flush
            let mut placeholder: Elements = key.iter().cloned().collect();
            placeholder.extend(self.collectors.iter().map(|_| Value::Null));
            let out = self.queue.insert(arena, placeholder);
            let accumulators = self
                .collectors
                .iter()
                .map(|collector| collector.create_accumulator())
                .collect();
            self.groups.insert(
                key.clone(),
                Group {
                    out,
                    members: 0,
                    accumulators,
                    dirty: false,
                },
            );
        }
        let group = self
            .groups
            .get_mut(&key)
            .ok_or_else(|| missing_group(&self.label, &key))?;
        let row = arena.row(tuple)?;
        let retractions = group
            .accumulators
            .iter_mut()
            .map(|accumulator| accumulator.accumulate(row))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| collector_failed(&self.label, source))?;
        group.members += 1;
        mark_dirty(group, &key, &mut self.dirty);
        self.members.insert(tuple, Member { key, retractions });
        Ok(())
    }

    fn leave_group(&mut self, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError> {
        let member = self
            .members
            .remove(&tuple)
            .ok_or_else(|| unknown(&self.label, tuple))?;
        let group = self
            .groups
            .get_mut(&member.key)
            .ok_or_else(|| missing_group(&self.label, &member.key))?;
        for (accumulator, retraction) in group.accumulators.iter_mut().zip(member.retractions) {
            accumulator
                .retract(retraction)
                .map_err(|source| collector_failed(&self.label, source))?;
        }
        group.members -= 1;
        if group.members == 0 {
            let out = group.out;
            self.groups.remove(&member.key);
            return self.queue.retract(arena, out, &self.label);
        }
        mark_dirty(group, &member.key, &mut self.dirty);
        Ok(())
    }
}

fn mark_dirty(group: &mut Group, key: &[Value], dirty: &mut Vec<Vec<Value>>) {
    if !group.dirty {
        group.dirty = true;
        dirty.push(key.to_vec());
    }
}

fn collector_failed(node: &str, source: CollectorError) -> PropagationError {
    PropagationError::Collector {
        node: node.to_string(),
        source,
    }
}

fn missing_group(node: &str, key: &[Value]) -> PropagationError {
    PropagationError::MissingGroup {
        node: node.to_string(),
        key: format!("{key:?}"),
    }
}

impl<Sc: Score> Node<Sc> for GroupNode {
    fn label(&self) -> &str {
        &self.label
    }

    fn insert(&mut self, _side: Side, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError> {
        if self.members.contains_key(&tuple) {
            return Err(duplicate(&self.label, tuple));
        }
        let key = self.keys.key(arena.row(tuple)?);
        self.join_group(tuple, key, arena)
    }

    fn update(&mut self, _side: Side, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError> {
        let key = self.keys.key(arena.row(tuple)?);
        let member = self
            .members
            .get_mut(&tuple)
            .ok_or_else(|| unknown(&self.label, tuple))?;
        if member.key != key {
            self.leave_group(tuple, arena)?;
            return self.join_group(tuple, key, arena);
        }

        let group = self
            .groups
            .get_mut(&key)
            .ok_or_else(|| missing_group(&self.label, &key))?;
        for (accumulator, retraction) in group.accumulators.iter_mut().zip(member.retractions.drain(..)) {
            accumulator
                .retract(retraction)
                .map_err(|source| collector_failed(&self.label, source))?;
        }
        let row = arena.row(tuple)?;
        member.retractions = group
            .accumulators
            .iter_mut()
            .map(|accumulator| accumulator.accumulate(row))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| collector_failed(&self.label, source))?;
        mark_dirty(group, &key, &mut self.dirty);
        Ok(())
    }

    fn retract(&mut self, _side: Side, tuple: TupleId, arena: &mut TupleArena) -> Result<(), PropagationError> {
        self.leave_group(tuple, arena)
    }

    // Writes `key ++ results` into every group touched this cycle; a group
    // whose output did not change is not propagated.
    fn before_flush(&mut self, arena: &mut TupleArena) -> Result<(), PropagationError> {
        for key in std::mem::take(&mut self.dirty) {
            let Some(group) = self.groups.get_mut(&key) else {
                continue;
            };
            group.dirty = false;
            let mut elements: Elements = key.into_iter().collect();
            elements.extend(group.accumulators.iter().map(|accumulator| accumulator.result()));
            if arena.elements(group.out)? != elements.as_slice() {
                self.queue.refresh(arena, group.out, elements, &self.label)?;
            }
        }
        Ok(())
    }

    fn queue_mut(&mut self) -> Option<&mut PropagationQueue> {
        Some(&mut self.queue)
    }

    fn stored(&self) -> usize {
        self.members.len()
    }
}
