use std::fmt;
use std::sync::Arc;

use scoreforge_core::{ImpactType, Score};

use super::collector::SharedCollector;
use super::constraint::ConstraintBuilder;
use super::function::{Flattener, IntMapper, Mapper, Predicate};
use super::joiner::Joiner;
use super::{StreamDef, StreamOp};
use crate::fact::Value;
use crate::tuple::Row;

/// A pipeline of tuples of arity 1 to 4.
///
/// Cheap to clone; clones describe the same pipeline and compile to the same
/// nodes.
#[derive(Clone)]
pub struct Stream {
    pub(crate) def: Arc<StreamDef>,
    pub(crate) package: Arc<str>,
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("op", &self.def.op.name())
            .field("arity", &self.def.arity)
            .finish()
    }
}

impl Stream {
    pub(crate) fn root(op: StreamOp, arity: usize, package: Arc<str>) -> Self {
        Self {
            def: Arc::new(StreamDef {
                op,
                parents: Vec::new(),
                arity,
            }),
            package,
        }
    }

    fn derive(&self, op: StreamOp, parents: Vec<Stream>, arity: usize) -> Self {
        Self {
            def: Arc::new(StreamDef { op, parents, arity }),
            package: Arc::clone(&self.package),
        }
    }

    fn class_root(&self, class: &str, include_unassigned: bool) -> Stream {
        Self::root(
            StreamOp::ForEach {
                class: class.to_string(),
                include_unassigned,
            },
            1,
            Arc::clone(&self.package),
        )
    }

    /// Number of elements per tuple.
    pub fn arity(&self) -> usize {
        self.def.arity
    }

    /// Whether two handles describe the very same pipeline.
    pub fn same_stream(&self, other: &Stream) -> bool {
        Arc::ptr_eq(&self.def, &other.def)
    }

    /// Keeps the tuples that pass `predicate`.
    pub fn filter<F>(&self, predicate: F) -> Stream
    where
        F: for<'a> Fn(Row<'a>) -> bool + Send + Sync + 'static,
    {
        self.filter_with(Predicate::new(predicate))
    }

    /// Like [`Stream::filter`], reusing an existing predicate handle.
    pub fn filter_with(&self, predicate: Predicate) -> Stream {
        self.derive(StreamOp::Filter(predicate), vec![self.clone()], self.arity())
    }

    /// Joins with every assigned instance of `class`.
    pub fn join(&self, class: &str, joiners: Vec<Joiner>) -> Stream {
        let other = self.class_root(class, false);
        self.join_stream(&other, joiners)
    }

    /// Joins with the tuples of another stream; output is left ++ right.
    pub fn join_stream(&self, other: &Stream, joiners: Vec<Joiner>) -> Stream {
        self.derive(
            StreamOp::Join(joiners),
            vec![self.clone(), other.clone()],
            self.arity() + other.arity(),
        )
    }

    /// Keeps tuples with at least one matching assigned instance of `class`.
    pub fn if_exists(&self, class: &str, joiners: Vec<Joiner>) -> Stream {
        self.exists_class(true, class, false, joiners)
    }

    pub fn if_exists_including_unassigned(&self, class: &str, joiners: Vec<Joiner>) -> Stream {
        self.exists_class(true, class, true, joiners)
    }

    /// Keeps tuples with no matching assigned instance of `class`.
    pub fn if_not_exists(&self, class: &str, joiners: Vec<Joiner>) -> Stream {
        self.exists_class(false, class, false, joiners)
    }

    pub fn if_not_exists_including_unassigned(&self, class: &str, joiners: Vec<Joiner>) -> Stream {
        self.exists_class(false, class, true, joiners)
    }

    /// Keeps tuples with at least one matching tuple in `other`.
    pub fn if_exists_stream(&self, other: &Stream, joiners: Vec<Joiner>) -> Stream {
        self.exists(true, other.clone(), None, joiners)
    }

    /// Keeps tuples with no matching tuple in `other`.
    pub fn if_not_exists_stream(&self, other: &Stream, joiners: Vec<Joiner>) -> Stream {
        self.exists(false, other.clone(), None, joiners)
    }

    fn exists_class(
        &self,
        should_exist: bool,
        class: &str,
        include_unassigned: bool,
        joiners: Vec<Joiner>,
    ) -> Stream {
        let other = self.class_root(class, include_unassigned);
        self.exists(should_exist, other, Some(class.to_string()), joiners)
    }

    fn exists(
        &self,
        should_exist: bool,
        other: Stream,
        target: Option<String>,
        joiners: Vec<Joiner>,
    ) -> Stream {
        self.derive(
            StreamOp::IfExists {
                should_exist,
                joiners,
                target,
            },
            vec![self.clone(), other],
            self.arity(),
        )
    }

    /// Replaces each tuple by one single-element tuple.
    pub fn map<F, V>(&self, mapping: F) -> Stream
    where
        F: for<'a> Fn(Row<'a>) -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        self.map_all(vec![Mapper::new(mapping)])
    }

    /// Replaces each tuple by the values of `mappers`, in order.
    pub fn map_all(&self, mappers: Vec<Mapper>) -> Stream {
        let arity = mappers.len();
        self.derive(
            StreamOp::Map {
                mappers,
                retain_input: false,
            },
            vec![self.clone()],
            arity,
        )
    }

    /// Appends one computed element to each tuple.
    pub fn expand<F, V>(&self, mapping: F) -> Stream
    where
        F: for<'a> Fn(Row<'a>) -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        self.expand_all(vec![Mapper::new(mapping)])
    }

    pub fn expand_all(&self, mappers: Vec<Mapper>) -> Stream {
        let arity = self.arity() + mappers.len();
        self.derive(
            StreamOp::Map {
                mappers,
                retain_input: true,
            },
            vec![self.clone()],
            arity,
        )
    }

    /// Replaces the last element by each value it expands to.
    ///
    /// One tuple becomes zero or more tuples; an update re-expands.
    pub fn flatten_last<F>(&self, flattener: F) -> Stream
    where
        F: for<'a> Fn(Row<'a>) -> Vec<Value> + Send + Sync + 'static,
    {
        self.derive(
            StreamOp::FlattenLast(Flattener::new(flattener)),
            vec![self.clone()],
            self.arity(),
        )
    }

    /// Tuples of both streams; the shorter side is padded with `Null`.
    ///
    /// No deduplication: a tuple present on both sides appears twice.
    pub fn concat(&self, other: &Stream) -> Stream {
        self.derive(
            StreamOp::Concat,
            vec![self.clone(), other.clone()],
            self.arity().max(other.arity()),
        )
    }

    /// Groups by one key; output tuples are `(key)`.
    pub fn group_by<F, V>(&self, key: F) -> Stream
    where
        F: for<'a> Fn(Row<'a>) -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        self.group_by_keys(vec![Mapper::new(key)], Vec::new())
    }

    /// Groups by one key; output tuples are `(key, results...)`.
    pub fn group_by_collect<F, V>(&self, key: F, collectors: Vec<SharedCollector>) -> Stream
    where
        F: for<'a> Fn(Row<'a>) -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        self.group_by_keys(vec![Mapper::new(key)], collectors)
    }

    /// Collects all tuples into one group; output is `(results...)`.
    pub fn collect(&self, collectors: Vec<SharedCollector>) -> Stream {
        self.group_by_keys(Vec::new(), collectors)
    }

    /// General group-by: output tuples are the keys then the collector
    /// results, in declaration order.
    pub fn group_by_keys(&self, keys: Vec<Mapper>, collectors: Vec<SharedCollector>) -> Stream {
        let arity = keys.len() + collectors.len();
        self.derive(
            StreamOp::GroupBy { keys, collectors },
            vec![self.clone()],
            arity,
        )
    }

    /// At most one tuple per structurally equal tuple.
    pub fn distinct(&self) -> Stream {
        self.derive(StreamOp::Distinct, vec![self.clone()], self.arity())
    }

    /// Adds, for every assigned `class` instance that no tuple starts with,
    /// a tuple of that instance padded by `padding`.
    ///
    /// `padding` must hold one mapper per element after the first.
    pub fn complement(&self, class: &str, padding: Vec<Mapper>) -> Stream {
        self.derive(
            StreamOp::Complement {
                class: class.to_string(),
                padding,
            },
            vec![self.clone()],
            self.arity(),
        )
    }

    /// Each tuple subtracts `weight` from the score.
    pub fn penalize<Sc: Score>(&self, weight: Sc) -> ConstraintBuilder<Sc> {
        ConstraintBuilder::new(self.clone(), ImpactType::Penalty, weight, None)
    }

    /// Each tuple adds `weight` to the score.
    pub fn reward<Sc: Score>(&self, weight: Sc) -> ConstraintBuilder<Sc> {
        ConstraintBuilder::new(self.clone(), ImpactType::Reward, weight, None)
    }

    /// Each tuple subtracts `weight` scaled by `match_weight(tuple)`.
    pub fn penalize_weighted<Sc, F>(&self, weight: Sc, match_weight: F) -> ConstraintBuilder<Sc>
    where
        Sc: Score,
        F: for<'a> Fn(Row<'a>) -> i64 + Send + Sync + 'static,
    {
        ConstraintBuilder::new(
            self.clone(),
            ImpactType::Penalty,
            weight,
            Some(IntMapper::new(match_weight)),
        )
    }

    /// Each tuple adds `weight` scaled by `match_weight(tuple)`.
    pub fn reward_weighted<Sc, F>(&self, weight: Sc, match_weight: F) -> ConstraintBuilder<Sc>
    where
        Sc: Score,
        F: for<'a> Fn(Row<'a>) -> i64 + Send + Sync + 'static,
    {
        ConstraintBuilder::new(
            self.clone(),
            ImpactType::Reward,
            weight,
            Some(IntMapper::new(match_weight)),
        )
    }
}
