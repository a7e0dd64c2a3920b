//! Compiled constraint networks.
//!
//! A [`ConstraintNetwork`] is the frozen result of compiling a
//! [`ConstraintProvider`]'s definitions against a [`DomainSchema`]: the node
//! DAG, its flush layers, the entry points of every concrete fact type and the
//! effective weight of every constraint. It holds no tuple state, so one
//! network can back any number of score directors on any number of threads.

mod compiler;

#[cfg(test)]
mod tests;

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use scoreforge_config::ScoringConfig;
use scoreforge_core::{ConstraintRef, ImpactType, ParseableScore, Score};
use tracing::info;

use crate::director::ScoreDirector;
use crate::error::ScoringError;
use crate::fact::{DomainSchema, FactPredicate, ResolvedSchema};
use crate::node::{
    ConcatNode, ExistenceMode, FilterNode, FlattenLastNode, ForEachNode, GroupKeys, GroupNode,
    IfExistsNode, JoinNode, MapNode, Node, NodeId, ScorerConfig, ScorerNode, Side,
};
use crate::stream::collector::SharedCollector;
use crate::stream::joiner::Joiner;
use crate::stream::{ConstraintProvider, Flattener, Mapper, Predicate};

use compiler::Compiler;

/// Operator of one compiled node, with everything needed to instantiate it.
pub(crate) enum NodeKind<Sc: Score> {
    ForEach {
        filters: HashMap<TypeId, FactPredicate>,
    },
    Filter(Predicate),
    Map {
        mappers: Vec<Mapper>,
        retain_input: bool,
    },
    FlattenLast(Flattener),
    Join(Vec<Joiner>),
    IfExists {
        mode: ExistenceMode,
        joiners: Vec<Joiner>,
    },
    Concat {
        arity: usize,
    },
    Group {
        keys: GroupKeys,
        collectors: Vec<SharedCollector>,
    },
    Scorer(ScorerConfig<Sc>),
}

impl<Sc: Score> NodeKind<Sc> {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            NodeKind::ForEach { .. } => "for_each",
            NodeKind::Filter(_) => "filter",
            NodeKind::Map {
                retain_input: true, ..
            } => "expand",
            NodeKind::Map { .. } => "map",
            NodeKind::FlattenLast(_) => "flatten_last",
            NodeKind::Join(_) => "join",
            NodeKind::IfExists {
                mode: ExistenceMode::Exists,
                ..
            } => "if_exists",
            NodeKind::IfExists { .. } => "if_not_exists",
            NodeKind::Concat { .. } => "concat",
            NodeKind::Group {
                keys: GroupKeys::Identity,
                ..
            } => "distinct",
            NodeKind::Group { .. } => "group_by",
            NodeKind::Scorer(_) => "scorer",
        }
    }
}

/// Blueprint of one node of the network.
pub(crate) struct NodeSpec<Sc: Score> {
    pub(crate) kind: NodeKind<Sc>,
    pub(crate) label: String,
    /// Flush layer: 0 for entry points, one past the deepest parent otherwise.
    pub(crate) layer: usize,
    pub(crate) parents: Vec<NodeId>,
}

impl<Sc: Score> NodeSpec<Sc> {
    /// Creates a fresh, empty node for one session.
    pub(crate) fn instantiate(&self) -> Box<dyn Node<Sc>> {
        let label = self.label.clone();
        match &self.kind {
            NodeKind::ForEach { filters } => Box::new(ForEachNode::new(label, filters.clone())),
            NodeKind::Filter(predicate) => Box::new(FilterNode::new(label, predicate.clone())),
            NodeKind::Map {
                mappers,
                retain_input,
            } => Box::new(MapNode::new(label, mappers.clone(), *retain_input)),
            NodeKind::FlattenLast(flattener) => {
                Box::new(FlattenLastNode::new(label, flattener.clone()))
            }
            NodeKind::Join(joiners) => Box::new(JoinNode::new(label, joiners)),
            NodeKind::IfExists { mode, joiners } => {
                Box::new(IfExistsNode::new(label, *mode, joiners))
            }
            NodeKind::Concat { arity } => Box::new(ConcatNode::new(label, *arity)),
            NodeKind::Group { keys, collectors } => {
                Box::new(GroupNode::new(label, keys.clone(), collectors.clone()))
            }
            NodeKind::Scorer(config) => Box::new(ScorerNode::new(label, config.clone())),
        }
    }
}

/// A constraint as compiled: its identity, effective weight and terminal node.
#[derive(Debug, Clone)]
pub struct CompiledConstraint<Sc: Score> {
    pub constraint_ref: ConstraintRef,
    pub impact: ImpactType,
    /// Weight after configuration overrides.
    pub weight: Sc,
    /// `None` when the effective weight is zero and the constraint was skipped.
    pub(crate) scorer: Option<NodeId>,
}

impl<Sc: Score> CompiledConstraint<Sc> {
    pub fn is_active(&self) -> bool {
        self.scorer.is_some()
    }
}

/// Immutable node graph shared by every session scoring against it.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use scoreforge_config::ScoringConfig;
/// use scoreforge_core::SimpleScore;
/// use scoreforge_scoring::fact::{DomainSchema, FactRef};
/// use scoreforge_scoring::network::ConstraintNetwork;
/// use scoreforge_scoring::stream::{ConstraintDefinition, ConstraintFactory};
///
/// #[derive(Debug)]
/// struct Task { cost: i64 }
///
/// let mut schema = DomainSchema::new();
/// schema.problem_fact::<Task>("Task");
/// let provider = |factory: &ConstraintFactory| -> Vec<ConstraintDefinition<SimpleScore>> {
///     vec![factory
///         .for_each("Task")
///         .penalize_weighted(SimpleScore::of(1), |r| r.fact::<Task>(0).cost)
///         .as_constraint("Cost")]
/// };
///
/// let network = ConstraintNetwork::compile(schema, &provider, &ScoringConfig::default()).unwrap();
/// let mut director = network.build_score_director();
/// director.insert_fact(&FactRef::new(Arc::new(Task { cost: 4 }))).unwrap();
/// assert_eq!(director.calculate_score().unwrap(), SimpleScore::of(-4));
/// ```
pub struct ConstraintNetwork<Sc: Score> {
    pub(crate) nodes: Vec<NodeSpec<Sc>>,
    pub(crate) children: Vec<Vec<(NodeId, Side)>>,
    pub(crate) layers: Vec<Vec<NodeId>>,
    pub(crate) entry_points: HashMap<TypeId, Vec<NodeId>>,
    pub(crate) constraints: Vec<CompiledConstraint<Sc>>,
    pub(crate) schema: ResolvedSchema,
    pub(crate) config: ScoringConfig,
}

impl<Sc: ParseableScore> ConstraintNetwork<Sc> {
    /// Compiles the provider's constraints into a shareable network.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::Config`] when the schema or any constraint
    /// definition is malformed.
    pub fn compile<P>(
        schema: DomainSchema,
        provider: &P,
        config: &ScoringConfig,
    ) -> Result<Arc<Self>, ScoringError>
    where
        P: ConstraintProvider<Sc> + ?Sized,
    {
        let schema = schema.resolve()?;
        let definitions = provider.define_constraints(&crate::stream::ConstraintFactory::new());
        let compiled = Compiler::new(&schema, config).compile(&definitions)?;

        let network = Self {
            children: compiled.children(),
            layers: compiled.layers(),
            nodes: compiled.nodes,
            entry_points: compiled.entry_points,
            constraints: compiled.constraints,
            schema,
            config: config.clone(),
        };
        info!(
            event = "network_compiled",
            nodes = network.nodes.len(),
            layers = network.layers.len(),
            constraints = network.constraints.len(),
            active = network.active_constraint_count(),
        );
        Ok(Arc::new(network))
    }
}

impl<Sc: Score> ConstraintNetwork<Sc> {
    /// Starts an empty session against this network.
    pub fn build_score_director(self: &Arc<Self>) -> ScoreDirector<Sc> {
        ScoreDirector::new(Arc::clone(self))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Number of nodes of one operator kind, e.g. `"join"`.
    pub fn count_nodes(&self, kind: &str) -> usize {
        self.nodes
            .iter()
            .filter(|node| node.kind.name() == kind)
            .count()
    }

    pub fn constraints(&self) -> &[CompiledConstraint<Sc>] {
        &self.constraints
    }

    pub fn active_constraint_count(&self) -> usize {
        self.constraints
            .iter()
            .filter(|constraint| constraint.is_active())
            .count()
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn is_constraint_match_enabled(&self) -> bool {
        self.config.constraint_match_enabled
    }
}

impl<Sc: Score> fmt::Debug for ConstraintNetwork<Sc> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintNetwork")
            .field("nodes", &self.nodes.len())
            .field("layers", &self.layers.len())
            .field("constraints", &self.constraints.len())
            .finish()
    }
}
