// Lowers stream descriptions into node blueprints.
//
// Streams are compiled depth-first, so a node's parents always have smaller
// ids than the node itself and the id order is already topological. Two
// memo tables deduplicate work: one keyed by stream identity (a stream object
// used twice is one node), and, with node sharing on, one keyed by the
// operator, its parameters, its function identities and its parent nodes.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use scoreforge_config::ScoringConfig;
use scoreforge_core::{ParseableScore, Score};
use tracing::debug;

use super::{CompiledConstraint, NodeKind, NodeSpec};
use crate::api::ConstraintWeightOverrides;
use crate::error::ConstraintConfigError;
use crate::fact::{ResolvedSchema, Value};
use crate::node::{ExistenceMode, GroupKeys, NodeId, ScorerConfig, Side};
use crate::stream::collector::CollectorKey;
use crate::stream::joiner::{equal, Joiner, JoinerType};
use crate::stream::{ConstraintDefinition, FunctionKey, Mapper, Stream, StreamOp};
use crate::tuple::{Row, MAX_ARITY};

/// Structural identity of a shareable node.
#[derive(Debug, PartialEq, Eq, Hash)]
struct NodeKey {
    kind: &'static str,
    params: Vec<Value>,
    functions: Vec<FunctionKey>,
    collectors: Vec<CollectorKey>,
    parents: Vec<NodeId>,
}

impl NodeKey {
    fn new(kind: &'static str, parents: &[NodeId]) -> Self {
        Self {
            kind,
            params: Vec::new(),
            functions: Vec::new(),
            collectors: Vec::new(),
            parents: parents.to_vec(),
        }
    }
}

/// Output of a compilation, before it is frozen into a network.
pub(crate) struct Compiled<Sc: Score> {
    pub(crate) nodes: Vec<NodeSpec<Sc>>,
    pub(crate) entry_points: HashMap<TypeId, Vec<NodeId>>,
    pub(crate) constraints: Vec<CompiledConstraint<Sc>>,
}

impl<Sc: Score> Compiled<Sc> {
    /// Downstream edges; the first parent of a node feeds its left side.
    pub(crate) fn children(&self) -> Vec<Vec<(NodeId, Side)>> {
        let mut children = vec![Vec::new(); self.nodes.len()];
        for (id, node) in self.nodes.iter().enumerate() {
            for (position, parent) in node.parents.iter().enumerate() {
                let side = if position == 0 { Side::Left } else { Side::Right };
                children[*parent].push((id, side));
            }
        }
        children
    }

    pub(crate) fn layers(&self) -> Vec<Vec<NodeId>> {
        let depth = self.nodes.iter().map(|node| node.layer + 1).max().unwrap_or(0);
        let mut layers = vec![Vec::new(); depth];
        for (id, node) in self.nodes.iter().enumerate() {
            layers[node.layer].push(id);
        }
        layers
    }
}

pub(crate) struct Compiler<'a, Sc: Score> {
    schema: &'a ResolvedSchema,
    config: &'a ScoringConfig,
    nodes: Vec<NodeSpec<Sc>>,
    by_stream: HashMap<usize, NodeId>,
    by_structure: HashMap<NodeKey, NodeId>,
    // one mapper per class, so unique-pair joins over a class can share
    planning_ids: HashMap<String, Mapper>,
    entry_points: HashMap<TypeId, Vec<NodeId>>,
}

impl<'a, Sc: ParseableScore> Compiler<'a, Sc> {
    pub(crate) fn new(schema: &'a ResolvedSchema, config: &'a ScoringConfig) -> Self {
        Self {
            schema,
            config,
            nodes: Vec::new(),
            by_stream: HashMap::new(),
            by_structure: HashMap::new(),
            planning_ids: HashMap::new(),
            entry_points: HashMap::new(),
        }
    }

    pub(crate) fn compile(
        mut self,
        definitions: &[ConstraintDefinition<Sc>],
    ) -> Result<Compiled<Sc>, ConstraintConfigError> {
        let overrides = ConstraintWeightOverrides::<Sc>::from_config(self.config)?;
        let unknown = overrides.unknown_keys(definitions.iter().map(|d| &d.constraint_ref));
        if let Some(key) = unknown.first() {
            return Err(ConstraintConfigError::UnknownWeightOverride(key.to_string()));
        }

        let mut seen = HashSet::new();
        let mut constraints = Vec::with_capacity(definitions.len());
        for definition in definitions {
            let full_name = definition.constraint_ref.full_name();
            if !seen.insert(full_name.clone()) {
                return Err(ConstraintConfigError::DuplicateConstraint(full_name));
            }
            if definition.justifiers.len() > 1 {
                return Err(ConstraintConfigError::DuplicateJustificationMapping {
                    constraint: full_name,
                });
            }
            if definition.indicters.len() > 1 {
                return Err(ConstraintConfigError::DuplicateIndictmentMapping {
                    constraint: full_name,
                });
            }

            let weight = overrides
                .resolve(&definition.constraint_ref)
                .unwrap_or(definition.weight);
            let scorer = if weight.is_zero() {
                debug!(event = "constraint_inactive", constraint = %full_name);
                None
            } else {
                let parent = self.compile_stream(&definition.stream)?;
                let config = ScorerConfig {
                    constraint_ref: definition.constraint_ref.clone(),
                    impact: definition.impact,
                    weight,
                    match_weight: definition.match_weight.clone(),
                    justifier: definition.justifiers.first().cloned(),
                    indicter: definition.indicters.first().cloned(),
                };
                Some(self.add(NodeKind::Scorer(config), vec![parent], None))
            };
            constraints.push(CompiledConstraint {
                constraint_ref: definition.constraint_ref.clone(),
                impact: definition.impact,
                weight,
                scorer,
            });
        }

        Ok(Compiled {
            nodes: self.nodes,
            entry_points: self.entry_points,
            constraints,
        })
    }

    fn compile_stream(&mut self, stream: &Stream) -> Result<NodeId, ConstraintConfigError> {
        let identity = Arc::as_ptr(&stream.def) as usize;
        if let Some(&id) = self.by_stream.get(&identity) {
            return Ok(id);
        }
        let def = &stream.def;
        if def.arity > MAX_ARITY {
            return Err(ConstraintConfigError::ArityOverflow {
                operation: def.op.name(),
                arity: def.arity,
            });
        }

        let id = match &def.op {
            StreamOp::ForEach {
                class,
                include_unassigned,
            } => self.for_each(class, *include_unassigned)?,
            StreamOp::UniquePair { class, joiners } => {
                let root = self.for_each(class, false)?;
                let id = self.planning_id(class)?;
                let mut all = vec![Joiner::mapping(JoinerType::LessThan, id.clone(), id)];
                all.extend(joiners.iter().cloned());
                self.shared(NodeKind::Join(all), vec![root, root])
            }
            StreamOp::Filter(predicate) => {
                let parents = self.compile_parents(&def.parents)?;
                self.shared(NodeKind::Filter(predicate.clone()), parents)
            }
            StreamOp::Join(joiners) => {
                let parents = self.compile_parents(&def.parents)?;
                self.shared(NodeKind::Join(joiners.clone()), parents)
            }
            StreamOp::IfExists {
                should_exist,
                joiners,
                target,
            } => {
                if let Some(class) = target {
                    if self.schema.assignable_types(class)?.is_empty() {
                        return Err(ConstraintConfigError::UnrelatedExistsTarget {
                            class: class.clone(),
                        });
                    }
                }
                let mode = if *should_exist {
                    ExistenceMode::Exists
                } else {
                    ExistenceMode::NotExists
                };
                let parents = self.compile_parents(&def.parents)?;
                let joiners = joiners.clone();
                self.shared(NodeKind::IfExists { mode, joiners }, parents)
            }
            StreamOp::Map {
                mappers,
                retain_input,
            } => {
                if mappers.is_empty() && !retain_input {
                    return Err(ConstraintConfigError::ArityMismatch {
                        operation: def.op.name(),
                        expected: 1,
                        actual: 0,
                    });
                }
                let parents = self.compile_parents(&def.parents)?;
                let kind = NodeKind::Map {
                    mappers: mappers.clone(),
                    retain_input: *retain_input,
                };
                self.shared(kind, parents)
            }
            StreamOp::FlattenLast(flattener) => {
                let parents = self.compile_parents(&def.parents)?;
                self.shared(NodeKind::FlattenLast(flattener.clone()), parents)
            }
            StreamOp::Concat => {
                let parents = self.compile_parents(&def.parents)?;
                self.shared(NodeKind::Concat { arity: def.arity }, parents)
            }
            StreamOp::GroupBy { keys, collectors } => {
                if keys.is_empty() && collectors.is_empty() {
                    return Err(ConstraintConfigError::EmptyGroupBy);
                }
                let parents = self.compile_parents(&def.parents)?;
                let kind = NodeKind::Group {
                    keys: GroupKeys::Mappers(keys.clone()),
                    collectors: collectors.clone(),
                };
                self.shared(kind, parents)
            }
            StreamOp::Distinct => {
                let parents = self.compile_parents(&def.parents)?;
                let kind = NodeKind::Group {
                    keys: GroupKeys::Identity,
                    collectors: Vec::new(),
                };
                self.shared(kind, parents)
            }
            StreamOp::Complement { class, padding } => {
                self.complement(def.arity, class, padding, &def.parents)?
            }
        };
        self.by_stream.insert(identity, id);
        Ok(id)
    }

    fn compile_parents(&mut self, parents: &[Stream]) -> Result<Vec<NodeId>, ConstraintConfigError> {
        parents
            .iter()
            .map(|parent| self.compile_stream(parent))
            .collect()
    }

    // main ++ (facts of `class` no main tuple starts with, padded to arity)
    fn complement(
        &mut self,
        arity: usize,
        class: &str,
        padding: &[Mapper],
        parents: &[Stream],
    ) -> Result<NodeId, ConstraintConfigError> {
        if padding.len() + 1 != arity {
            return Err(ConstraintConfigError::ArityMismatch {
                operation: "complement",
                expected: arity.saturating_sub(1),
                actual: padding.len(),
            });
        }
        let main = match parents.first() {
            Some(parent) => self.compile_stream(parent)?,
            None => {
                return Err(ConstraintConfigError::ArityMismatch {
                    operation: "complement",
                    expected: 1,
                    actual: 0,
                })
            }
        };
        let universe = self.for_each(class, false)?;
        let missing = self.shared(
            NodeKind::IfExists {
                mode: ExistenceMode::NotExists,
                joiners: vec![equal(|r: Row| r.get(0).clone())],
            },
            vec![universe, main],
        );
        let padded = self.shared(
            NodeKind::Map {
                mappers: padding.to_vec(),
                retain_input: true,
            },
            vec![missing],
        );
        Ok(self.shared(NodeKind::Concat { arity }, vec![main, padded]))
    }

    fn for_each(&mut self, class: &str, include_unassigned: bool) -> Result<NodeId, ConstraintConfigError> {
        let types = self.schema.assignable_types(class)?.to_vec();
        let filters = if include_unassigned {
            HashMap::new()
        } else {
            types
                .iter()
                .filter_map(|type_id| {
                    self.schema
                        .class_of(*type_id)
                        .and_then(|resolved| resolved.assigned.clone())
                        .map(|assigned| (*type_id, assigned))
                })
                .collect()
        };
        let mut key = NodeKey::new("for_each", &[]);
        key.params.push(Value::from(class));
        key.params.push(Value::from(include_unassigned));

        let existing = self.nodes.len();
        let id = self.add(NodeKind::ForEach { filters }, Vec::new(), Some(key));
        if id == existing {
            for type_id in types {
                self.entry_points.entry(type_id).or_default().push(id);
            }
        }
        Ok(id)
    }

    fn planning_id(&mut self, class: &str) -> Result<Mapper, ConstraintConfigError> {
        if let Some(mapper) = self.planning_ids.get(class) {
            return Ok(mapper.clone());
        }
        let mut ids = HashMap::new();
        for type_id in self.schema.assignable_types(class)? {
            let resolved = self
                .schema
                .class_of(*type_id)
                .ok_or_else(|| ConstraintConfigError::UnknownClass(class.to_string()))?;
            let Some(id) = resolved.planning_id.clone() else {
                return Err(ConstraintConfigError::MissingPlanningId(resolved.name.clone()));
            };
            ids.insert(*type_id, id);
        }
        let mapper = Mapper::new(move |row: Row| {
            row.fact_ref(0)
                .and_then(|fact| ids.get(&fact.type_id()).map(|id| id(fact)))
                .unwrap_or(Value::Null)
        });
        self.planning_ids.insert(class.to_string(), mapper.clone());
        Ok(mapper)
    }

    fn shared(&mut self, kind: NodeKind<Sc>, parents: Vec<NodeId>) -> NodeId {
        let key = sharing_key(&kind, &parents);
        self.add(kind, parents, Some(key))
    }

    // Appends a node unless sharing finds a structural twin.
    fn add(&mut self, kind: NodeKind<Sc>, parents: Vec<NodeId>, key: Option<NodeKey>) -> NodeId {
        let key = key.filter(|_| self.config.node_sharing);
        if let Some(id) = key.as_ref().and_then(|key| self.by_structure.get(key)) {
            return *id;
        }
        let id = self.nodes.len();
        let layer = parents
            .iter()
            .map(|parent| self.nodes[*parent].layer + 1)
            .max()
            .unwrap_or(0);
        self.nodes.push(NodeSpec {
            label: format!("{}#{}", kind.name(), id),
            kind,
            layer,
            parents,
        });
        if let Some(key) = key {
            self.by_structure.insert(key, id);
        }
        id
    }
}

fn sharing_key<Sc: Score>(kind: &NodeKind<Sc>, parents: &[NodeId]) -> NodeKey {
    let mut key = NodeKey::new(kind.name(), parents);
    match kind {
        NodeKind::ForEach { .. } | NodeKind::Scorer(_) => {}
        NodeKind::Filter(predicate) => key.functions.push(predicate.key()),
        NodeKind::Map { mappers, .. } => {
            key.functions.extend(mappers.iter().map(Mapper::key));
        }
        NodeKind::FlattenLast(flattener) => key.functions.push(flattener.key()),
        NodeKind::Join(joiners) | NodeKind::IfExists { joiners, .. } => {
            for joiner in joiners {
                joiner.sharing_key(&mut key.params, &mut key.functions);
            }
        }
        NodeKind::Concat { arity } => key.params.push(Value::from(*arity as u32)),
        NodeKind::Group { keys, collectors } => {
            if let GroupKeys::Mappers(mappers) = keys {
                key.functions.extend(mappers.iter().map(Mapper::key));
            }
            key.collectors
                .extend(collectors.iter().map(|collector| collector.sharing_key()));
        }
    }
    key
}
