use std::fmt;
use std::sync::Arc;

use scoreforge_config::EnvironmentMode;
use scoreforge_core::Score;
use tracing::debug;

use super::WorkingSolution;
use crate::error::{PropagationError, ProtocolViolation, Result};
use crate::fact::{FactKind, FactRef, FactRegistry, MutationPhase};
use crate::network::ConstraintNetwork;
use crate::node::{ForEachNode, Node};
use crate::tuple::TupleArena;

/// Incremental score calculation for one working solution.
///
/// # Example
///
/// ```
/// use std::sync::{Arc, RwLock};
/// use scoreforge_config::ScoringConfig;
/// use scoreforge_core::SimpleScore;
/// use scoreforge_scoring::fact::{DomainSchema, FactRef};
/// use scoreforge_scoring::network::ConstraintNetwork;
/// use scoreforge_scoring::stream::{ConstraintDefinition, ConstraintFactory};
///
/// #[derive(Debug)]
/// struct Lesson { room: RwLock<Option<i64>> }
///
/// let mut schema = DomainSchema::new();
/// schema.entity::<Lesson>("Lesson");
/// let provider = |factory: &ConstraintFactory| -> Vec<ConstraintDefinition<SimpleScore>> {
///     vec![factory
///         .for_each("Lesson")
///         .filter(|r| r.fact::<Lesson>(0).room.read().unwrap().is_none())
///         .penalize(SimpleScore::of(1))
///         .as_constraint("Unassigned lesson")]
/// };
/// let network = ConstraintNetwork::compile(schema, &provider, &ScoringConfig::default()).unwrap();
/// let mut director = network.build_score_director();
///
/// let lesson = Arc::new(Lesson { room: RwLock::new(None) });
/// let fact = FactRef::new(lesson.clone());
/// director.before_entity_added(&fact).unwrap();
/// director.after_entity_added(&fact).unwrap();
/// assert_eq!(director.calculate_score().unwrap(), SimpleScore::of(-1));
///
/// director.before_variable_changed(&fact, "room").unwrap();
/// *lesson.room.write().unwrap() = Some(3);
/// director.after_variable_changed(&fact, "room").unwrap();
/// assert_eq!(director.calculate_score().unwrap(), SimpleScore::of(0));
/// ```
pub struct ScoreDirector<Sc: Score> {
    pub(super) network: Arc<ConstraintNetwork<Sc>>,
    pub(super) nodes: Vec<Box<dyn Node<Sc>>>,
    pub(super) arena: TupleArena,
    pub(super) registry: FactRegistry,
    pub(super) mode: EnvironmentMode,
    pub(super) cycles: u64,
}

impl<Sc: Score> ScoreDirector<Sc> {
    /// Creates a session with no facts against a compiled network.
    pub fn new(network: Arc<ConstraintNetwork<Sc>>) -> Self {
        let mode = network.config.environment_mode;
        Self::with_mode(network, mode)
    }

    pub(super) fn with_mode(network: Arc<ConstraintNetwork<Sc>>, mode: EnvironmentMode) -> Self {
        let nodes = network.nodes.iter().map(|spec| spec.instantiate()).collect();
        Self {
            network,
            nodes,
            arena: TupleArena::new(),
            registry: FactRegistry::new(),
            mode,
            cycles: 0,
        }
    }

    pub fn network(&self) -> &Arc<ConstraintNetwork<Sc>> {
        &self.network
    }

    pub fn environment_mode(&self) -> EnvironmentMode {
        self.mode
    }

    /// Number of tracked facts.
    pub fn fact_count(&self) -> usize {
        self.registry.len()
    }

    pub fn is_tracked(&self, fact: &FactRef) -> bool {
        self.registry.is_tracked(fact)
    }

    /// Number of live tuples across all nodes.
    pub fn tuple_count(&self) -> usize {
        self.arena.len()
    }

    /// Number of calculation cycles run so far.
    pub fn cycle_count(&self) -> u64 {
        self.cycles
    }

    /// Drops every fact and tuple and loads the solution from scratch.
    ///
    /// On error the session is left empty.
    pub fn set_working_solution<W: WorkingSolution + ?Sized>(&mut self, solution: &W) -> Result<()> {
        self.reset();
        let facts = solution.facts();
        for fact in &facts {
            if let Err(error) = self.insert_fact(fact) {
                self.reset();
                return Err(error);
            }
        }
        debug!(event = "working_solution_set", facts = facts.len());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Unpaired lifecycle
    // ------------------------------------------------------------------

    /// Starts tracking a fact of any registered class.
    pub fn insert_fact(&mut self, fact: &FactRef) -> Result<()> {
        let kind = self.kind_of(fact)?;
        self.registry.ensure_untracked(fact)?;
        self.propagate_insert(fact)?;
        self.registry.track(fact, kind)?;
        Ok(())
    }

    /// Re-evaluates everything derived from a tracked fact.
    pub fn update_fact(&mut self, fact: &FactRef) -> Result<()> {
        self.registry.ensure_stable(fact, "update_fact")?;
        self.propagate_update(fact)?;
        Ok(())
    }

    /// Stops tracking a fact and retracts everything derived from it.
    pub fn retract_fact(&mut self, fact: &FactRef) -> Result<()> {
        self.registry.untrack(fact, "retract_fact")?;
        self.propagate_retract(fact)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    pub fn before_entity_added(&mut self, fact: &FactRef) -> Result<()> {
        self.begin(fact, FactKind::Entity, MutationPhase::Adding, "before_entity_added")
    }

    pub fn after_entity_added(&mut self, fact: &FactRef) -> Result<()> {
        self.finish(fact, FactKind::Entity, MutationPhase::Adding, "after_entity_added")?;
        self.insert_tracked(fact, "after_entity_added")
    }

    pub fn before_entity_removed(&mut self, fact: &FactRef) -> Result<()> {
        self.begin(fact, FactKind::Entity, MutationPhase::Removing, "before_entity_removed")
    }

    pub fn after_entity_removed(&mut self, fact: &FactRef) -> Result<()> {
        self.finish(fact, FactKind::Entity, MutationPhase::Removing, "after_entity_removed")?;
        self.propagate_retract(fact)?;
        Ok(())
    }

    /// Announces a planning variable change; must be followed by
    /// [`after_variable_changed`](Self::after_variable_changed) with the same
    /// variable before anything else touches the entity.
    pub fn before_variable_changed(&mut self, fact: &FactRef, variable: &str) -> Result<()> {
        let phase = MutationPhase::VariableChanging(variable.to_string());
        self.begin(fact, FactKind::Entity, phase, "before_variable_changed")
    }

    pub fn after_variable_changed(&mut self, fact: &FactRef, variable: &str) -> Result<()> {
        let phase = MutationPhase::VariableChanging(variable.to_string());
        self.finish(fact, FactKind::Entity, phase, "after_variable_changed")?;
        self.propagate_update(fact)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Problem facts
    // ------------------------------------------------------------------

    pub fn before_problem_fact_added(&mut self, fact: &FactRef) -> Result<()> {
        self.begin(fact, FactKind::ProblemFact, MutationPhase::Adding, "before_problem_fact_added")
    }

    pub fn after_problem_fact_added(&mut self, fact: &FactRef) -> Result<()> {
        self.finish(fact, FactKind::ProblemFact, MutationPhase::Adding, "after_problem_fact_added")?;
        self.insert_tracked(fact, "after_problem_fact_added")
    }

    pub fn before_problem_fact_removed(&mut self, fact: &FactRef) -> Result<()> {
        self.begin(fact, FactKind::ProblemFact, MutationPhase::Removing, "before_problem_fact_removed")
    }

    pub fn after_problem_fact_removed(&mut self, fact: &FactRef) -> Result<()> {
        self.finish(fact, FactKind::ProblemFact, MutationPhase::Removing, "after_problem_fact_removed")?;
        self.propagate_retract(fact)?;
        Ok(())
    }

    pub fn before_problem_property_changed(&mut self, fact: &FactRef) -> Result<()> {
        self.begin(
            fact,
            FactKind::ProblemFact,
            MutationPhase::PropertyChanging,
            "before_problem_property_changed",
        )
    }

    pub fn after_problem_property_changed(&mut self, fact: &FactRef) -> Result<()> {
        self.finish(
            fact,
            FactKind::ProblemFact,
            MutationPhase::PropertyChanging,
            "after_problem_property_changed",
        )?;
        self.propagate_update(fact)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn kind_of(&self, fact: &FactRef) -> Result<FactKind, ProtocolViolation> {
        self.network
            .schema
            .class_of(fact.type_id())
            .map(|class| class.kind)
            .ok_or(ProtocolViolation::UnregisteredType {
                type_name: fact.type_name(),
            })
    }

    fn expect_kind(&self, fact: &FactRef, expected: FactKind, call: &'static str) -> Result<(), ProtocolViolation> {
        if self.kind_of(fact)? != expected {
            return Err(ProtocolViolation::WrongFactKind {
                fact: fact.to_string(),
                call,
                expected: expected.label(),
            });
        }
        Ok(())
    }

    fn begin(&mut self, fact: &FactRef, kind: FactKind, phase: MutationPhase, call: &'static str) -> Result<()> {
        self.expect_kind(fact, kind, call)?;
        self.registry.begin(fact, kind, phase, call)?;
        Ok(())
    }

    fn finish(&mut self, fact: &FactRef, kind: FactKind, phase: MutationPhase, call: &'static str) -> Result<()> {
        self.expect_kind(fact, kind, call)?;
        self.registry.finish(fact, &phase, call)?;
        Ok(())
    }

    fn reset(&mut self) {
        self.nodes = self.network.nodes.iter().map(|spec| spec.instantiate()).collect();
        self.arena.clear();
        self.registry.clear();
    }

    /// Propagates a fact that was just tracked, untracking it again if
    /// propagation fails.
    fn insert_tracked(&mut self, fact: &FactRef, call: &'static str) -> Result<()> {
        if let Err(error) = self.propagate_insert(fact) {
            self.registry.untrack(fact, call)?;
            return Err(error.into());
        }
        Ok(())
    }

    /// Inserts into every entry node of the fact's class, or into none.
    fn propagate_insert(&mut self, fact: &FactRef) -> Result<(), PropagationError> {
        let network = Arc::clone(&self.network);
        let entry_points = network.entry_points.get(&fact.type_id());
        for id in entry_points.into_iter().flatten() {
            entry_node(&mut self.nodes[*id])?.ensure_absent(fact)?;
        }
        for id in entry_points.into_iter().flatten() {
            entry_node(&mut self.nodes[*id])?.insert_fact(fact, &mut self.arena)?;
        }
        Ok(())
    }

    fn propagate_update(&mut self, fact: &FactRef) -> Result<(), PropagationError> {
        let network = Arc::clone(&self.network);
        for id in network.entry_points.get(&fact.type_id()).into_iter().flatten() {
            entry_node(&mut self.nodes[*id])?.update_fact(fact, &mut self.arena)?;
        }
        Ok(())
    }

    fn propagate_retract(&mut self, fact: &FactRef) -> Result<(), PropagationError> {
        let network = Arc::clone(&self.network);
        for id in network.entry_points.get(&fact.type_id()).into_iter().flatten() {
            entry_node(&mut self.nodes[*id])?.retract_fact(fact, &mut self.arena)?;
        }
        Ok(())
    }
}

fn entry_node<Sc: Score>(node: &mut Box<dyn Node<Sc>>) -> Result<&mut ForEachNode, PropagationError> {
    let label = node.label().to_string();
    node.as_for_each_mut()
        .ok_or(PropagationError::NotAnEntryNode { node: label })
}

impl<Sc: Score> fmt::Debug for ScoreDirector<Sc> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScoreDirector")
            .field("facts", &self.registry.len())
            .field("tuples", &self.arena.len())
            .field("cycles", &self.cycles)
            .field("mode", &self.mode)
            .finish()
    }
}
