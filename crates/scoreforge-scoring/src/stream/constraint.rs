//! Terminal stage of a stream: impact, weight and identity of a constraint.

use std::fmt;
use std::sync::Arc;

use scoreforge_core::{ConstraintRef, ImpactType, Score};

use super::function::IntMapper;
use super::{ConstraintFactory, Stream};
use crate::api::analysis::ConstraintJustification;
use crate::fact::Value;
use crate::tuple::Row;

/// Custom justification of a match.
pub(crate) type Justifier = Arc<dyn for<'a> Fn(Row<'a>) -> ConstraintJustification + Send + Sync>;
/// Custom list of objects blamed for a match.
pub(crate) type Indicter = Arc<dyn for<'a> Fn(Row<'a>) -> Vec<Value> + Send + Sync>;

/// A stream with its score impact, waiting for a name.
pub struct ConstraintBuilder<Sc: Score> {
    stream: Stream,
    impact: ImpactType,
    weight: Sc,
    match_weight: Option<IntMapper>,
    justifiers: Vec<Justifier>,
    indicters: Vec<Indicter>,
}

impl<Sc: Score> ConstraintBuilder<Sc> {
    pub(crate) fn new(
        stream: Stream,
        impact: ImpactType,
        weight: Sc,
        match_weight: Option<IntMapper>,
    ) -> Self {
        Self {
            stream,
            impact,
            weight,
            match_weight,
            justifiers: Vec::new(),
            indicters: Vec::new(),
        }
    }

    /// Replaces the default justification (all tuple elements).
    ///
    /// Configuring more than one is rejected when the network is compiled.
    pub fn justify_with<F>(mut self, justifier: F) -> Self
    where
        F: for<'a> Fn(Row<'a>) -> ConstraintJustification + Send + Sync + 'static,
    {
        self.justifiers.push(Arc::new(justifier));
        self
    }

    /// Replaces the default indicted objects (all non-null elements).
    ///
    /// Configuring more than one is rejected when the network is compiled.
    pub fn indict_with<F>(mut self, indicter: F) -> Self
    where
        F: for<'a> Fn(Row<'a>) -> Vec<Value> + Send + Sync + 'static,
    {
        self.indicters.push(Arc::new(indicter));
        self
    }

    /// Names the constraint within the stream's package.
    pub fn as_constraint(self, name: &str) -> ConstraintDefinition<Sc> {
        let package = self.stream.package.to_string();
        self.as_constraint_in(&package, name)
    }

    pub fn as_constraint_in(self, package: &str, name: &str) -> ConstraintDefinition<Sc> {
        ConstraintDefinition {
            constraint_ref: ConstraintRef::new(package, name),
            stream: self.stream,
            impact: self.impact,
            weight: self.weight,
            match_weight: self.match_weight,
            justifiers: self.justifiers,
            indicters: self.indicters,
        }
    }
}

impl<Sc: Score> fmt::Debug for ConstraintBuilder<Sc> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintBuilder")
            .field("impact", &self.impact)
            .field("weight", &self.weight)
            .finish()
    }
}

/// A fully described constraint, ready to be compiled into a network.
pub struct ConstraintDefinition<Sc: Score> {
    pub(crate) constraint_ref: ConstraintRef,
    pub(crate) stream: Stream,
    pub(crate) impact: ImpactType,
    pub(crate) weight: Sc,
    pub(crate) match_weight: Option<IntMapper>,
    pub(crate) justifiers: Vec<Justifier>,
    pub(crate) indicters: Vec<Indicter>,
}

impl<Sc: Score> ConstraintDefinition<Sc> {
    pub fn constraint_ref(&self) -> &ConstraintRef {
        &self.constraint_ref
    }

    pub fn impact(&self) -> ImpactType {
        self.impact
    }

    /// Weight as written in the definition, before any override.
    pub fn weight(&self) -> Sc {
        self.weight
    }
}

impl<Sc: Score> fmt::Debug for ConstraintDefinition<Sc> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintDefinition")
            .field("constraint_ref", &self.constraint_ref)
            .field("impact", &self.impact)
            .field("weight", &self.weight)
            .field("stream", &self.stream)
            .finish()
    }
}

/// Supplies the constraints of a model.
pub trait ConstraintProvider<Sc: Score> {
    fn define_constraints(&self, factory: &ConstraintFactory) -> Vec<ConstraintDefinition<Sc>>;
}

impl<Sc, F> ConstraintProvider<Sc> for F
where
    Sc: Score,
    F: Fn(&ConstraintFactory) -> Vec<ConstraintDefinition<Sc>>,
{
    fn define_constraints(&self, factory: &ConstraintFactory) -> Vec<ConstraintDefinition<Sc>> {
        self(factory)
    }
}
