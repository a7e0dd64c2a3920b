//! Shared helpers for the scoring crate's tests.

use std::sync::Arc;

use scoreforge_config::ScoringConfig;
use scoreforge_core::{HardSoftScore, ParseableScore};
use scoreforge_test::{Employee, GroupedEntity, Shift, ShiftSchedule};

use crate::fact::{DomainObject, DomainSchema, FactRef};
use crate::network::ConstraintNetwork;
use crate::stream::collector::count;
use crate::stream::joiner::{equal, equal_by};
use crate::stream::{ConstraintDefinition, ConstraintFactory, ConstraintProvider};
use crate::tuple::Row;

pub(crate) fn fact<T: DomainObject>(object: &Arc<T>) -> FactRef {
    FactRef::new(Arc::clone(object))
}

/// Employees as problem facts, shifts as entities assigned once they have
/// an employee.
pub(crate) fn shift_schema() -> DomainSchema {
    let mut schema = DomainSchema::new();
    schema
        .problem_fact::<Employee>("Employee")
        .planning_id(|e| e.id);
    schema
        .entity::<Shift>("Shift")
        .assigned_when(Shift::is_assigned)
        .planning_id(|s| s.id);
    schema
}

/// Grouped entities, always considered assigned.
pub(crate) fn grouped_schema() -> DomainSchema {
    let mut schema = DomainSchema::new();
    schema
        .entity::<GroupedEntity>("Entity")
        .planning_id(|e| e.name.clone());
    schema
}

pub(crate) fn compile<Sc, P>(schema: DomainSchema, provider: &P, config: &ScoringConfig) -> Arc<ConstraintNetwork<Sc>>
where
    Sc: ParseableScore,
    P: ConstraintProvider<Sc> + ?Sized,
{
    match ConstraintNetwork::compile(schema, provider, config) {
        Ok(network) => network,
        Err(e) => panic!("network should compile: {e}"),
    }
}

/// Every employee then every shift of a schedule.
pub(crate) fn schedule_facts(schedule: &ShiftSchedule) -> Vec<FactRef> {
    schedule
        .employees
        .iter()
        .map(fact)
        .chain(schedule.shifts.iter().map(fact))
        .collect()
}

fn shift(row: Row<'_>, index: usize) -> &Shift {
    row.fact::<Shift>(index)
}

/// The rules scored by [`ShiftSchedule::brute_force_score`].
pub(crate) fn scheduling_constraints(factory: &ConstraintFactory) -> Vec<ConstraintDefinition<HardSoftScore>> {
    vec![
        factory
            .for_each_unique_pair("Shift", vec![equal(|r: Row| shift(r, 0).employee())])
            .filter(|r: Row| shift(r, 0).overlaps(shift(r, 1)))
            .penalize(HardSoftScore::ONE_HARD)
            .as_constraint("Overlapping shifts"),
        factory
            .for_each_including_unassigned("Shift")
            .filter(|r: Row| !shift(r, 0).is_assigned())
            .penalize(HardSoftScore::ONE_SOFT)
            .as_constraint("Unassigned shift"),
        factory
            .for_each("Employee")
            .if_not_exists(
                "Shift",
                vec![equal_by(
                    |e: Row| e.fact::<Employee>(0).id,
                    |s: Row| shift(s, 0).employee(),
                )],
            )
            .penalize(HardSoftScore::ONE_SOFT)
            .as_constraint("Idle employee"),
        factory
            .for_each("Shift")
            .group_by_collect(|r: Row| shift(r, 0).employee(), vec![count()])
            .filter(|r: Row| r.get(1).as_int().unwrap_or(0) > 2)
            .penalize_weighted(HardSoftScore::ONE_SOFT, |r: Row| {
                r.get(1).as_int().unwrap_or(0) - 2
            })
            .as_constraint("Overloaded employee"),
    ]
}
