//! Operator behavior observed through a director: collectors, existence
//! checks, set operators and flattening.

use std::sync::Arc;

use scoreforge_config::ScoringConfig;
use scoreforge_core::SimpleScore;
use scoreforge_test::{Employee, Shift, ShiftSchedule};

use super::{match_count, score};
use crate::error::{CollectorError, PropagationError, ScoringError};
use crate::fact::Value;
use crate::stream::collector::{average, conditionally, count, max, min, sum, to_set};
use crate::stream::joiner::equal_by;
use crate::stream::{ConstraintDefinition, ConstraintFactory, Mapper};
use crate::test_utils::{compile, fact, schedule_facts, shift_schema};
use crate::tuple::Row;

type Definitions = Vec<ConstraintDefinition<SimpleScore>>;

fn shift(row: Row<'_>) -> &Shift {
    row.fact::<Shift>(0)
}

fn employee_id(row: Row<'_>) -> i64 {
    row.fact::<Employee>(0).id
}

fn shift_employee(row: Row<'_>) -> Option<i64> {
    shift(row).employee()
}

fn int(row: Row<'_>, index: usize) -> i64 {
    row.get(index).as_int().unwrap_or(0)
}

// ============================================================================
// Collectors
// ============================================================================

#[test]
fn test_min_max_fall_back_after_extremum_leaves() {
    let provider = |factory: &ConstraintFactory| -> Definitions {
        vec![factory
            .for_each_including_unassigned("Shift")
            .collect(vec![min(|r: Row| shift(r).start), max(|r: Row| shift(r).start)])
            .penalize_weighted(SimpleScore::of(1), |r: Row| int(r, 1) - int(r, 0))
            .as_constraint("Spread")]
    };
    let network = compile(shift_schema(), &provider, &ScoringConfig::default());
    let mut director = network.build_score_director();
    // starts 6, 10, 14, 18
    let schedule = ShiftSchedule::generate(0, 1, 4);
    director.set_working_solution(&schedule_facts(&schedule)).unwrap();
    assert_eq!(score(&mut director), SimpleScore::of(-12));

    director.retract_fact(&fact(&schedule.shifts[3])).unwrap();
    assert_eq!(score(&mut director), SimpleScore::of(-8));

    director.retract_fact(&fact(&schedule.shifts[0])).unwrap();
    assert_eq!(score(&mut director), SimpleScore::of(-4));

    director.retract_fact(&fact(&schedule.shifts[1])).unwrap();
    director.retract_fact(&fact(&schedule.shifts[2])).unwrap();
    assert_eq!(score(&mut director), SimpleScore::of(0));
    assert_eq!(match_count(&mut director, "Spread"), 0);
    assert_eq!(director.tuple_count(), 0);
}

#[test]
fn test_sum_average_and_conditional_collectors() {
    let provider = |factory: &ConstraintFactory| -> Definitions {
        let hours = factory
            .for_each_including_unassigned("Shift")
            .collect(vec![
                sum(|r: Row| shift(r).hours()),
                average(|r: Row| shift(r).start),
                conditionally(|r: Row| shift(r).is_assigned(), count()),
            ]);
        vec![
            hours
                .penalize_weighted(SimpleScore::of(1), |r: Row| int(r, 0))
                .as_constraint("Total hours"),
            hours
                .filter(|r: Row| r.get(1).as_float() == Some(8.0))
                .penalize(SimpleScore::of(1000))
                .as_constraint("Average start at eight"),
            hours
                .penalize_weighted(SimpleScore::of(100), |r: Row| int(r, 2))
                .as_constraint("Assigned shifts"),
        ]
    };
    let network = compile(shift_schema(), &provider, &ScoringConfig::default());
    let mut director = network.build_score_director();
    // starts 6 and 10, 8 hours each
    let schedule = ShiftSchedule::generate(1, 1, 2);
    director.set_working_solution(&schedule_facts(&schedule)).unwrap();
    assert_eq!(score(&mut director), SimpleScore::of(-16 - 1000));

    let first = fact(&schedule.shifts[0]);
    director.before_variable_changed(&first, "employee").unwrap();
    schedule.shifts[0].assign(Some(0));
    director.after_variable_changed(&first, "employee").unwrap();
    assert_eq!(score(&mut director), SimpleScore::of(-16 - 1000 - 100));

    director.retract_fact(&first).unwrap();
    assert_eq!(score(&mut director), SimpleScore::of(-8));
}

#[test]
fn test_to_set_collects_distinct_days() {
    let provider = |factory: &ConstraintFactory| -> Definitions {
        vec![factory
            .for_each_including_unassigned("Shift")
            .collect(vec![to_set(|r: Row| shift(r).day)])
            .penalize_weighted(SimpleScore::of(1), |r: Row| {
                r.get(0).as_set().map_or(0, |days| days.len() as i64)
            })
            .as_constraint("Days")]
    };
    let network = compile(shift_schema(), &provider, &ScoringConfig::default());
    let mut director = network.build_score_director();
    let schedule = ShiftSchedule::generate(0, 3, 2);
    director.set_working_solution(&schedule_facts(&schedule)).unwrap();
    assert_eq!(score(&mut director), SimpleScore::of(-3));

    // one of day 2's shifts leaves; the day stays
    director.retract_fact(&fact(&schedule.shifts[5])).unwrap();
    assert_eq!(score(&mut director), SimpleScore::of(-3));
    director.retract_fact(&fact(&schedule.shifts[4])).unwrap();
    assert_eq!(score(&mut director), SimpleScore::of(-2));
}

#[test]
fn test_overflowing_sum_and_score_are_reported() {
    let summed = |factory: &ConstraintFactory| -> Definitions {
        vec![factory
            .for_each_including_unassigned("Shift")
            .collect(vec![sum(|_: Row| i64::MAX)])
            .penalize(SimpleScore::of(1))
            .as_constraint("Saturated")]
    };
    let weighed = |factory: &ConstraintFactory| -> Definitions {
        vec![factory
            .for_each_including_unassigned("Shift")
            .penalize_weighted(SimpleScore::of(1), |_: Row| i64::MAX)
            .as_constraint("Heavy")]
    };
    let schedule = ShiftSchedule::generate(0, 1, 2);

    let network = compile(shift_schema(), &summed, &ScoringConfig::default());
    let mut director = network.build_score_director();
    director.insert_fact(&fact(&schedule.shifts[0])).unwrap();
    assert_eq!(score(&mut director), SimpleScore::of(-1));
    director.insert_fact(&fact(&schedule.shifts[1])).unwrap();
    assert!(matches!(
        director.calculate_score(),
        Err(ScoringError::Propagation(PropagationError::Collector {
            source: CollectorError::Overflow { collector: "sum" },
            ..
        }))
    ));

    let network = compile(shift_schema(), &weighed, &ScoringConfig::default());
    let mut director = network.build_score_director();
    director.set_working_solution(&schedule_facts(&schedule)).unwrap();
    assert!(matches!(
        director.calculate_score(),
        Err(ScoringError::Propagation(PropagationError::ScoreOverflow { constraint })) if constraint == "Heavy"
    ));
}

// ============================================================================
// Existence
// ============================================================================

#[test]
fn test_exists_and_not_exists_partition_the_left_side() {
    let provider = |factory: &ConstraintFactory| -> Definitions {
        let employees = factory.for_each("Employee");
        let works = || vec![equal_by(employee_id, shift_employee)];
        vec![
            employees
                .if_exists("Shift", works())
                .penalize(SimpleScore::of(1))
                .as_constraint("Working"),
            employees
                .if_not_exists("Shift", works())
                .penalize(SimpleScore::of(1))
                .as_constraint("Idle"),
        ]
    };
    let network = compile(shift_schema(), &provider, &ScoringConfig::default());
    let mut director = network.build_score_director();
    let schedule = ShiftSchedule::generate(4, 1, 3);
    director.set_working_solution(&schedule_facts(&schedule)).unwrap();

    let assignments = [
        [Some(0), Some(0), Some(1)],
        [Some(2), None, Some(2)],
        [None, None, None],
        [Some(3), Some(1), Some(0)],
    ];
    for assignment in assignments {
        for (shift, employee) in schedule.shifts.iter().zip(assignment) {
            let handle = fact(shift);
            director.before_variable_changed(&handle, "employee").unwrap();
            shift.assign(employee);
            director.after_variable_changed(&handle, "employee").unwrap();
        }
        let working = match_count(&mut director, "Working");
        let idle = match_count(&mut director, "Idle");
        assert_eq!(working + idle, schedule.employees.len());
        assert_eq!(working, schedule.shifts_per_employee().len());
        assert_eq!(idle, schedule.idle_employee_count());
    }
}

#[test]
fn test_exists_including_unassigned_sees_unassigned_entities() {
    let provider = |factory: &ConstraintFactory| -> Definitions {
        vec![
            factory
                .for_each("Employee")
                .if_exists("Shift", Vec::new())
                .penalize(SimpleScore::of(1))
                .as_constraint("Any assigned shift"),
            factory
                .for_each("Employee")
                .if_exists_including_unassigned("Shift", Vec::new())
                .penalize(SimpleScore::of(1))
                .as_constraint("Any shift"),
        ]
    };
    let network = compile(shift_schema(), &provider, &ScoringConfig::default());
    let mut director = network.build_score_director();
    let schedule = ShiftSchedule::generate(2, 1, 1);
    director.set_working_solution(&schedule_facts(&schedule)).unwrap();
    assert_eq!(match_count(&mut director, "Any assigned shift"), 0);
    assert_eq!(match_count(&mut director, "Any shift"), 2);
}

#[test]
fn test_if_not_exists_stream_against_derived_tuples() {
    // employees with no shift starting after noon
    let provider = |factory: &ConstraintFactory| -> Definitions {
        let late = factory.for_each("Shift").filter(|r: Row| shift(r).start >= 12);
        vec![factory
            .for_each("Employee")
            .if_not_exists_stream(&late, vec![equal_by(employee_id, shift_employee)])
            .penalize(SimpleScore::of(1))
            .as_constraint("No late shift")]
    };
    let network = compile(shift_schema(), &provider, &ScoringConfig::default());
    let mut director = network.build_score_director();
    // starts 6, 10, 14
    let schedule = ShiftSchedule::generate(2, 1, 3);
    schedule.shifts[2].assign(Some(1));
    director.set_working_solution(&schedule_facts(&schedule)).unwrap();
    assert_eq!(score(&mut director), SimpleScore::of(-1));

    let late = fact(&schedule.shifts[2]);
    director.before_variable_changed(&late, "employee").unwrap();
    schedule.shifts[2].assign(Some(0));
    director.after_variable_changed(&late, "employee").unwrap();
    assert_eq!(score(&mut director), SimpleScore::of(-1));

    director.before_entity_removed(&late).unwrap();
    director.after_entity_removed(&late).unwrap();
    assert_eq!(score(&mut director), SimpleScore::of(-2));
}

// ============================================================================
// Set operators
// ============================================================================

#[test]
fn test_concat_keeps_multiplicity() {
    let provider = |factory: &ConstraintFactory| -> Definitions {
        let shifts = factory.for_each_including_unassigned("Shift");
        let employees = factory.for_each("Employee");
        vec![
            shifts
                .concat(&employees)
                .penalize(SimpleScore::of(1))
                .as_constraint("Everything"),
            shifts
                .concat(&shifts)
                .penalize(SimpleScore::of(1))
                .as_constraint("Shifts twice"),
        ]
    };
    let network = compile(shift_schema(), &provider, &ScoringConfig::default());
    let mut director = network.build_score_director();
    let schedule = ShiftSchedule::generate(3, 2, 2);
    director.set_working_solution(&schedule_facts(&schedule)).unwrap();
    assert_eq!(match_count(&mut director, "Everything"), 4 + 3);
    assert_eq!(match_count(&mut director, "Shifts twice"), 8);

    director.retract_fact(&fact(&schedule.shifts[0])).unwrap();
    director.retract_fact(&fact(&schedule.employees[0])).unwrap();
    assert_eq!(match_count(&mut director, "Everything"), 3 + 2);
    assert_eq!(match_count(&mut director, "Shifts twice"), 6);
}

#[test]
fn test_concat_pads_the_shorter_side() {
    let provider = |factory: &ConstraintFactory| -> Definitions {
        let pairs = factory
            .for_each("Employee")
            .join("Shift", vec![equal_by(employee_id, shift_employee)]);
        vec![factory
            .for_each("Employee")
            .concat(&pairs)
            .filter(|r: Row| r.len() == 2 && r.get(1).is_null())
            .penalize(SimpleScore::of(1))
            .as_constraint("Padded")]
    };
    let network = compile(shift_schema(), &provider, &ScoringConfig::default());
    let mut director = network.build_score_director();
    let schedule = ShiftSchedule::generate(2, 1, 2);
    schedule.shifts[0].assign(Some(0));
    director.set_working_solution(&schedule_facts(&schedule)).unwrap();
    assert_eq!(score(&mut director), SimpleScore::of(-2));
}

#[test]
fn test_distinct_collapses_equal_tuples() {
    let provider = |factory: &ConstraintFactory| -> Definitions {
        let days = factory
            .for_each_including_unassigned("Shift")
            .map(|r: Row| shift(r).day);
        vec![
            days.penalize(SimpleScore::of(1)).as_constraint("Shift days"),
            days.distinct()
                .penalize(SimpleScore::of(1))
                .as_constraint("Working days"),
        ]
    };
    let network = compile(shift_schema(), &provider, &ScoringConfig::default());
    let mut director = network.build_score_director();
    let schedule = ShiftSchedule::generate(0, 2, 3);
    director.set_working_solution(&schedule_facts(&schedule)).unwrap();
    assert_eq!(match_count(&mut director, "Shift days"), 6);
    assert_eq!(match_count(&mut director, "Working days"), 2);

    for shift in &schedule.shifts[3..] {
        director.retract_fact(&fact(shift)).unwrap();
    }
    assert_eq!(match_count(&mut director, "Working days"), 1);
}

#[test]
fn test_complement_fills_in_missing_facts() {
    // shift count per employee, idle employees included with zero
    let provider = |factory: &ConstraintFactory| -> Definitions {
        vec![factory
            .for_each("Employee")
            .join("Shift", vec![equal_by(employee_id, shift_employee)])
            .group_by_collect(|r: Row| r.get(0).clone(), vec![count()])
            .complement("Employee", vec![Mapper::new(|_: Row| 0i64)])
            .penalize_weighted(SimpleScore::of(1), |r: Row| int(r, 1))
            .as_constraint("Workload")]
    };
    let network = compile(shift_schema(), &provider, &ScoringConfig::default());
    let mut director = network.build_score_director();
    let schedule = ShiftSchedule::generate(3, 1, 3);
    schedule.shifts[0].assign(Some(0));
    schedule.shifts[1].assign(Some(0));
    director.set_working_solution(&schedule_facts(&schedule)).unwrap();
    assert_eq!(match_count(&mut director, "Workload"), 3);
    assert_eq!(score(&mut director), SimpleScore::of(-2));

    let moved = fact(&schedule.shifts[1]);
    director.before_variable_changed(&moved, "employee").unwrap();
    schedule.shifts[1].assign(Some(2));
    director.after_variable_changed(&moved, "employee").unwrap();
    assert_eq!(match_count(&mut director, "Workload"), 3);
    assert_eq!(score(&mut director), SimpleScore::of(-2));

    let employee = Arc::new(Employee::new(7, "Late hire"));
    director.before_problem_fact_added(&fact(&employee)).unwrap();
    director.after_problem_fact_added(&fact(&employee)).unwrap();
    assert_eq!(match_count(&mut director, "Workload"), 4);
}

// ============================================================================
// Flattening and expansion
// ============================================================================

#[test]
fn test_flatten_last_expands_and_retracts() {
    let provider = |factory: &ConstraintFactory| -> Definitions {
        let hours = factory
            .for_each_including_unassigned("Shift")
            .flatten_last(|r: Row| {
                let s = shift(r);
                (s.start..s.end).map(Value::from).collect()
            });
        vec![
            hours.penalize(SimpleScore::of(1)).as_constraint("Hours"),
            hours
                .distinct()
                .penalize(SimpleScore::of(1))
                .as_constraint("Covered hours"),
        ]
    };
    let network = compile(shift_schema(), &provider, &ScoringConfig::default());
    let mut director = network.build_score_director();
    // 06-14 and 10-18
    let schedule = ShiftSchedule::generate(0, 1, 2);
    director.set_working_solution(&schedule_facts(&schedule)).unwrap();
    assert_eq!(match_count(&mut director, "Hours"), 16);
    assert_eq!(match_count(&mut director, "Covered hours"), 12);

    director.retract_fact(&fact(&schedule.shifts[0])).unwrap();
    assert_eq!(match_count(&mut director, "Hours"), 8);
    assert_eq!(match_count(&mut director, "Covered hours"), 8);
}

#[test]
fn test_expand_appends_computed_elements() {
    let provider = |factory: &ConstraintFactory| -> Definitions {
        vec![factory
            .for_each("Shift")
            .expand(|r: Row| shift(r).hours())
            .filter(|r: Row| r.len() == 2)
            .penalize_weighted(SimpleScore::of(1), |r: Row| int(r, 1))
            .as_constraint("Assigned hours")]
    };
    let network = compile(shift_schema(), &provider, &ScoringConfig::default());
    let mut director = network.build_score_director();
    let schedule = ShiftSchedule::generate(1, 1, 3);
    schedule.shifts[1].assign(Some(0));
    director.set_working_solution(&schedule_facts(&schedule)).unwrap();
    assert_eq!(score(&mut director), SimpleScore::of(-8));
}
