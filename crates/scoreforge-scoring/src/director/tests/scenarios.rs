//! End-to-end scenarios over grouped entities.

use std::sync::Arc;

use scoreforge_config::ScoringConfig;
use scoreforge_core::SimpleScore;
use scoreforge_test::GroupedEntity;

use super::{match_count, score};
use crate::director::ScoreDirector;
use crate::fact::Value;
use crate::stream::collector::count;
use crate::stream::joiner::equal;
use crate::stream::{ConstraintDefinition, ConstraintFactory};
use crate::test_utils::{compile, fact, grouped_schema};
use crate::tuple::Row;

fn group(row: Row<'_>) -> Option<String> {
    row.fact::<GroupedEntity>(0).group()
}

fn has_group(row: Row<'_>) -> bool {
    group(row).is_some()
}

fn self_join_constraints(factory: &ConstraintFactory) -> Vec<ConstraintDefinition<SimpleScore>> {
    let grouped = factory.for_each("Entity").filter(has_group);
    let same_group = grouped.join("Entity", vec![equal(group)]);
    vec![
        grouped.penalize(SimpleScore::of(1)).as_constraint("Grouped"),
        same_group
            .penalize(SimpleScore::of(1))
            .as_constraint("Same group"),
        same_group
            .filter(|r: Row| r.fact_ref(0) != r.fact_ref(1))
            .penalize(SimpleScore::of(1))
            .as_constraint("Same group pair"),
    ]
}

fn group_size_constraints(factory: &ConstraintFactory) -> Vec<ConstraintDefinition<SimpleScore>> {
    vec![factory
        .for_each("Entity")
        .group_by_collect(group, vec![count()])
        .penalize_weighted(SimpleScore::of(1), |r: Row| r.get(1).as_int().unwrap_or(0))
        .as_constraint("Group size")]
}

fn counts(director: &mut ScoreDirector<SimpleScore>) -> (usize, usize, usize) {
    (
        match_count(director, "Grouped"),
        match_count(director, "Same group"),
        match_count(director, "Same group pair"),
    )
}

// (group, size) per live match
fn group_sizes(director: &mut ScoreDirector<SimpleScore>) -> Vec<Vec<Value>> {
    let totals = director
        .constraint_match_total_map()
        .unwrap_or_else(|e| panic!("tracking is enabled: {e}"));
    let mut sizes: Vec<Vec<Value>> = totals
        .values()
        .flat_map(|total| total.matches.iter())
        .map(|m| m.justification.facts.clone())
        .collect();
    sizes.sort();
    sizes
}

#[test]
fn test_self_join_on_group() {
    let network = compile(grouped_schema(), &self_join_constraints, &ScoringConfig::default());
    let mut director = network.build_score_director();

    let e1 = Arc::new(GroupedEntity::new("E1", Some("G1")));
    let e2 = Arc::new(GroupedEntity::new("E2", None));
    director.insert_fact(&fact(&e1)).unwrap();
    director.insert_fact(&fact(&e2)).unwrap();
    // the self-join pairs E1 with itself; the pair filter drops that
    assert_eq!(counts(&mut director), (1, 1, 0));

    let e3 = Arc::new(GroupedEntity::new("E3", Some("G1")));
    director.before_entity_added(&fact(&e3)).unwrap();
    director.after_entity_added(&fact(&e3)).unwrap();
    // (E1,E1) (E1,E3) (E3,E1) (E3,E3)
    assert_eq!(counts(&mut director), (2, 4, 2));
    assert_eq!(score(&mut director), SimpleScore::of(-8));

    director.before_entity_removed(&fact(&e1)).unwrap();
    director.after_entity_removed(&fact(&e1)).unwrap();
    assert_eq!(counts(&mut director), (1, 1, 0));
    assert_eq!(score(&mut director), SimpleScore::of(-2));
}

#[test]
fn test_self_join_follows_group_changes() {
    let network = compile(grouped_schema(), &self_join_constraints, &ScoringConfig::default());
    let mut director = network.build_score_director();
    let e1 = Arc::new(GroupedEntity::new("E1", Some("G1")));
    let e2 = Arc::new(GroupedEntity::new("E2", Some("G2")));
    director.insert_fact(&fact(&e1)).unwrap();
    director.insert_fact(&fact(&e2)).unwrap();
    assert_eq!(counts(&mut director), (2, 2, 0));

    director.before_variable_changed(&fact(&e2), "group").unwrap();
    e2.set_group(Some("G1"));
    director.after_variable_changed(&fact(&e2), "group").unwrap();
    assert_eq!(counts(&mut director), (2, 4, 2));

    director.before_variable_changed(&fact(&e1), "group").unwrap();
    e1.set_group(None);
    director.after_variable_changed(&fact(&e1), "group").unwrap();
    assert_eq!(counts(&mut director), (1, 1, 0));
}

#[test]
fn test_group_count_scenario() {
    let config = ScoringConfig::default().with_constraint_match_enabled(true);
    let network = compile(grouped_schema(), &group_size_constraints, &config);
    let mut director = network.build_score_director();

    let a = Arc::new(GroupedEntity::new("A", Some("G1")));
    let b = Arc::new(GroupedEntity::new("B", Some("G1")));
    let c = Arc::new(GroupedEntity::new("C", Some("G2")));
    for entity in [&a, &b, &c] {
        director.insert_fact(&fact(entity)).unwrap();
    }
    assert_eq!(
        group_sizes(&mut director),
        vec![
            vec![Value::from("G1"), Value::Int(2)],
            vec![Value::from("G2"), Value::Int(1)],
        ]
    );
    assert_eq!(score(&mut director), SimpleScore::of(-3));

    director.retract_fact(&fact(&a)).unwrap();
    assert_eq!(
        group_sizes(&mut director),
        vec![
            vec![Value::from("G1"), Value::Int(1)],
            vec![Value::from("G2"), Value::Int(1)],
        ]
    );

    director.before_variable_changed(&fact(&b), "group").unwrap();
    b.set_group(Some("G2"));
    director.after_variable_changed(&fact(&b), "group").unwrap();
    assert_eq!(
        group_sizes(&mut director),
        vec![vec![Value::from("G2"), Value::Int(2)]]
    );
}

#[test]
fn test_ungrouped_entities_form_a_null_group() {
    let network = compile(grouped_schema(), &group_size_constraints, &ScoringConfig::default());
    let mut director = network.build_score_director();
    let loose: Vec<_> = (0..3)
        .map(|i| Arc::new(GroupedEntity::new(&format!("L{i}"), None)))
        .collect();
    for entity in &loose {
        director.insert_fact(&fact(entity)).unwrap();
    }
    assert_eq!(match_count(&mut director, "Group size"), 1);
    assert_eq!(score(&mut director), SimpleScore::of(-3));
}
