use scoreforge_config::ScoringConfig;
use scoreforge_core::SimpleScore;
use scoreforge_test::{GroupedEntity, Shift};

use super::ConstraintNetwork;
use crate::error::{ConstraintConfigError, ScoringError};
use crate::fact::DomainSchema;
use crate::stream::collector::count;
use crate::stream::joiner::equal;
use crate::stream::{ConstraintDefinition, ConstraintFactory, ConstraintProvider, Mapper};
use crate::test_utils::{compile, grouped_schema, shift_schema};
use crate::tuple::Row;

type Definitions = Vec<ConstraintDefinition<SimpleScore>>;

fn unassigned(row: Row<'_>) -> bool {
    !row.fact::<Shift>(0).is_assigned()
}

fn compile_error<P>(schema: DomainSchema, provider: &P, config: &ScoringConfig) -> ConstraintConfigError
where
    P: ConstraintProvider<SimpleScore>,
{
    match ConstraintNetwork::compile(schema, provider, config) {
        Err(ScoringError::Config(e)) => e,
        Err(other) => panic!("expected a configuration error, got {other}"),
        Ok(network) => panic!("compilation should fail, got {network:?}"),
    }
}

#[test]
fn test_identical_chains_share_nodes() {
    let provider = |factory: &ConstraintFactory| -> Definitions {
        vec![
            factory
                .for_each_including_unassigned("Shift")
                .filter(unassigned)
                .penalize(SimpleScore::of(1))
                .as_constraint("A"),
            factory
                .for_each_including_unassigned("Shift")
                .filter(unassigned)
                .penalize(SimpleScore::of(2))
                .as_constraint("B"),
        ]
    };

    let shared = compile(shift_schema(), &provider, &ScoringConfig::default());
    assert_eq!(shared.count_nodes("for_each"), 1);
    assert_eq!(shared.count_nodes("filter"), 1);
    assert_eq!(shared.count_nodes("scorer"), 2);

    let config = ScoringConfig::default().with_node_sharing(false);
    let unshared = compile(shift_schema(), &provider, &config);
    assert_eq!(unshared.count_nodes("for_each"), 2);
    assert_eq!(unshared.count_nodes("filter"), 2);
    assert_eq!(unshared.node_count(), 6);
}

#[test]
fn test_separate_capturing_closures_are_not_shared() {
    let provider = |factory: &ConstraintFactory| -> Definitions {
        let start = 10;
        let late = |name: &str| {
            factory
                .for_each("Shift")
                .filter(move |r: Row| r.fact::<Shift>(0).start >= start)
                .penalize(SimpleScore::of(1))
                .as_constraint(name)
        };
        vec![late("A"), late("B")]
    };
    let network = compile(shift_schema(), &provider, &ScoringConfig::default());
    assert_eq!(network.count_nodes("for_each"), 1);
    assert_eq!(network.count_nodes("filter"), 2);
}

#[test]
fn test_reused_stream_compiles_once_without_sharing() {
    let provider = |factory: &ConstraintFactory| -> Definitions {
        let start = 10;
        let late = factory
            .for_each("Shift")
            .filter(move |r: Row| r.fact::<Shift>(0).start >= start);
        vec![
            late.penalize(SimpleScore::of(1)).as_constraint("A"),
            late.clone().penalize(SimpleScore::of(1)).as_constraint("B"),
        ]
    };
    let config = ScoringConfig::default().with_node_sharing(false);
    let network = compile(shift_schema(), &provider, &config);
    assert_eq!(network.count_nodes("filter"), 1);
    assert_eq!(network.count_nodes("scorer"), 2);
}

#[test]
fn test_unique_pair_reuses_the_class_entry_point() {
    let provider = |factory: &ConstraintFactory| -> Definitions {
        vec![
            factory
                .for_each_unique_pair("Shift", vec![equal(|r: Row| r.fact::<Shift>(0).employee())])
                .penalize(SimpleScore::of(1))
                .as_constraint("Pair"),
            factory
                .for_each("Shift")
                .penalize(SimpleScore::of(1))
                .as_constraint("Any"),
        ]
    };
    let network = compile(shift_schema(), &provider, &ScoringConfig::default());
    assert_eq!(network.count_nodes("for_each"), 1);
    assert_eq!(network.count_nodes("join"), 1);
    // for_each, join, scorer
    assert_eq!(network.layer_count(), 3);
}

#[test]
fn test_distinct_and_group_nodes_are_named() {
    let provider = |factory: &ConstraintFactory| -> Definitions {
        vec![
            factory
                .for_each("Shift")
                .map(|r: Row| r.fact::<Shift>(0).day)
                .distinct()
                .penalize(SimpleScore::of(1))
                .as_constraint("Working days"),
            factory
                .for_each("Shift")
                .group_by_collect(|r: Row| r.fact::<Shift>(0).day, vec![count()])
                .penalize(SimpleScore::of(1))
                .as_constraint("Shifts per day"),
        ]
    };
    let network = compile(shift_schema(), &provider, &ScoringConfig::default());
    assert_eq!(network.count_nodes("distinct"), 1);
    assert_eq!(network.count_nodes("group_by"), 1);
    assert_eq!(network.count_nodes("map"), 1);
}

#[test]
fn test_zero_weight_constraint_is_inactive() {
    let provider = |factory: &ConstraintFactory| -> Definitions {
        vec![
            factory
                .for_each_including_unassigned("Shift")
                .penalize(SimpleScore::of(0))
                .as_constraint("Off"),
            factory
                .for_each_including_unassigned("Shift")
                .filter(unassigned)
                .penalize(SimpleScore::of(1))
                .as_constraint("Disabled by config"),
        ]
    };
    let config = ScoringConfig::default().with_constraint_weight("Disabled by config", "0");
    let network = compile(shift_schema(), &provider, &config);
    assert_eq!(network.constraints().len(), 2);
    assert_eq!(network.active_constraint_count(), 0);
    assert_eq!(network.node_count(), 0);
}

#[test]
fn test_weight_override_prefers_full_name() {
    let provider = |factory: &ConstraintFactory| -> Definitions {
        vec![factory
            .for_each("Shift")
            .penalize(SimpleScore::of(1))
            .as_constraint_in("scheduling", "Cost")]
    };
    let config = ScoringConfig::default()
        .with_constraint_weight("Cost", "3")
        .with_constraint_weight("scheduling/Cost", "7");
    let network = compile(shift_schema(), &provider, &config);
    assert_eq!(network.constraints()[0].weight, SimpleScore::of(7));
    assert!(network.constraints()[0].is_active());
}

#[test]
fn test_unknown_class() {
    let provider = |factory: &ConstraintFactory| -> Definitions {
        vec![factory
            .for_each("Nope")
            .penalize(SimpleScore::of(1))
            .as_constraint("A")]
    };
    let error = compile_error(shift_schema(), &provider, &ScoringConfig::default());
    assert!(matches!(error, ConstraintConfigError::UnknownClass(name) if name == "Nope"));
}

#[test]
fn test_exists_target_without_concrete_class() {
    let mut schema = shift_schema();
    schema.abstract_class("Ghost");
    let provider = |factory: &ConstraintFactory| -> Definitions {
        vec![factory
            .for_each("Shift")
            .if_exists("Ghost", Vec::new())
            .penalize(SimpleScore::of(1))
            .as_constraint("A")]
    };
    let error = compile_error(schema, &provider, &ScoringConfig::default());
    assert!(matches!(
        error,
        ConstraintConfigError::UnrelatedExistsTarget { class } if class == "Ghost"
    ));
}

#[test]
fn test_arity_overflow() {
    let provider = |factory: &ConstraintFactory| -> Definitions {
        vec![factory
            .for_each("Shift")
            .join("Shift", Vec::new())
            .join("Shift", Vec::new())
            .join("Shift", Vec::new())
            .join("Shift", Vec::new())
            .penalize(SimpleScore::of(1))
            .as_constraint("A")]
    };
    let error = compile_error(shift_schema(), &provider, &ScoringConfig::default());
    assert!(matches!(
        error,
        ConstraintConfigError::ArityOverflow { arity: 5, .. }
    ));
}

#[test]
fn test_empty_group_by_and_empty_map() {
    let group = |factory: &ConstraintFactory| -> Definitions {
        vec![factory
            .for_each("Shift")
            .group_by_keys(Vec::new(), Vec::new())
            .penalize(SimpleScore::of(1))
            .as_constraint("A")]
    };
    let error = compile_error(shift_schema(), &group, &ScoringConfig::default());
    assert!(matches!(error, ConstraintConfigError::EmptyGroupBy));

    let map = |factory: &ConstraintFactory| -> Definitions {
        vec![factory
            .for_each("Shift")
            .map_all(Vec::new())
            .penalize(SimpleScore::of(1))
            .as_constraint("A")]
    };
    let error = compile_error(shift_schema(), &map, &ScoringConfig::default());
    assert!(matches!(
        error,
        ConstraintConfigError::ArityMismatch { expected: 1, actual: 0, .. }
    ));
}

#[test]
fn test_complement_padding_must_fill_the_tuple() {
    let provider = |factory: &ConstraintFactory| -> Definitions {
        vec![factory
            .for_each("Shift")
            .group_by_collect(|r: Row| r.get(0).clone(), vec![count()])
            .complement("Shift", Vec::new())
            .penalize(SimpleScore::of(1))
            .as_constraint("A")]
    };
    let error = compile_error(shift_schema(), &provider, &ScoringConfig::default());
    assert!(matches!(
        error,
        ConstraintConfigError::ArityMismatch { operation: "complement", expected: 1, actual: 0 }
    ));

    let padded = |factory: &ConstraintFactory| -> Definitions {
        vec![factory
            .for_each("Shift")
            .group_by_collect(|r: Row| r.get(0).clone(), vec![count()])
            .complement("Shift", vec![Mapper::new(|_: Row| 0i64)])
            .penalize(SimpleScore::of(1))
            .as_constraint("A")]
    };
    let network = compile(shift_schema(), &padded, &ScoringConfig::default());
    assert_eq!(network.count_nodes("if_not_exists"), 1);
    assert_eq!(network.count_nodes("concat"), 1);
}

#[test]
fn test_unique_pair_requires_planning_id() {
    let mut schema = DomainSchema::new();
    schema.entity::<GroupedEntity>("Entity");
    let provider = |factory: &ConstraintFactory| -> Definitions {
        vec![factory
            .for_each_unique_pair("Entity", Vec::new())
            .penalize(SimpleScore::of(1))
            .as_constraint("A")]
    };
    let error = compile_error(schema, &provider, &ScoringConfig::default());
    assert!(matches!(error, ConstraintConfigError::MissingPlanningId(name) if name == "Entity"));

    // same provider, with an id
    let network = compile(grouped_schema(), &provider, &ScoringConfig::default());
    assert_eq!(network.count_nodes("join"), 1);
}

#[test]
fn test_duplicate_constraint_and_mappings() {
    let twice = |factory: &ConstraintFactory| -> Definitions {
        let stream = factory.for_each("Shift");
        vec![
            stream.penalize(SimpleScore::of(1)).as_constraint_in("p", "A"),
            stream.penalize(SimpleScore::of(1)).as_constraint_in("p", "A"),
        ]
    };
    let error = compile_error(shift_schema(), &twice, &ScoringConfig::default());
    assert!(matches!(error, ConstraintConfigError::DuplicateConstraint(name) if name == "p/A"));

    let justified = |factory: &ConstraintFactory| -> Definitions {
        vec![factory
            .for_each("Shift")
            .penalize(SimpleScore::of(1))
            .justify_with(crate::api::analysis::ConstraintJustification::of_row)
            .justify_with(crate::api::analysis::ConstraintJustification::of_row)
            .as_constraint("A")]
    };
    let error = compile_error(shift_schema(), &justified, &ScoringConfig::default());
    assert!(matches!(
        error,
        ConstraintConfigError::DuplicateJustificationMapping { .. }
    ));

    let indicted = |factory: &ConstraintFactory| -> Definitions {
        vec![factory
            .for_each("Shift")
            .penalize(SimpleScore::of(1))
            .indict_with(|r: Row| r.values().to_vec())
            .indict_with(|r: Row| r.values().to_vec())
            .as_constraint("A")]
    };
    let error = compile_error(shift_schema(), &indicted, &ScoringConfig::default());
    assert!(matches!(
        error,
        ConstraintConfigError::DuplicateIndictmentMapping { .. }
    ));
}

#[test]
fn test_weight_override_errors() {
    let provider = |factory: &ConstraintFactory| -> Definitions {
        vec![factory
            .for_each("Shift")
            .penalize(SimpleScore::of(1))
            .as_constraint("A")]
    };

    let config = ScoringConfig::default().with_constraint_weight("Missing", "1");
    let error = compile_error(shift_schema(), &provider, &config);
    assert!(matches!(error, ConstraintConfigError::UnknownWeightOverride(name) if name == "Missing"));

    let config = ScoringConfig::default().with_constraint_weight("A", "heavy");
    let error = compile_error(shift_schema(), &provider, &config);
    assert!(matches!(error, ConstraintConfigError::InvalidWeight { constraint, .. } if constraint == "A"));
}

#[test]
fn test_network_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ConstraintNetwork<SimpleScore>>();
}
