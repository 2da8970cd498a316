//! Behavioural tests for the entity reconciler.
//!
//! Each test builds its own inputs; no shared state.

use std::collections::BTreeSet;

use coursesync_reconcile::{
    reconcile, reconcile_entities, DesiredEntity, EntityPlan, ExistingEntity, ReconcileInput,
    SyncEntity,
};
use rstest::rstest;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Module {
    name: String,
    heading: String,
}

impl SyncEntity for Module {
    fn name(&self) -> &str {
        &self.name
    }
    fn make_implicit(name: &str) -> Self {
        module(name, name)
    }
    fn make_default() -> Option<Self> {
        Some(module("Default", "Default module"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Tag(String);

impl SyncEntity for Tag {
    fn name(&self) -> &str {
        &self.0
    }
    fn make_implicit(name: &str) -> Self {
        Tag(name.to_string())
    }
}

fn module(name: &str, heading: &str) -> Module {
    Module {
        name: name.to_string(),
        heading: heading.to_string(),
    }
}

fn existing(number: u32, name: &str) -> ExistingEntity<Module> {
    ExistingEntity::new(Some(number), false, module(name, name))
}

fn known(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn numbered<T>(plan: &EntityPlan<T>) -> Vec<(String, u32)> {
    plan.desired()
        .into_iter()
        .map(|e: &DesiredEntity<T>| (e.name.clone(), e.number))
        .collect()
}

fn created(plan: &EntityPlan<Module>) -> Vec<&str> {
    plan.to_create.iter().map(|e| e.name.as_str()).collect()
}

fn updated(plan: &EntityPlan<Module>) -> Vec<&str> {
    plan.to_update.iter().map(|e| e.name.as_str()).collect()
}

// ---------------------------------------------------------------------------
// 1. Idempotence and numbering
// ---------------------------------------------------------------------------

#[test]
fn same_inputs_produce_identical_plans() {
    let course = vec![module("Intro", "Introduction"), module("Kinematics", "Motion")];
    let rows = vec![existing(1, "Intro"), existing(2, "Legacy")];
    let names = known(&["Waves", "Intro"]);
    let input = ReconcileInput {
        course_entities: &course,
        extra_entities: &[],
        existing_entities: &rows,
        known_names: &names,
        is_source_valid: true,
        delete_unused: true,
    };

    assert_eq!(reconcile_entities(input), reconcile_entities(input));
}

#[test]
fn numbers_are_dense_in_insertion_order() {
    let course = vec![module("Zeta", "z"), module("Alpha", "a")];
    let extras = vec![module("Extra", "e")];
    let names = known(&["Omega", "Beta", "Alpha"]);
    let plan = reconcile_entities(ReconcileInput {
        course_entities: &course,
        extra_entities: &extras,
        existing_entities: &[],
        known_names: &names,
        is_source_valid: true,
        delete_unused: true,
    });

    assert_eq!(
        numbered(&plan),
        vec![
            ("Zeta".to_string(), 1),
            ("Alpha".to_string(), 2),
            ("Beta".to_string(), 3),
            ("Omega".to_string(), 4),
            ("Default".to_string(), 5),
            ("Extra".to_string(), 6),
        ]
    );
}

#[test]
fn implicit_entities_use_factory_and_flag() {
    let names = known(&["Optics"]);
    let plan = reconcile_entities::<Module>(ReconcileInput {
        course_entities: &[],
        extra_entities: &[],
        existing_entities: &[],
        known_names: &names,
        is_source_valid: true,
        delete_unused: true,
    });

    let optics = &plan.to_create[0];
    assert_eq!(optics.name, "Optics");
    assert!(optics.implicit);
    assert_eq!(optics.data.heading, "Optics");
    let default = &plan.to_create[1];
    assert!(!default.implicit, "Default is synthesized non-implicit");
}

#[test]
fn explicit_declaration_beats_known_name() {
    let course = vec![module("Optics", "Light and lenses")];
    let names = known(&["Optics"]);
    let plan = reconcile_entities(ReconcileInput {
        course_entities: &course,
        extra_entities: &[],
        existing_entities: &[],
        known_names: &names,
        is_source_valid: true,
        delete_unused: true,
    });

    assert_eq!(plan.to_create[0].data.heading, "Light and lenses");
    assert!(!plan.to_create[0].implicit);
}

#[test]
fn extras_never_override_desired_names() {
    let course = vec![module("HW", "Course homework")];
    let extras = vec![module("HW", "Platform homework"), module("Quiz", "Quizzes")];
    let plan = reconcile_entities(ReconcileInput {
        course_entities: &course,
        extra_entities: &extras,
        existing_entities: &[],
        known_names: &BTreeSet::new(),
        is_source_valid: true,
        delete_unused: true,
    });

    let hw = plan.desired().into_iter().find(|e| e.name == "HW").expect("HW");
    assert_eq!(hw.data.heading, "Course homework");
    assert_eq!(created(&plan), vec!["HW", "Default", "Quiz"]);
}

// ---------------------------------------------------------------------------
// 2. Create / update / delete partition
// ---------------------------------------------------------------------------

#[test]
fn partition_follows_persisted_names() {
    let course = vec![module("Intro", "i"), module("New", "n")];
    let rows = vec![existing(1, "Intro"), existing(2, "Gone"), existing(3, "Default")];
    let plan = reconcile_entities(ReconcileInput {
        course_entities: &course,
        extra_entities: &[],
        existing_entities: &rows,
        known_names: &BTreeSet::new(),
        is_source_valid: true,
        delete_unused: true,
    });

    assert_eq!(created(&plan), vec!["New"]);
    assert_eq!(updated(&plan), vec!["Intro", "Default"]);
    assert_eq!(plan.to_delete, known(&["Gone"]));
}

#[test]
fn update_ignores_attribute_equality() {
    let course = vec![module("Intro", "Intro")];
    let rows = vec![existing(1, "Intro")];
    let plan = reconcile(
        ReconcileInput {
            course_entities: &course,
            extra_entities: &[],
            existing_entities: &rows,
            known_names: &BTreeSet::new(),
            is_source_valid: true,
            delete_unused: true,
        },
        Module::make_implicit,
        || None,
    );
    assert_eq!(updated(&plan), vec!["Intro"]);
    assert!(plan.to_create.is_empty());
}

#[rstest]
#[case(true, true, 2)]
#[case(false, true, 0)]
#[case(true, false, 0)]
#[case(false, false, 0)]
fn deletion_requires_opt_in_and_valid_source(
    #[case] delete_unused: bool,
    #[case] is_source_valid: bool,
    #[case] expected_deletes: usize,
) {
    let rows = vec![existing(1, "Old1"), existing(2, "Old2")];
    let plan = reconcile(
        ReconcileInput {
            course_entities: &[],
            extra_entities: &[],
            existing_entities: &rows,
            known_names: &BTreeSet::new(),
            is_source_valid,
            delete_unused,
        },
        Module::make_implicit,
        || None,
    );
    assert_eq!(plan.to_delete.len(), expected_deletes);
}

// ---------------------------------------------------------------------------
// 3. Invalid source
// ---------------------------------------------------------------------------

#[test]
fn invalid_source_reproduces_existing_rows() {
    let course = vec![module("Whatever", "ignored")];
    let mut rows = vec![existing(4, "Second"), existing(9, "First"), existing(12, "Default")];
    rows[1].implicit = true;
    let plan = reconcile_entities(ReconcileInput {
        course_entities: &course,
        extra_entities: &[],
        existing_entities: &rows,
        known_names: &BTreeSet::new(),
        is_source_valid: false,
        delete_unused: true,
    });

    assert!(plan.to_create.is_empty());
    assert!(plan.to_delete.is_empty());
    assert_eq!(updated(&plan), vec!["Second", "First", "Default"]);
    assert!(plan.to_update[1].implicit, "implicit flag carried over");
    let numbers: Vec<u32> = plan.to_update.iter().map(|e| e.number).collect();
    assert_eq!(numbers, vec![1, 2, 3], "renumbered densely in stored order");
}

#[test]
fn invalid_source_with_legacy_unnumbered_rows() {
    let rows = vec![ExistingEntity::new(None, false, Tag("legacy".into()))];
    let plan = reconcile_entities(ReconcileInput {
        course_entities: &[],
        extra_entities: &[],
        existing_entities: &rows,
        known_names: &BTreeSet::new(),
        is_source_valid: false,
        delete_unused: true,
    });
    assert_eq!(plan.to_update.len(), 1);
    assert_eq!(plan.to_update[0].number, 1);
}

// ---------------------------------------------------------------------------
// 4. Default entity
// ---------------------------------------------------------------------------

#[test]
fn default_is_last_before_extras() {
    let course = vec![module("A", "a")];
    let extras = vec![module("Z", "z")];
    let names = known(&["B", "C"]);
    let plan = reconcile_entities(ReconcileInput {
        course_entities: &course,
        extra_entities: &extras,
        existing_entities: &[],
        known_names: &names,
        is_source_valid: true,
        delete_unused: true,
    });

    let defaults: Vec<_> = plan.desired().into_iter().filter(|e| e.name == "Default").collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].number, 4);
    assert_eq!(defaults[0].data.heading, "Default module");
}

#[test]
fn known_default_name_is_not_synthesized_implicitly() {
    let names = known(&["Default"]);
    let plan = reconcile_entities::<Module>(ReconcileInput {
        course_entities: &[],
        extra_entities: &[],
        existing_entities: &[],
        known_names: &names,
        is_source_valid: true,
        delete_unused: true,
    });
    assert_eq!(plan.to_create.len(), 1);
    assert!(!plan.to_create[0].implicit);
    assert_eq!(plan.to_create[0].data.heading, "Default module");
}

#[test]
fn collections_without_default_factory_skip_it() {
    let names = known(&["easy"]);
    let plan = reconcile_entities::<Tag>(ReconcileInput {
        course_entities: &[],
        extra_entities: &[],
        existing_entities: &[],
        known_names: &names,
        is_source_valid: true,
        delete_unused: true,
    });
    let names: Vec<_> = plan.to_create.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["easy"]);
}

#[test]
fn referenced_default_without_factory_is_implicit() {
    let names = known(&["Default", "Algebra"]);
    let plan = reconcile_entities::<Tag>(ReconcileInput {
        course_entities: &[],
        extra_entities: &[],
        existing_entities: &[],
        known_names: &names,
        is_source_valid: true,
        delete_unused: true,
    });
    let created: Vec<_> = plan
        .to_create
        .iter()
        .map(|e| (e.name.as_str(), e.number, e.implicit))
        .collect();
    assert_eq!(created, vec![("Algebra", 1, true), ("Default", 2, true)]);
}

#[test]
fn referenced_default_with_factory_comes_from_factory() {
    let names = known(&["Default", "Week 1"]);
    let plan = reconcile_entities::<Module>(ReconcileInput {
        course_entities: &[],
        extra_entities: &[],
        existing_entities: &[],
        known_names: &names,
        is_source_valid: true,
        delete_unused: true,
    });
    let created: Vec<_> = plan.to_create.iter().map(|e| (e.name.as_str(), e.number)).collect();
    assert_eq!(created, vec![("Week 1", 1), ("Default", 2)]);
    assert!(!plan.to_create[1].implicit);
    assert_eq!(plan.to_create[1].data.heading, "Default module");
}

#[test]
fn existing_default_row_is_updated_not_duplicated() {
    let rows = vec![existing(1, "Default")];
    let plan = reconcile_entities(ReconcileInput {
        course_entities: &[],
        extra_entities: &[],
        existing_entities: &rows,
        known_names: &BTreeSet::new(),
        is_source_valid: true,
        delete_unused: true,
    });
    assert!(plan.to_create.is_empty());
    assert_eq!(updated(&plan), vec!["Default"]);
    assert!(plan.to_delete.is_empty());
}

// ---------------------------------------------------------------------------
// 5. Persisted row format
// ---------------------------------------------------------------------------

#[test]
fn existing_entity_flattens_attributes() {
    let row = existing(3, "Intro");
    let json = serde_json::to_value(&row).expect("serialize");
    assert_eq!(json["name"], "Intro");
    assert_eq!(json["number"], 3);
    assert_eq!(json["implicit"], false);

    let legacy: ExistingEntity<Module> =
        serde_json::from_str(r#"{"name":"Old","heading":"Old"}"#).expect("deserialize");
    assert_eq!(legacy.number, None);
    assert!(!legacy.implicit);
}
