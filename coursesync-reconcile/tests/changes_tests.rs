//! Parameterised change-planner tests.

use std::collections::BTreeSet;

use coursesync_reconcile::{
    candidate_qids, extract_course_instance_from_path, fast_sync_strategy, identify_changes,
    qid_from_file_path, ChangeSet, FastSyncStrategy,
};
use rstest::rstest;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn instances(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn known() -> BTreeSet<String> {
    instances(&["foo", "bar/baz"])
}

// ---------------------------------------------------------------------------
// 1. extract_course_instance_from_path
// ---------------------------------------------------------------------------

#[rstest]
#[case("courseInstances/foo/infoCourseInstance.json", Some("foo"))]
#[case("courseInstances/bar/baz/infoCourseInstance.json", Some("bar/baz"))]
#[case("courseInstances/bar/baz/assessments/x/infoAssessment.json", Some("bar/baz"))]
#[case("courseInstances/qux/infoCourseInstance.json", None)]
#[case("courseInstances/bar/infoCourseInstance.json", None)]
#[case("questions/foo/info.json", None)]
#[case("courseInstancesfoo/infoCourseInstance.json", None)]
fn extracts_known_instance(#[case] path: &str, #[case] expected: Option<&str>) {
    assert_eq!(
        extract_course_instance_from_path(&known(), path).as_deref(),
        expected
    );
}

#[test]
fn longest_match_wins_for_nested_names() {
    let names = instances(&["a", "a/b", "a/b/c"]);
    assert_eq!(
        extract_course_instance_from_path(&names, "courseInstances/a/b/c/infoCourseInstance.json"),
        Some("a/b/c".to_string())
    );
    assert_eq!(
        extract_course_instance_from_path(&names, "courseInstances/a/b/assessments/hw/infoAssessment.json"),
        Some("a/b".to_string())
    );
}

#[test]
fn match_is_anchored_on_segment_boundary() {
    let names = instances(&["foo"]);
    assert_eq!(
        extract_course_instance_from_path(&names, "courseInstances/foobar/infoCourseInstance.json"),
        None
    );
    let names = instances(&["foo", "foobar"]);
    assert_eq!(
        extract_course_instance_from_path(&names, "courseInstances/foobar/infoCourseInstance.json"),
        Some("foobar".to_string())
    );
}

#[test]
fn accepts_any_string_iterable() {
    let names = vec!["Sp24"];
    assert_eq!(
        extract_course_instance_from_path(names, "courseInstances/Sp24/infoCourseInstance.json"),
        Some("Sp24".to_string())
    );
}

// ---------------------------------------------------------------------------
// 2. identify_changes
// ---------------------------------------------------------------------------

#[test]
fn course_info_sets_only_course_flag() {
    assert_eq!(
        identify_changes(&["infoCourse.json"], &known()),
        ChangeSet {
            sync_course: true,
            ..Default::default()
        }
    );
}

#[test]
fn question_info_sets_only_questions_flag() {
    assert_eq!(
        identify_changes(&["questions/foo/info.json"], &known()),
        ChangeSet {
            sync_questions: true,
            ..Default::default()
        }
    );
}

#[test]
fn instance_info_sets_instances_and_assessments() {
    let changes = identify_changes(&["courseInstances/foo/infoCourseInstance.json"], &known());
    assert!(changes.sync_course_instances);
    assert_eq!(changes.sync_course_instance_assessments, instances(&["foo"]));
    assert!(!changes.sync_course && !changes.sync_questions);
}

#[test]
fn assessment_info_only_marks_its_instance() {
    let changes = identify_changes(
        &["courseInstances/bar/baz/assessments/x/infoAssessment.json"],
        &known(),
    );
    assert!(!changes.sync_course_instances);
    assert_eq!(changes.sync_course_instance_assessments, instances(&["bar/baz"]));
}

#[rstest]
#[case("unrelated.txt")]
#[case("questions/foo/question.html")]
#[case("questions/info.json")]
#[case("courseInstances/foo/assessments/x/clientFilesAssessment/notes.pdf")]
#[case("courseInstances/foo/clientFilesCourseInstance/syllabus.html")]
#[case("courseInstances/unknown/infoCourseInstance.json")]
#[case("elements/pl-thing/info.json")]
#[case("infoCourse.json.bak")]
fn unrelated_paths_contribute_nothing(#[case] path: &str) {
    assert!(identify_changes(&[path], &known()).is_empty(), "{path}");
}

#[test]
fn multiple_paths_accumulate() {
    let changes = identify_changes(
        &[
            "infoCourse.json",
            "questions/a/b/info.json",
            "courseInstances/foo/assessments/hw1/infoAssessment.json",
            "courseInstances/bar/baz/infoCourseInstance.json",
            "README.md",
        ],
        &known(),
    );
    assert!(changes.sync_course);
    assert!(changes.sync_questions);
    assert!(changes.sync_course_instances);
    assert_eq!(
        changes.sync_course_instance_assessments,
        instances(&["bar/baz", "foo"])
    );
}

#[test]
fn windows_and_dot_prefixed_paths_are_normalised() {
    let changes = identify_changes(
        &[".\\courseInstances\\foo\\infoCourseInstance.json", "./infoCourse.json"],
        &known(),
    );
    assert!(changes.sync_course);
    assert!(changes.sync_course_instances);
}

#[test]
fn empty_input_yields_empty_change_set() {
    let none: [&str; 0] = [];
    assert!(identify_changes(&none, &known()).is_empty());
}

// ---------------------------------------------------------------------------
// 3. Fast sync strategy
// ---------------------------------------------------------------------------

#[rstest]
#[case(&["questions/q1/info.json"], Some("questions/q1/info.json"))]
#[case(&["questions/q1/info.json", "questions/q1/question.html", "questions/q1/server.py"], Some("questions/q1"))]
#[case(&["questions/a/b/info.json", "questions/a/b/tests/test.py"], Some("questions/a/b"))]
#[case(&["questions/q1/info.json", "questions/q2/info.json"], None)]
#[case(&["questions/q1/info.json", "infoCourse.json"], None)]
#[case(&["courseInstances/foo/infoCourseInstance.json"], None)]
fn strategy_from_paths(#[case] paths: &[&str], #[case] expected: Option<&str>) {
    let strategy = fast_sync_strategy(paths);
    assert_eq!(
        strategy,
        expected.map(|p| FastSyncStrategy::Question {
            path_prefix: p.to_string()
        })
    );
}

#[test]
fn no_paths_means_no_strategy() {
    let none: [&str; 0] = [];
    assert!(fast_sync_strategy(&none).is_none());
}

#[rstest]
#[case("questions/foo/info.json", "foo")]
#[case("questions/foo/bar/info.json", "foo/bar")]
#[case("questions/topic1/subtopic/my-question/info.json", "topic1/subtopic/my-question")]
fn qid_from_info_path(#[case] path: &str, #[case] qid: &str) {
    assert_eq!(qid_from_file_path(path), qid);
}

#[test]
fn candidate_qids_from_directory_prefix() {
    assert_eq!(candidate_qids("questions/a/b"), vec!["a", "a/b"]);
    assert!(candidate_qids("questions").is_empty());
}
