//! Change planning: changed file paths → which collections need a resync.
//!
//! All paths are repository-relative. Course-instance names may contain `/`,
//! so resolving the instance a path belongs to needs the set of known names.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub const COURSE_INFO_FILE: &str = "infoCourse.json";
pub const QUESTIONS_DIR: &str = "questions";
pub const QUESTION_INFO_FILE: &str = "info.json";
pub const COURSE_INSTANCES_DIR: &str = "courseInstances";
pub const COURSE_INSTANCE_INFO_FILE: &str = "infoCourseInstance.json";
pub const ASSESSMENTS_DIR: &str = "assessments";
pub const ASSESSMENT_INFO_FILE: &str = "infoAssessment.json";

// ---------------------------------------------------------------------------
// ChangeSet
// ---------------------------------------------------------------------------

/// Which collections a set of file changes affects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub sync_course: bool,
    pub sync_questions: bool,
    pub sync_course_instances: bool,
    /// Course instances whose assessments must be resynced.
    pub sync_course_instance_assessments: BTreeSet<String>,
}

impl ChangeSet {
    /// Every collection, including the assessments of each named instance.
    pub fn full<I, S>(course_instances: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sync_course: true,
            sync_questions: true,
            sync_course_instances: true,
            sync_course_instance_assessments: course_instances.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.sync_course
            && !self.sync_questions
            && !self.sync_course_instances
            && self.sync_course_instance_assessments.is_empty()
    }

    /// Union of two change sets.
    pub fn merge(&mut self, other: ChangeSet) {
        self.sync_course |= other.sync_course;
        self.sync_questions |= other.sync_questions;
        self.sync_course_instances |= other.sync_course_instances;
        self.sync_course_instance_assessments
            .extend(other.sync_course_instance_assessments);
    }

    /// `true` if any instance's assessments are in scope.
    pub fn syncs_assessments(&self) -> bool {
        !self.sync_course_instance_assessments.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Normalise a changed path: `\` separators become `/`, leading `./` is dropped.
pub fn normalize_path(path: &str) -> String {
    let mut normalized = path.replace('\\', "/");
    while let Some(rest) = normalized.strip_prefix("./") {
        normalized = rest.to_string();
    }
    normalized
}

/// The known course instance that `path` lives under, if any.
///
/// Matches are anchored on a whole path segment (`courseInstances/<name>/`)
/// and the longest matching name wins.
pub fn extract_course_instance_from_path<I, S>(known_names: I, path: &str) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let path = normalize_path(path);
    let rest = path.strip_prefix(COURSE_INSTANCES_DIR)?.strip_prefix('/')?;

    let mut best: Option<String> = None;
    for name in known_names {
        let name = name.as_ref();
        if name.is_empty() {
            continue;
        }
        let anchored = rest
            .strip_prefix(name)
            .map(|after| after.starts_with('/'))
            .unwrap_or(false);
        if anchored && best.as_ref().map_or(true, |b| name.len() > b.len()) {
            best = Some(name.to_string());
        }
    }
    best
}

/// Classify a list of changed paths into a [`ChangeSet`].
///
/// Paths that are not info files of a recognised collection are ignored.
pub fn identify_changes<P: AsRef<str>>(
    changed_paths: &[P],
    known_course_instances: &BTreeSet<String>,
) -> ChangeSet {
    let mut changes = ChangeSet::default();

    for raw in changed_paths {
        let path = normalize_path(raw.as_ref());

        if path == COURSE_INFO_FILE {
            changes.sync_course = true;
            continue;
        }

        if is_question_info_path(&path) {
            changes.sync_questions = true;
            continue;
        }

        let Some(instance) = extract_course_instance_from_path(known_course_instances, &path) else {
            continue;
        };
        let prefix_len = COURSE_INSTANCES_DIR.len() + 1 + instance.len() + 1;
        let within = &path[prefix_len..];

        if within == COURSE_INSTANCE_INFO_FILE {
            changes.sync_course_instances = true;
            changes.sync_course_instance_assessments.insert(instance);
        } else if is_assessment_info_path(within) {
            changes.sync_course_instance_assessments.insert(instance);
        }
    }

    changes
}

/// `questions/**/info.json`
fn is_question_info_path(path: &str) -> bool {
    path.strip_prefix(QUESTIONS_DIR)
        .and_then(|rest| rest.strip_prefix('/'))
        .map(|rest| rest.ends_with(&format!("/{QUESTION_INFO_FILE}")))
        .unwrap_or(false)
}

/// `assessments/**/infoAssessment.json`, relative to a course instance.
fn is_assessment_info_path(within_instance: &str) -> bool {
    within_instance
        .strip_prefix(ASSESSMENTS_DIR)
        .and_then(|rest| rest.strip_prefix('/'))
        .map(|rest| rest == ASSESSMENT_INFO_FILE || rest.ends_with(&format!("/{ASSESSMENT_INFO_FILE}")))
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Fast sync strategy
// ---------------------------------------------------------------------------

/// A shortcut that can replace a planner-scoped sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FastSyncStrategy {
    /// Every change lives under a single question directory (or is one file).
    Question { path_prefix: String },
}

/// Choose a fast strategy for `changed_paths`, if one applies.
///
/// Only changes confined to `questions/` qualify. The prefix is the longest
/// common path shared by all changes; a single changed file is its own prefix.
pub fn fast_sync_strategy<P: AsRef<str>>(changed_paths: &[P]) -> Option<FastSyncStrategy> {
    let paths: Vec<String> = changed_paths.iter().map(|p| normalize_path(p.as_ref())).collect();
    let first = paths.first()?;

    let in_questions = |p: &String| {
        p.strip_prefix(QUESTIONS_DIR)
            .map(|rest| rest.starts_with('/'))
            .unwrap_or(false)
    };
    if !paths.iter().all(in_questions) {
        return None;
    }

    let mut common: Vec<&str> = first.split('/').collect();
    for path in &paths[1..] {
        let shared = common
            .iter()
            .zip(path.split('/'))
            .take_while(|(a, b)| **a == *b)
            .count();
        common.truncate(shared);
    }

    // `questions` alone does not identify anything
    if common.len() < 2 {
        return None;
    }

    Some(FastSyncStrategy::Question {
        path_prefix: common.join("/"),
    })
}

/// `questions/a/b/info.json` → `a/b`.
pub fn qid_from_file_path(path: &str) -> String {
    let path = normalize_path(path);
    let rel = path
        .strip_prefix(QUESTIONS_DIR)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(&path);
    rel.strip_suffix(&format!("/{QUESTION_INFO_FILE}"))
        .unwrap_or(rel)
        .to_string()
}

/// Every QID a path prefix under `questions/` could belong to, shortest first.
pub fn candidate_qids(path_prefix: &str) -> Vec<String> {
    let path = normalize_path(path_prefix);
    let components: Vec<&str> = path.split('/').skip(1).filter(|c| !c.is_empty()).collect();
    (1..=components.len()).map(|n| components[..n].join("/")).collect()
}
