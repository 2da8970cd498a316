//! Course loader: reads every info file of a course repository.
//!
//! Problems with course content never abort loading. They are recorded as
//! errors or warnings on the affected [`InfoFile`]; only filesystem failures
//! (permissions, unreadable directories) are returned as [`SyncError`].

use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::Path;

use serde::de::DeserializeOwned;

use coursesync_core::infofile::{find_uuids, is_uuid};
use coursesync_core::schema::{AssessmentJson, CourseInstanceJson, CourseJson, QuestionJson};
use coursesync_core::InfoFile;
use coursesync_reconcile::changes::{
    ASSESSMENTS_DIR, ASSESSMENT_INFO_FILE, COURSE_INFO_FILE, COURSE_INSTANCES_DIR,
    COURSE_INSTANCE_INFO_FILE, QUESTIONS_DIR, QUESTION_INFO_FILE,
};

use crate::error::{io_err, SyncError};

// ---------------------------------------------------------------------------
// Loaded course
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CourseInstanceData {
    pub course_instance: InfoFile<CourseInstanceJson>,
    /// Keyed by assessment directory (TID) relative to `assessments/`.
    pub assessments: BTreeMap<String, InfoFile<AssessmentJson>>,
}

#[derive(Debug, Clone)]
pub struct CourseData {
    pub course: InfoFile<CourseJson>,
    /// Keyed by QID.
    pub questions: BTreeMap<String, InfoFile<QuestionJson>>,
    /// Keyed by course-instance directory relative to `courseInstances/`.
    pub course_instances: BTreeMap<String, CourseInstanceData>,
}

impl CourseData {
    pub fn topics_in_use(&self) -> BTreeSet<String> {
        self.questions
            .values()
            .filter_map(|q| q.data.as_ref())
            .map(|q| q.topic.clone())
            .filter(|t| !t.is_empty())
            .collect()
    }

    pub fn tags_in_use(&self) -> BTreeSet<String> {
        self.questions
            .values()
            .filter_map(|q| q.data.as_ref())
            .flat_map(|q| q.tags.iter().cloned())
            .collect()
    }

    pub fn assessment_sets_in_use(&self) -> BTreeSet<String> {
        self.assessments()
            .filter_map(|a| a.data.as_ref())
            .map(|a| a.set.clone())
            .collect()
    }

    pub fn assessment_modules_in_use(&self) -> BTreeSet<String> {
        self.assessments()
            .filter_map(|a| a.data.as_ref())
            .filter_map(|a| a.module.clone())
            .collect()
    }

    pub fn course_instance_names(&self) -> BTreeSet<String> {
        self.course_instances.keys().cloned().collect()
    }

    /// `true` if any info file in the course carries an error.
    pub fn has_errors(&self) -> bool {
        self.course.has_errors()
            || self.questions.values().any(InfoFile::has_errors)
            || self.course_instances.values().any(|ci| {
                ci.course_instance.has_errors() || ci.assessments.values().any(InfoFile::has_errors)
            })
    }

    /// Every error and warning, prefixed with the file it came from.
    pub fn problems(&self) -> Vec<String> {
        let mut out = Vec::new();
        push_problems(&mut out, COURSE_INFO_FILE, &self.course);
        for (qid, info) in &self.questions {
            let path = format!("{QUESTIONS_DIR}/{qid}/{QUESTION_INFO_FILE}");
            push_problems(&mut out, &path, info);
        }
        for (name, data) in &self.course_instances {
            let path = format!("{COURSE_INSTANCES_DIR}/{name}/{COURSE_INSTANCE_INFO_FILE}");
            push_problems(&mut out, &path, &data.course_instance);
            for (tid, info) in &data.assessments {
                let path =
                    format!("{COURSE_INSTANCES_DIR}/{name}/{ASSESSMENTS_DIR}/{tid}/{ASSESSMENT_INFO_FILE}");
                push_problems(&mut out, &path, info);
            }
        }
        out
    }

    fn assessments(&self) -> impl Iterator<Item = &InfoFile<AssessmentJson>> {
        self.course_instances
            .values()
            .flat_map(|ci| ci.assessments.values())
    }
}

fn push_problems<T>(out: &mut Vec<String>, path: &str, info: &InfoFile<T>) {
    out.extend(info.errors.iter().map(|e| format!("{path}: error: {e}")));
    out.extend(info.warnings.iter().map(|w| format!("{path}: warning: {w}")));
}

// ---------------------------------------------------------------------------
// Full course
// ---------------------------------------------------------------------------

/// Load every info file of the course at `course_path`.
pub fn load_full_course(course_path: &Path, ignore_hidden: bool) -> Result<CourseData, SyncError> {
    let questions = load_questions(course_path, ignore_hidden)?;
    let instance_infos = load_course_instances(course_path, ignore_hidden)?;

    let mut course_instances = BTreeMap::new();
    for (name, course_instance) in instance_infos {
        let assessments = load_assessments(course_path, &name, ignore_hidden)?;
        course_instances.insert(
            name,
            CourseInstanceData {
                course_instance,
                assessments,
            },
        );
    }

    let course = load_course_info(course_path)?;
    tracing::debug!(
        "loaded {}: {} question(s), {} course instance(s)",
        course_path.display(),
        questions.len(),
        course_instances.len()
    );

    Ok(CourseData {
        course,
        questions,
        course_instances,
    })
}

/// Load `infoCourse.json`, warning about duplicate names in its lists.
pub fn load_course_info(course_path: &Path) -> Result<InfoFile<CourseJson>, SyncError> {
    let mut info = match load_info_file::<CourseJson>(course_path, COURSE_INFO_FILE, false)? {
        Some(info) => info,
        None => InfoFile::from_error(format!("Missing JSON file: {COURSE_INFO_FILE}")),
    };

    let mut warnings = Vec::new();
    if let Some(course) = &info.data {
        let fields: [(&str, Vec<&str>); 4] = [
            ("topics", course.topics.iter().map(|t| t.name.as_str()).collect()),
            ("tags", course.tags.iter().map(|t| t.name.as_str()).collect()),
            ("assessmentSets", course.assessment_sets.iter().map(|s| s.name.as_str()).collect()),
            ("assessmentModules", course.assessment_modules.iter().map(|m| m.name.as_str()).collect()),
        ];
        for (field, names) in fields {
            if let Some(warning) = duplicate_names_warning(field, &names) {
                warnings.push(warning);
            }
        }
    }
    for warning in warnings {
        info.add_warning(warning);
    }
    Ok(info)
}

fn duplicate_names_warning(field: &str, names: &[&str]) -> Option<String> {
    let mut seen = BTreeSet::new();
    let mut duplicates: Vec<&str> = Vec::new();
    for name in names {
        if !seen.insert(*name) && !duplicates.contains(name) {
            duplicates.push(*name);
        }
    }
    if duplicates.is_empty() {
        return None;
    }
    let listed = duplicates
        .iter()
        .map(|n| format!("\"{n}\""))
        .collect::<Vec<_>>()
        .join(", ");
    Some(format!(
        "Found duplicates in '{field}': {listed}. Only the last of each duplicate will be synced."
    ))
}

pub fn load_questions(
    course_path: &Path,
    ignore_hidden: bool,
) -> Result<BTreeMap<String, InfoFile<QuestionJson>>, SyncError> {
    let mut questions =
        load_info_for_directory(course_path, QUESTIONS_DIR, QUESTION_INFO_FILE, ignore_hidden)?;
    for (qid, info) in questions.iter_mut() {
        if qid.starts_with('@') {
            info.add_error("Question IDs are not allowed to begin with '@'");
        }
    }
    check_duplicate_uuids(&mut questions, "questions");
    Ok(questions)
}

pub fn load_course_instances(
    course_path: &Path,
    ignore_hidden: bool,
) -> Result<BTreeMap<String, InfoFile<CourseInstanceJson>>, SyncError> {
    let mut instances = load_info_for_directory(
        course_path,
        COURSE_INSTANCES_DIR,
        COURSE_INSTANCE_INFO_FILE,
        ignore_hidden,
    )?;
    check_duplicate_uuids(&mut instances, "course instances");
    Ok(instances)
}

pub fn load_assessments(
    course_path: &Path,
    course_instance: &str,
    ignore_hidden: bool,
) -> Result<BTreeMap<String, InfoFile<AssessmentJson>>, SyncError> {
    let directory = format!("{COURSE_INSTANCES_DIR}/{course_instance}/{ASSESSMENTS_DIR}");
    let mut assessments =
        load_info_for_directory(course_path, &directory, ASSESSMENT_INFO_FILE, ignore_hidden)?;
    check_duplicate_uuids(&mut assessments, "assessments in this course instance");
    Ok(assessments)
}

// ---------------------------------------------------------------------------
// Info files
// ---------------------------------------------------------------------------

/// Load and parse one info file at `rel_path` (relative to the course).
///
/// Returns `Ok(None)` only when the file is missing and `tolerate_missing`
/// is set.
pub fn load_info_file<T: DeserializeOwned>(
    course_path: &Path,
    rel_path: &str,
    tolerate_missing: bool,
) -> Result<Option<InfoFile<T>>, SyncError> {
    let abs = course_path.join(rel_path);
    let contents = match std::fs::read_to_string(&abs) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound && tolerate_missing => return Ok(None),
        Err(err) => {
            return Ok(Some(InfoFile::from_error(format!(
                "Error reading JSON file {rel_path}: {err}"
            ))))
        }
    };
    Ok(Some(parse_info_file(&contents)))
}

/// Parse info file text. Malformed JSON still yields the UUID when it can
/// be found in the raw text.
pub fn parse_info_file<T: DeserializeOwned>(contents: &str) -> InfoFile<T> {
    let json: serde_json::Value = match serde_json::from_str(contents) {
        Ok(json) => json,
        Err(err) => {
            let mut info = InfoFile::from_error(format!("Error parsing JSON: {err}"));
            let uuids = find_uuids(contents);
            match uuids.as_slice() {
                [] => info.add_error("UUID not found in file"),
                [uuid] => info.uuid = Some(uuid.clone()),
                _ => info.add_error("More than one UUID found in file"),
            }
            return info;
        }
    };

    let uuid = match json.get("uuid") {
        None | Some(serde_json::Value::Null) => return InfoFile::from_error("UUID is missing"),
        Some(serde_json::Value::String(uuid)) if is_uuid(uuid) => uuid.clone(),
        Some(other) => {
            let shown = other.as_str().map(str::to_string).unwrap_or_else(|| other.to_string());
            return InfoFile::from_error(format!("UUID \"{shown}\" is not a valid v4 UUID"));
        }
    };

    match serde_json::from_value::<T>(json) {
        Ok(data) => InfoFile::new(uuid, data),
        Err(err) => {
            let mut info = InfoFile::from_error(err.to_string());
            info.uuid = Some(uuid);
            info
        }
    }
}

/// Recursively collect info files under `directory`.
///
/// A subdirectory holding `info_filename` is a leaf; one without it is
/// walked further, and if nothing is found below it an error entry is
/// recorded for it.
fn load_info_for_directory<T: DeserializeOwned>(
    course_path: &Path,
    directory: &str,
    info_filename: &str,
    ignore_hidden: bool,
) -> Result<BTreeMap<String, InfoFile<T>>, SyncError> {
    let root = course_path.join(directory);
    if !root.is_dir() {
        return Ok(BTreeMap::new());
    }
    let mut out = BTreeMap::new();
    walk_info_dir(course_path, directory, "", info_filename, ignore_hidden, &mut out)?;
    Ok(out)
}

fn walk_info_dir<T: DeserializeOwned>(
    course_path: &Path,
    directory: &str,
    relative_dir: &str,
    info_filename: &str,
    ignore_hidden: bool,
    out: &mut BTreeMap<String, InfoFile<T>>,
) -> Result<usize, SyncError> {
    let abs_dir = course_path.join(directory).join(relative_dir);
    let mut entries: Vec<_> = std::fs::read_dir(&abs_dir)
        .map_err(|e| io_err(&abs_dir, e))?
        .filter_map(|e| e.ok())
        .collect();
    entries.sort_by_key(|e| e.file_name());

    let mut found = 0;
    for entry in entries {
        let name = entry.file_name().to_string_lossy().into_owned();
        if ignore_hidden && name.starts_with('.') {
            continue;
        }
        if !entry.path().is_dir() {
            continue;
        }

        let key = if relative_dir.is_empty() {
            name
        } else {
            format!("{relative_dir}/{name}")
        };
        let info_dir = format!("{directory}/{key}");
        let info_path = format!("{info_dir}/{info_filename}");

        if let Some(info) = load_info_file::<T>(course_path, &info_path, true)? {
            out.insert(key, info);
            found += 1;
            continue;
        }

        let below = walk_info_dir(course_path, directory, &key, info_filename, ignore_hidden, out)?;
        if below == 0 {
            out.insert(
                key,
                InfoFile::from_error(format!(
                    "Missing JSON file: {info_path}. Either create the file or delete the {info_dir} directory."
                )),
            );
            found += 1;
        } else {
            found += below;
        }
    }
    Ok(found)
}

/// Warn on every info file sharing a UUID with another, and drop the UUID.
fn check_duplicate_uuids<T>(infos: &mut BTreeMap<String, InfoFile<T>>, kind: &str) {
    let mut by_uuid: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (id, info) in infos.iter() {
        if let Some(uuid) = &info.uuid {
            by_uuid.entry(uuid.clone()).or_default().push(id.clone());
        }
    }

    for (uuid, ids) in by_uuid {
        if ids.len() < 2 {
            continue;
        }
        for id in &ids {
            let others: Vec<&str> = ids.iter().filter(|o| *o != id).map(String::as_str).collect();
            if let Some(info) = infos.get_mut(id) {
                info.add_warning(format!(
                    "UUID \"{uuid}\" is used in other {kind}: {}",
                    others.join(", ")
                ));
                info.uuid = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const UUID_A: &str = "11111111-1111-4111-8111-111111111111";
    const UUID_B: &str = "22222222-2222-4222-8222-222222222222";

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn question(uuid: &str, topic: &str) -> String {
        format!(r#"{{"uuid":"{uuid}","title":"Q","topic":"{topic}","tags":["numeric"]}}"#)
    }

    #[test]
    fn nested_question_directories_are_walked() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "questions/a/info.json", &question(UUID_A, "Algebra"));
        write(dir.path(), "questions/group/b/info.json", &question(UUID_B, "Waves"));

        let questions = load_questions(dir.path(), true).unwrap();
        let qids: Vec<&str> = questions.keys().map(String::as_str).collect();
        assert_eq!(qids, vec!["a", "group/b"]);
        assert!(questions.values().all(|q| !q.has_errors()));
    }

    #[test]
    fn empty_directory_is_missing_json_error() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("questions/empty")).unwrap();

        let questions = load_questions(dir.path(), true).unwrap();
        let info = &questions["empty"];
        assert!(info.errors[0].starts_with("Missing JSON file: questions/empty/info.json"));
    }

    #[test]
    fn hidden_directories_are_skipped() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("questions/.git/objects")).unwrap();
        assert!(load_questions(dir.path(), true).unwrap().is_empty());
        assert!(!load_questions(dir.path(), false).unwrap().is_empty());
    }

    #[test]
    fn at_prefixed_qid_is_an_error() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "questions/@shared/info.json", &question(UUID_A, "T"));
        let questions = load_questions(dir.path(), true).unwrap();
        assert!(questions["@shared"]
            .errors
            .contains(&"Question IDs are not allowed to begin with '@'".to_string()));
    }

    #[test]
    fn duplicate_uuids_warn_and_drop_uuid() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "questions/a/info.json", &question(UUID_A, "T"));
        write(dir.path(), "questions/b/info.json", &question(UUID_A, "T"));

        let questions = load_questions(dir.path(), true).unwrap();
        assert_eq!(
            questions["a"].warnings,
            vec![format!("UUID \"{UUID_A}\" is used in other questions: b")]
        );
        assert!(questions["a"].uuid.is_none() && questions["b"].uuid.is_none());
    }

    #[test]
    fn malformed_json_keeps_uuid() {
        let info: InfoFile<QuestionJson> =
            parse_info_file(&format!(r#"{{"uuid": "{UUID_A}", "title": "#));
        assert!(info.has_errors());
        assert!(info.errors[0].starts_with("Error parsing JSON"));
        assert_eq!(info.uuid.as_deref(), Some(UUID_A));
    }

    #[test]
    fn missing_and_invalid_uuid_are_errors() {
        let missing: InfoFile<QuestionJson> = parse_info_file(r#"{"title":"x"}"#);
        assert_eq!(missing.errors, vec!["UUID is missing"]);

        let invalid: InfoFile<QuestionJson> = parse_info_file(r#"{"uuid":"nope"}"#);
        assert_eq!(invalid.errors, vec!["UUID \"nope\" is not a valid v4 UUID"]);
    }

    #[test]
    fn course_info_duplicates_warn() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "infoCourse.json",
            &format!(
                r#"{{"uuid":"{UUID_A}","name":"C","title":"T",
                    "topics":[{{"name":"X","color":"red1"}},{{"name":"X","color":"blue1"}}]}}"#
            ),
        );
        let info = load_course_info(dir.path()).unwrap();
        assert_eq!(
            info.warnings,
            vec!["Found duplicates in 'topics': \"X\". Only the last of each duplicate will be synced."]
        );
    }

    #[test]
    fn missing_course_info_is_an_error_not_a_failure() {
        let dir = TempDir::new().unwrap();
        let info = load_course_info(dir.path()).unwrap();
        assert!(info.has_errors());
        assert!(info.data.is_none());
    }

    #[test]
    fn names_in_use_come_from_valid_documents() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "questions/a/info.json", &question(UUID_A, "Algebra"));
        write(
            dir.path(),
            "courseInstances/Sp24/infoCourseInstance.json",
            &format!(r#"{{"uuid":"{UUID_B}"}}"#),
        );
        write(
            dir.path(),
            "courseInstances/Sp24/assessments/hw1/infoAssessment.json",
            r#"{"uuid":"33333333-3333-4333-8333-333333333333","type":"Homework","title":"HW1","set":"Homework","number":"1","module":"Basics"}"#,
        );

        let course = load_full_course(dir.path(), true).unwrap();
        assert_eq!(course.topics_in_use().into_iter().collect::<Vec<_>>(), vec!["Algebra"]);
        assert!(course.tags_in_use().contains("numeric"));
        assert!(course.assessment_sets_in_use().contains("Homework"));
        assert!(course.assessment_modules_in_use().contains("Basics"));
        assert_eq!(course.course_instance_names().len(), 1);
    }
}
