//! Course state store: everything a course sync has persisted.
//!
//! Persists a [`CourseState`] JSON document at
//! `<home>/.coursesync/state/<course_name>.json`.
//! Writes use the same atomic `.tmp` + rename pattern as the registry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use coursesync_reconcile::ExistingEntity;

use crate::error::{io_err, SyncError};
use crate::records::{
    Assessment, AssessmentModule, AssessmentSet, CourseInstance, CourseRecord, Question, Tag, Topic,
};

/// Relative course file path → SHA-256 hex digest at the last sync.
pub type FileHashes = BTreeMap<String, String>;

/// On-disk course state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourseState {
    pub synced_at: Option<DateTime<Utc>>,
    pub files: FileHashes,
    pub course: Option<CourseRecord>,
    pub topics: Vec<ExistingEntity<Topic>>,
    pub tags: Vec<ExistingEntity<Tag>>,
    pub assessment_sets: Vec<ExistingEntity<AssessmentSet>>,
    pub assessment_modules: Vec<ExistingEntity<AssessmentModule>>,
    pub questions: Vec<ExistingEntity<Question>>,
    pub course_instances: Vec<ExistingEntity<CourseInstance>>,
    /// Assessments per course instance short name.
    pub assessments: BTreeMap<String, Vec<ExistingEntity<Assessment>>>,
}

impl CourseState {
    pub fn course_instance_names(&self) -> impl Iterator<Item = &str> {
        self.course_instances.iter().map(|ci| ci.name())
    }

    pub fn has_course_instance(&self, name: &str) -> bool {
        self.course_instances.iter().any(|ci| ci.name() == name)
    }

    pub fn has_topic(&self, name: &str) -> bool {
        self.topics.iter().any(|t| t.name() == name)
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.name() == name)
    }

    /// Drop the assessments of course instances that no longer have a row.
    pub fn prune_orphan_assessments(&mut self) -> Vec<String> {
        let orphans: Vec<String> = self
            .assessments
            .keys()
            .filter(|name| !self.has_course_instance(name))
            .cloned()
            .collect();
        for name in &orphans {
            self.assessments.remove(name);
        }
        orphans
    }

    /// The entity collections only, for comparing two states.
    pub fn entities_json(&self) -> Result<serde_json::Value, SyncError> {
        let mut value = serde_json::to_value(self)?;
        if let Some(map) = value.as_object_mut() {
            map.remove("synced_at");
            map.remove("files");
        }
        Ok(value)
    }
}

/// Path to the state JSON for a given course, rooted at `home`.
///
/// `~/.coursesync/state/<course_name>.json`
pub fn state_path_at(home: &Path, course_name: &str) -> PathBuf {
    home.join(".coursesync")
        .join("state")
        .join(format!("{course_name}.json"))
}

/// `true` once the course has been synced at least once.
pub fn exists_at(home: &Path, course_name: &str) -> bool {
    state_path_at(home, course_name).exists()
}

/// Load the state for `course_name`.
///
/// Returns an empty state if the file does not yet exist.
pub fn load_at(home: &Path, course_name: &str) -> Result<CourseState, SyncError> {
    let path = state_path_at(home, course_name);
    if !path.exists() {
        return Ok(CourseState::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    Ok(serde_json::from_str(&contents)?)
}

/// Save the state for `course_name` atomically.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save_at(home: &Path, course_name: &str, state: &CourseState) -> Result<(), SyncError> {
    let path = state_path_at(home, course_name);
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid state store path")));
    };

    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(state)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}
