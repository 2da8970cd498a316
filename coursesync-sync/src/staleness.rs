//! File hashing and pending-change detection.
//!
//! Signal precedence:
//! 1. `NeverSynced` (state store missing or never stamped)
//! 2. `Pending` (course files changed since the last sync)
//! 3. `Current`

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use coursesync_core::{config, Course};
use coursesync_reconcile::{identify_changes, ChangeSet};

use crate::error::{io_err, SyncError};
use crate::store::{self, CourseState, FileHashes};
use crate::course_db;

/// Sync freshness of a registered course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StalenessSignal {
    NeverSynced,
    Current,
    /// Files changed; `changes` is what an incremental sync would touch
    /// (empty when only unrelated files changed).
    Pending { files: Vec<String>, changes: ChangeSet },
}

/// Compare the course directory with the stored hashes.
pub fn check(home: &Path, course: &Course) -> Result<StalenessSignal, SyncError> {
    let config = config::load_at(home)?;
    if !store::exists_at(home, &course.name.0) {
        return Ok(StalenessSignal::NeverSynced);
    }
    let state = store::load_at(home, &course.name.0)?;
    if state.synced_at.is_none() {
        return Ok(StalenessSignal::NeverSynced);
    }

    let current = hash_course_files(&course.path, config.ignore_hidden)?;
    let files = changed_paths(&state.files, &current);
    if files.is_empty() {
        return Ok(StalenessSignal::Current);
    }

    let known = known_course_instances(&state, &course.path, config.ignore_hidden)?;
    let changes = identify_changes(&files, &known);
    Ok(StalenessSignal::Pending { files, changes })
}

/// Course-instance names the planner should recognise: everything stored
/// plus everything currently on disk (renames leave both).
pub fn known_course_instances(
    state: &CourseState,
    course_path: &Path,
    ignore_hidden: bool,
) -> Result<BTreeSet<String>, SyncError> {
    let mut known: BTreeSet<String> = state.course_instance_names().map(str::to_string).collect();
    known.extend(course_db::load_course_instances(course_path, ignore_hidden)?.into_keys());
    Ok(known)
}

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// SHA-256 of every file below `course_path`, keyed by `/`-separated
/// relative path.
pub fn hash_course_files(course_path: &Path, ignore_hidden: bool) -> Result<FileHashes, SyncError> {
    if !course_path.is_dir() {
        return Err(SyncError::CourseDirMissing {
            path: course_path.to_path_buf(),
        });
    }
    let mut hashes = FileHashes::new();
    hash_dir(course_path, "", ignore_hidden, &mut hashes)?;
    Ok(hashes)
}

fn hash_dir(
    root: &Path,
    relative: &str,
    ignore_hidden: bool,
    out: &mut FileHashes,
) -> Result<(), SyncError> {
    let dir = root.join(relative);
    let entries = std::fs::read_dir(&dir).map_err(|e| io_err(&dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(&dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if ignore_hidden && name.starts_with('.') {
            continue;
        }
        let rel = if relative.is_empty() {
            name
        } else {
            format!("{relative}/{name}")
        };
        let path = entry.path();
        if path.is_dir() {
            hash_dir(root, &rel, ignore_hidden, out)?;
        } else if path.is_file() {
            out.insert(rel, hash_file(&path)?);
        }
    }
    Ok(())
}

/// SHA-256 hex digest of a file's bytes.
pub fn hash_file(path: &Path) -> Result<String, SyncError> {
    let content = std::fs::read(path).map_err(|e| io_err(path, e))?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(hex::encode(hasher.finalize()))
}

/// Paths added, modified, or removed between two hash maps, sorted.
pub fn changed_paths(old: &FileHashes, new: &FileHashes) -> Vec<String> {
    let mut changed: BTreeSet<&String> = BTreeSet::new();
    for (path, digest) in new {
        if old.get(path) != Some(digest) {
            changed.insert(path);
        }
    }
    for path in old.keys() {
        if !new.contains_key(path) {
            changed.insert(path);
        }
    }
    changed.into_iter().cloned().collect()
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Format age from a chrono timestamp (state store `synced_at`).
pub fn format_datetime_age(timestamp: DateTime<Utc>) -> String {
    let age = Utc::now().signed_duration_since(timestamp).num_seconds().max(0) as u64;
    format_seconds(age)
}

pub fn format_seconds(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 60 * 60 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h", seconds / (60 * 60));
    }
    format!("{}d", seconds / (60 * 60 * 24))
}

/// First three paths, then `+N more`.
pub fn preview_files(paths: &[String]) -> String {
    let mut shown: Vec<String> = paths.iter().take(3).cloned().collect();
    if paths.len() > shown.len() {
        shown.push(format!("+{} more", paths.len() - shown.len()));
    }
    shown.join(", ")
}
