//! Shared sync pipeline entrypoint used by CLI and daemon.

use std::path::Path;

use crate::{sync_all, sync_course, SyncError, SyncMode, SyncRun};

/// Scope for a sync pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncScope {
    /// Sync every registered course.
    All,
    /// Sync a single named course.
    Course(String),
}

/// Run the sync pipeline for a scope.
///
/// This is the canonical sync entrypoint for both `coursesync sync` and the
/// watch daemon's processor. With [`SyncScope::All`] a failing course is
/// reported in [`SyncRun::failures`]; a single named course propagates its
/// error.
pub fn run(home: &Path, scope: SyncScope, mode: SyncMode, dry_run: bool) -> Result<SyncRun, SyncError> {
    match scope {
        SyncScope::All => sync_all(home, mode, dry_run),
        SyncScope::Course(name) => Ok(SyncRun {
            results: vec![sync_course(home, &name, mode, dry_run)?],
            failures: Vec::new(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use coursesync_core::{registry, CourseName};
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn run_all_empty_registry_returns_empty_vec() {
        let home = TempDir::new().expect("home");
        let result = run(home.path(), SyncScope::All, SyncMode::Incremental, true).expect("run");
        assert!(result.results.is_empty());
        assert!(result.failures.is_empty());
    }

    #[test]
    fn run_single_course_returns_single_result() {
        let home = TempDir::new().expect("home");
        let workspace = TempDir::new().expect("workspace");
        let course_dir = workspace.path().join("cs101");
        fs::create_dir_all(&course_dir).expect("mkdir");
        registry::init_at(course_dir, Some(CourseName::from("cs101")), home.path()).expect("init");

        let result = run(
            home.path(),
            SyncScope::Course("cs101".to_string()),
            SyncMode::Full,
            true,
        )
        .expect("run");
        assert_eq!(result.results.len(), 1);
        assert_eq!(result.results[0].course_name, "cs101");
        assert!(result.results[0].dry_run);
    }

    #[test]
    fn run_unknown_course_is_a_registry_error() {
        let home = TempDir::new().expect("home");
        let err = run(
            home.path(),
            SyncScope::Course("nope".to_string()),
            SyncMode::Full,
            true,
        )
        .unwrap_err();
        assert!(matches!(err, SyncError::Registry(_)));
    }

    #[test]
    fn run_all_keeps_going_past_a_missing_course_dir() {
        let home = TempDir::new().expect("home");
        let workspace = TempDir::new().expect("workspace");
        for name in ["aaa", "bbb"] {
            let dir = workspace.path().join(name);
            fs::create_dir_all(&dir).expect("mkdir");
            registry::init_at(dir, Some(CourseName::from(name)), home.path()).expect("init");
        }
        fs::remove_dir_all(workspace.path().join("aaa")).expect("rm");

        let outcome = run(home.path(), SyncScope::All, SyncMode::Full, false).expect("run");

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].course_name, "aaa");
        assert!(matches!(outcome.failures[0].error, SyncError::CourseDirMissing { .. }));
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].course_name, "bbb");
        assert!(crate::store::exists_at(home.path(), "bbb"));
        assert!(outcome.has_failures());
    }
}
