//! Per-course YAML registry.
//!
//! # Storage layout
//!
//! ```text
//! ~/.coursesync/
//!   config.yaml             (optional, see crate::config)
//!   courses/
//!     <course_name>.yaml    (one file per registered course, mode 0600)
//!   state/
//!     <course_name>.json    (persisted sync state, owned by coursesync-sync)
//! ```
//!
//! # API pattern
//!
//! Every function touching the registry has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::RegistryError;
use crate::types::{Course, CourseName};

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.coursesync/`
pub fn coursesync_root(home: &Path) -> PathBuf {
    home.join(".coursesync")
}

/// `<home>/.coursesync/courses/`
pub fn courses_dir(home: &Path) -> PathBuf {
    coursesync_root(home).join("courses")
}

/// `<home>/.coursesync/courses/<course>.yaml`: pure, no I/O.
pub fn course_path_at(home: &Path, course: &CourseName) -> PathBuf {
    courses_dir(home).join(format!("{}.yaml", course.0))
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load a single course from `<home>/.coursesync/courses/<course>.yaml`.
///
/// Returns `RegistryError::CourseNotFound` if absent,
/// `RegistryError::Parse` (with path + line context) if malformed YAML.
pub fn load_course_at(home: &Path, course: &CourseName) -> Result<Course, RegistryError> {
    let path = course_path_at(home, course);
    if !path.exists() {
        return Err(RegistryError::CourseNotFound {
            name: course.0.clone(),
            path,
        });
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| RegistryError::Parse { path, source: e })
}

/// `load_course_at` convenience wrapper.
pub fn load_course(course: &CourseName) -> Result<Course, RegistryError> {
    load_course_at(&home()?, course)
}

/// Return every registered course, sorted by course name.
pub fn list_courses_at(home: &Path) -> Result<Vec<Course>, RegistryError> {
    let dir = courses_dir(home);
    if !dir.exists() {
        return Ok(vec![]);
    }

    let mut file_entries: Vec<_> = std::fs::read_dir(&dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .collect();
    file_entries.sort_by_key(|e| e.file_name());

    let mut courses = Vec::new();
    for entry in file_entries {
        let fname = entry.file_name();
        if !fname.to_string_lossy().ends_with(".yaml") {
            continue;
        }
        let contents = std::fs::read_to_string(entry.path())?;
        let course: Course = serde_yaml::from_str(&contents).map_err(|e| RegistryError::Parse {
            path: entry.path(),
            source: e,
        })?;
        courses.push(course);
    }
    courses.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(courses)
}

/// `list_courses_at` convenience wrapper.
pub fn list_courses() -> Result<Vec<Course>, RegistryError> {
    list_courses_at(&home()?)
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save a course to `<home>/.coursesync/courses/<course>.yaml`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_course_at(home: &Path, course: &Course) -> Result<(), RegistryError> {
    let dir = courses_dir(home);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        set_dir_permissions(&dir)?;
    }
    let path = course_path_at(home, &course.name);
    let tmp_path = path.with_file_name(format!("{}.yaml.tmp", course.name.0));

    let yaml = serde_yaml::to_string(course)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// 4. Init
// ---------------------------------------------------------------------------

/// Register the course repository at `course_path`.
///
/// The course name defaults to the repository directory name.
/// Idempotent: if the course is already registered, loads and returns it unchanged.
pub fn init_at(
    course_path: PathBuf,
    name: Option<CourseName>,
    home: &Path,
) -> Result<Course, RegistryError> {
    let name = name.unwrap_or_else(|| {
        CourseName::from(
            course_path
                .file_name()
                .unwrap_or_else(|| course_path.as_os_str())
                .to_string_lossy()
                .into_owned(),
        )
    });

    if course_path_at(home, &name).exists() {
        return load_course_at(home, &name);
    }

    let now = Utc::now();
    let course = Course {
        name,
        path: course_path,
        created_at: now,
        updated_at: now,
    };
    save_course_at(home, &course)?;
    Ok(course)
}

/// `init_at` convenience wrapper.
pub fn init(course_path: PathBuf, name: Option<CourseName>) -> Result<Course, RegistryError> {
    init_at(course_path, name, &home()?)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

pub(crate) fn home() -> Result<PathBuf, RegistryError> {
    dirs::home_dir().ok_or(RegistryError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), RegistryError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), RegistryError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), RegistryError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), RegistryError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_home() -> TempDir {
        TempDir::new().expect("tempdir")
    }

    fn course_name() -> CourseName {
        CourseName::from("cs101")
    }

    #[test]
    fn course_path_is_correct() {
        let home = make_home();
        let path = course_path_at(home.path(), &course_name());
        assert!(path.ends_with(".coursesync/courses/cs101.yaml"));
    }

    #[test]
    fn save_and_load_course_roundtrip() {
        let home = make_home();
        let now = Utc::now();
        let course = Course {
            name: course_name(),
            path: PathBuf::from("/srv/courses/cs101"),
            created_at: now,
            updated_at: now,
        };
        save_course_at(home.path(), &course).expect("save");
        let loaded = load_course_at(home.path(), &course_name()).expect("load");
        assert_eq!(loaded.name, course.name);
        assert_eq!(loaded.path, course.path);
    }

    #[test]
    fn atomic_write_cleans_up_tmp() {
        let home = make_home();
        init_at(PathBuf::from("/srv/courses/cs101"), None, home.path()).expect("init");
        let tmp = course_path_at(home.path(), &course_name()).with_file_name("cs101.yaml.tmp");
        assert!(!tmp.exists(), ".tmp must be gone after successful save");
    }

    #[test]
    fn courses_dir_created_with_perms() {
        let home = make_home();
        init_at(PathBuf::from("/srv/courses/cs101"), None, home.path()).expect("init");
        let dir = courses_dir(home.path());
        assert!(dir.exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&dir).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o700);
        }
    }

    #[test]
    fn load_missing_course_returns_not_found() {
        let home = make_home();
        let err = load_course_at(home.path(), &course_name()).unwrap_err();
        assert!(matches!(err, RegistryError::CourseNotFound { .. }));
    }

    #[test]
    fn list_courses_empty_when_nothing_registered() {
        let home = make_home();
        let list = list_courses_at(home.path()).expect("list");
        assert!(list.is_empty());
    }

    #[test]
    fn home_not_found_error_message() {
        assert!(RegistryError::HomeNotFound.to_string().contains("home directory"));
    }
}
