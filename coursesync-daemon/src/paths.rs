//! Mapping watcher event paths back to registered courses.

use std::fs;
use std::path::{Component, Path, PathBuf};

use coursesync_core::{registry, Course};

use crate::error::DaemonError;

/// Registered course roots, canonicalized so event paths match them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseIndex {
    roots: Vec<(String, PathBuf)>,
}

impl CourseIndex {
    pub fn load(home: &Path) -> Result<Self, DaemonError> {
        Ok(Self::from_courses(registry::list_courses_at(home)?))
    }

    pub fn from_courses(courses: impl IntoIterator<Item = Course>) -> Self {
        let mut roots: Vec<(String, PathBuf)> = courses
            .into_iter()
            .map(|course| {
                let root = fs::canonicalize(&course.path).unwrap_or(course.path);
                (course.name.0, root)
            })
            .collect();
        // Nested course roots: the deepest one owns its files.
        roots.sort_by_key(|(_, root)| std::cmp::Reverse(root.components().count()));
        Self { roots }
    }

    pub fn roots(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.roots.iter().map(|(name, root)| (name.as_str(), root.as_path()))
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// The course owning `path` and the `/`-joined path relative to its root.
    ///
    /// Returns `None` for paths outside every course, for the course root
    /// itself, and (with `ignore_hidden`) for anything below a dot-entry.
    pub fn resolve(&self, path: &Path, ignore_hidden: bool) -> Option<(String, String)> {
        let (name, root) = self.roots.iter().find(|(_, root)| path.starts_with(root))?;
        let relative = path.strip_prefix(root).ok()?;

        let mut parts = Vec::new();
        for component in relative.components() {
            let Component::Normal(part) = component else {
                return None;
            };
            let part = part.to_string_lossy();
            if ignore_hidden && part.starts_with('.') {
                return None;
            }
            parts.push(part.into_owned());
        }
        if parts.is_empty() {
            return None;
        }
        Some((name.clone(), parts.join("/")))
    }
}
