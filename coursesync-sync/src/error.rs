//! Error types for coursesync-sync.

use std::path::PathBuf;

use thiserror::Error;

use coursesync_core::error::RegistryError;

/// All errors that can arise from sync operations.
///
/// Bad course content is not an error here: it is recorded on the loaded
/// info files and surfaces as sync errors/warnings instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the registry or configuration.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error (state store).
    #[error("state store JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The course directory registered for a course is gone.
    #[error("course directory {path} does not exist")]
    CourseDirMissing { path: PathBuf },
}

/// A plan that cannot be applied to the stored rows of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    #[error("cannot create '{0}': a row with that name already exists")]
    AlreadyExists(String),

    #[error("cannot update '{0}': no row with that name exists")]
    NotFound(String),

    #[error("course instance '{0}' has no stored row")]
    MissingCourseInstance(String),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
