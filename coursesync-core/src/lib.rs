//! Coursesync core library: domain types, course documents, registry, config.
//!
//! Public API surface:
//! - [`types`]: newtypes and the registered [`Course`]
//! - [`schema`]: parsed course JSON documents (`infoCourse.json`, ...)
//! - [`infofile`]: [`InfoFile`], a parsed document plus its errors/warnings
//! - [`error`]: [`RegistryError`]
//! - [`registry`]: load / save / init of registered courses
//! - [`config`]: [`SyncConfig`] loaded from `~/.coursesync/config.yaml`

pub mod config;
pub mod error;
pub mod infofile;
pub mod registry;
pub mod schema;
pub mod types;

pub use config::SyncConfig;
pub use error::RegistryError;
pub use infofile::InfoFile;
pub use types::{Course, CourseName};
