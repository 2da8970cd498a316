//! Sync configuration at `<home>/.coursesync/config.yaml`.
//!
//! Every field is optional in the YAML file; a missing file yields
//! [`SyncConfig::default`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::registry::{coursesync_root, home};

/// Default debounce window for the watcher, in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Delete persisted entities that are no longer declared or referenced.
    /// When `false`, syncs only ever create and update.
    pub delete_unused: bool,
    /// Quiet period before a burst of file events triggers a sync.
    pub debounce_ms: u64,
    /// Skip dot-files and dot-directories (`.git`, `.DS_Store`, ...) when
    /// hashing and walking a course.
    pub ignore_hidden: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            delete_unused: true,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            ignore_hidden: true,
        }
    }
}

/// `<home>/.coursesync/config.yaml`
pub fn config_path_at(home: &Path) -> PathBuf {
    coursesync_root(home).join("config.yaml")
}

/// Load the configuration, falling back to defaults if the file is absent.
pub fn load_at(home: &Path) -> Result<SyncConfig, RegistryError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(SyncConfig::default());
    }
    let contents = std::fs::read_to_string(&path)?;
    if contents.trim().is_empty() {
        return Ok(SyncConfig::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| RegistryError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<SyncConfig, RegistryError> {
    load_at(&home()?)
}

/// Save the configuration (`.tmp` + rename).
pub fn save_at(home: &Path, config: &SyncConfig) -> Result<(), RegistryError> {
    let path = config_path_at(home);
    std::fs::create_dir_all(coursesync_root(home))?;
    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, serde_yaml::to_string(config)?)?;
    std::fs::rename(&tmp, &path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let home = TempDir::new().unwrap();
        let config = load_at(home.path()).unwrap();
        assert_eq!(config, SyncConfig::default());
        assert!(config.delete_unused);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let home = TempDir::new().unwrap();
        std::fs::create_dir_all(coursesync_root(home.path())).unwrap();
        std::fs::write(config_path_at(home.path()), "delete_unused: false\n").unwrap();

        let config = load_at(home.path()).unwrap();
        assert!(!config.delete_unused);
        assert_eq!(config.debounce_ms, DEFAULT_DEBOUNCE_MS);
        assert!(config.ignore_hidden);
    }

    #[test]
    fn save_then_load_roundtrip() {
        let home = TempDir::new().unwrap();
        let config = SyncConfig {
            delete_unused: false,
            debounce_ms: 1500,
            ignore_hidden: false,
        };
        save_at(home.path(), &config).unwrap();
        assert_eq!(load_at(home.path()).unwrap(), config);
    }

    #[test]
    fn malformed_yaml_reports_path() {
        let home = TempDir::new().unwrap();
        std::fs::create_dir_all(coursesync_root(home.path())).unwrap();
        std::fs::write(config_path_at(home.path()), "delete_unused: [unclosed").unwrap();

        let err = load_at(home.path()).unwrap_err();
        assert!(matches!(err, RegistryError::Parse { .. }));
        assert!(err.to_string().contains("config.yaml"));
    }
}
