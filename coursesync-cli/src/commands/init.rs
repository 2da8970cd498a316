//! `coursesync init <path> [--name <name>]`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use coursesync_core::{registry, CourseName};

/// Register a course repository.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Absolute or relative path to the course repository root.
    pub path: PathBuf,

    /// Course name; defaults to the directory name. Creates
    /// ~/.coursesync/courses/<name>.yaml
    #[arg(long, short = 'n')]
    pub name: Option<String>,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let path = self
            .path
            .canonicalize()
            .with_context(|| format!("cannot resolve path '{}'", self.path.display()))?;

        let course = registry::init(path.clone(), self.name.map(CourseName::from))
            .with_context(|| format!("failed to register '{}'", path.display()))?;

        println!("✓ Registered course '{}'", course.name);
        println!("  Saved to: ~/.coursesync/courses/{}.yaml", course.name);
        Ok(())
    }
}
