//! `coursesync diff <course>`: unified diffs of what a full sync would store.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use coursesync_sync::diff::diff_course;

/// Arguments for `coursesync diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Course name to diff.
    pub course: String,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;

        let result = diff_course(&self.course, &home)
            .with_context(|| format!("diff failed for '{}'", self.course))?;

        if result.diffs.is_empty() {
            println!("No differences for '{}'.", result.course_name);
            return Ok(());
        }

        for diff in result.diffs {
            print!("{}", diff.unified_diff);
            if !diff.unified_diff.ends_with('\n') {
                println!();
            }
        }

        Ok(())
    }
}
