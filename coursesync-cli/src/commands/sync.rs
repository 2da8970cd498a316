//! `coursesync sync`: reconcile course collections with the repository.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use coursesync_sync::{
    pipeline::{self, SyncScope},
    SyncCourseResult, SyncMode,
};

/// Arguments for `coursesync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Name of the course to sync (omit when using `--all`).
    pub course: Option<String>,

    /// Sync every registered course.
    #[arg(long, conflicts_with = "course")]
    pub all: bool,

    /// Reconcile every collection instead of planning from changed files.
    #[arg(long)]
    pub full: bool,

    /// Show what would change without saving the course state.
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;
        let mode = if self.full {
            SyncMode::Full
        } else {
            SyncMode::Incremental
        };

        let run = if self.all {
            let run =
                pipeline::run(&home, SyncScope::All, mode, self.dry_run).context("sync --all failed")?;
            if run.results.is_empty() && run.failures.is_empty() {
                println!("No courses registered. Run `coursesync init` first.");
            }
            run
        } else {
            let name = self
                .course
                .clone()
                .context("provide a course name or use --all")?;
            pipeline::run(&home, SyncScope::Course(name.clone()), mode, self.dry_run)
                .with_context(|| format!("sync failed for '{name}'"))?
        };

        let mut failed = 0;
        for result in &run.results {
            print_result(result);
            failed += result.failures().count();
        }
        for failure in &run.failures {
            println!(
                "{} '{}' not synced: {}",
                "✗".red().bold(),
                failure.course_name,
                failure.error
            );
        }
        if !run.failures.is_empty() {
            bail!(
                "{} course(s) and {failed} collection(s) failed to sync",
                run.failures.len()
            );
        }
        if failed > 0 {
            bail!("{failed} collection(s) failed to sync");
        }
        Ok(())
    }
}

fn print_result(result: &SyncCourseResult) {
    let prefix = if result.dry_run { "[dry-run] " } else { "" };
    let name = &result.course_name;

    if result.reports.is_empty() {
        println!("{prefix}✓ '{name}' nothing to do ({})", result.kind.as_str());
    } else {
        let total = result.summary();
        println!(
            "{prefix}✓ '{name}' synced ({}: {} created, {} updated, {} deleted)",
            result.kind.as_str(),
            total.created,
            total.updated,
            total.deleted,
        );
    }

    for report in &result.reports {
        match &report.error {
            Some(error) => println!(
                "  {}  {}: {}",
                "✗".red().bold(),
                report.collection,
                error
            ),
            None if report.is_noop() => println!("  ·  {}", report.collection),
            None => println!(
                "  ✎  {} (+{} ~{} -{})",
                report.collection, report.created, report.updated, report.deleted
            ),
        }
    }

    for problem in &result.problems {
        println!("  {}  {problem}", "!".yellow().bold());
    }
}
