//! `coursesync plan <course> [<path>...]`: preview the collections a sync would touch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use coursesync_reconcile::{ChangeSet, FastSyncStrategy};
use coursesync_sync::{plan_course, plan_paths, CoursePlan};

/// Arguments for `coursesync plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Course name to plan.
    pub course: String,

    /// Course-relative paths to treat as changed. When omitted, changed
    /// files are found by comparing hashes with the last sync.
    pub paths: Vec<String>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl PlanArgs {
    pub fn run(self) -> Result<()> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;

        let result = if self.paths.is_empty() {
            plan_course(&home, &self.course)
        } else {
            plan_paths(&home, &self.course, &self.paths)
        };
        let plan = result.with_context(|| format!("plan failed for '{}'", self.course))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&plan).context("failed to serialize plan JSON")?
            );
            return Ok(());
        }

        print_plan(&plan);
        Ok(())
    }
}

fn print_plan(plan: &CoursePlan) {
    if plan.never_synced {
        println!("'{}' has never been synced; the next sync is full.", plan.course_name);
    }
    if plan.changed_files.is_empty() {
        println!("No changes for '{}'.", plan.course_name);
        return;
    }

    println!("Changed files ({}):", plan.changed_files.len());
    for file in &plan.changed_files {
        println!("  {file}");
    }

    if plan.changes.is_empty() {
        println!("No collections affected.");
    } else {
        println!("Collections to sync:");
        for line in describe_changes(&plan.changes) {
            println!("  {line}");
        }
    }

    if let Some(FastSyncStrategy::Question { path_prefix }) = &plan.fast_sync {
        println!("Fast path: single question under {path_prefix}");
    }
}

fn describe_changes(changes: &ChangeSet) -> Vec<String> {
    let mut lines = Vec::new();
    if changes.sync_course {
        lines.push("course, topics, tags, assessment sets, assessment modules".to_string());
    }
    if changes.sync_questions {
        lines.push("questions".to_string());
    }
    if changes.sync_course_instances {
        lines.push("course instances".to_string());
    }
    for instance in &changes.sync_course_instance_assessments {
        lines.push(format!("assessments[{instance}]"));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_changes_lists_instances_in_order() {
        let mut changes = ChangeSet::default();
        changes.sync_questions = true;
        changes.sync_course_instance_assessments.insert("Sp24".to_string());
        changes.sync_course_instance_assessments.insert("Fa23".to_string());

        assert_eq!(
            describe_changes(&changes),
            vec!["questions", "assessments[Fa23]", "assessments[Sp24]"]
        );
    }
}
