//! `coursesync status`: staleness and sync visibility.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use coursesync_core::{registry, Course};
use coursesync_reconcile::ChangeSet;
use coursesync_sync::{
    staleness::{check, format_datetime_age, preview_files, StalenessSignal},
    store,
};

/// Arguments for `coursesync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;

        let courses = registry::list_courses_at(&home)
            .context("failed to load registry; run `coursesync init` first")?;

        let rows = build_report(&home, &courses)?;
        if self.json {
            print_json(rows)?;
            return Ok(());
        }

        print_table(rows);
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct CourseStatus {
    course: String,
    path: String,
    signal: StalenessSignal,
    detail: String,
    last_sync_age: String,
    last_sync_at: Option<String>,
}

#[derive(Serialize)]
struct StatusReportJson {
    summary: StatusSummaryJson,
    courses: Vec<CourseStatusJson>,
}

#[derive(Serialize)]
struct StatusSummaryJson {
    courses: usize,
    pending: usize,
}

#[derive(Serialize)]
struct CourseStatusJson {
    course: String,
    path: String,
    status: String,
    detail: String,
    changed_files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    changes: Option<ChangeSet>,
    last_sync_age: String,
    last_sync_at: Option<String>,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "course")]
    course: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "detail")]
    detail: String,
    #[tabled(rename = "last sync")]
    last_sync: String,
}

fn build_report(home: &Path, courses: &[Course]) -> Result<Vec<CourseStatus>> {
    let mut rows = Vec::new();
    for course in courses {
        let signal = check(home, course)
            .with_context(|| format!("status check failed for '{}'", course.name))?;
        let (last_sync_at, last_sync_age) = load_last_sync(home, &course.name.0)
            .with_context(|| format!("failed to load state for '{}'", course.name))?;

        rows.push(CourseStatus {
            course: course.name.0.clone(),
            path: course.path.display().to_string(),
            detail: signal_detail(&signal),
            signal,
            last_sync_age,
            last_sync_at,
        });
    }
    Ok(rows)
}

fn load_last_sync(home: &Path, course_name: &str) -> Result<(Option<String>, String)> {
    if !store::exists_at(home, course_name) {
        return Ok((None, "never".to_string()));
    }
    let state = store::load_at(home, course_name)?;
    Ok(match state.synced_at {
        Some(at) => (Some(at.to_rfc3339()), format_datetime_age(at)),
        None => (None, "never".to_string()),
    })
}

fn pending_count(rows: &[CourseStatus]) -> usize {
    rows.iter()
        .filter(|r| !matches!(r.signal, StalenessSignal::Current))
        .count()
}

fn print_json(rows: Vec<CourseStatus>) -> Result<()> {
    let payload = StatusReportJson {
        summary: StatusSummaryJson {
            courses: rows.len(),
            pending: pending_count(&rows),
        },
        courses: rows
            .into_iter()
            .map(|row| {
                let status = signal_key(&row.signal).to_string();
                let (changed_files, changes) = match row.signal {
                    StalenessSignal::Pending { files, changes } => (files, Some(changes)),
                    _ => (Vec::new(), None),
                };
                CourseStatusJson {
                    course: row.course,
                    path: row.path,
                    status,
                    detail: row.detail,
                    changed_files,
                    changes,
                    last_sync_age: row.last_sync_age,
                    last_sync_at: row.last_sync_at,
                }
            })
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(rows: Vec<CourseStatus>) {
    let pending = pending_count(&rows);
    println!(
        "Coursesync v{} | {} courses | {} need sync",
        env!("CARGO_PKG_VERSION"),
        rows.len(),
        pending,
    );

    if rows.is_empty() {
        println!("No courses registered.");
        return;
    }

    let table_rows: Vec<StatusTableRow> = rows
        .into_iter()
        .map(|row| StatusTableRow {
            status: format!("{} {}", signal_indicator(&row.signal), signal_label(&row.signal)),
            course: row.course,
            detail: row.detail,
            last_sync: row.last_sync_age,
        })
        .collect();
    let mut table = Table::new(table_rows);
    table.with(Style::rounded());
    println!("{table}");

    if pending > 0 {
        println!("Run 'coursesync sync --all' to bring courses up to date.");
    }
}

fn signal_key(signal: &StalenessSignal) -> &'static str {
    match signal {
        StalenessSignal::NeverSynced => "never_synced",
        StalenessSignal::Current => "current",
        StalenessSignal::Pending { .. } => "pending",
    }
}

fn signal_label(signal: &StalenessSignal) -> &'static str {
    match signal {
        StalenessSignal::NeverSynced => "NEVER SYNCED",
        StalenessSignal::Current => "CURRENT",
        StalenessSignal::Pending { .. } => "PENDING",
    }
}

fn signal_indicator(signal: &StalenessSignal) -> String {
    match signal {
        StalenessSignal::NeverSynced => "■".bright_black().bold().to_string(),
        StalenessSignal::Current => "■".green().bold().to_string(),
        StalenessSignal::Pending { .. } => "■".yellow().bold().to_string(),
    }
}

fn signal_detail(signal: &StalenessSignal) -> String {
    match signal {
        StalenessSignal::NeverSynced => "no state store".to_string(),
        StalenessSignal::Current => "up to date".to_string(),
        StalenessSignal::Pending { files, changes } if changes.is_empty() => {
            format!("{} changed, no collections affected", preview_files(files))
        }
        StalenessSignal::Pending { files, .. } => format!("{} changed", preview_files(files)),
    }
}
