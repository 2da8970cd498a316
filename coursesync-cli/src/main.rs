//! Coursesync: keep a course's synced state in step with its repository.
//!
//! # Usage
//!
//! ```text
//! coursesync init <path> [--name <name>]
//! coursesync sync <course> [--full] [--dry-run]
//! coursesync sync --all [--full] [--dry-run]
//! coursesync plan <course> [<path>...] [--json]
//! coursesync status [--json]
//! coursesync diff <course>
//! coursesync watch
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    diff::DiffArgs, init::InitArgs, plan::PlanArgs, status::StatusArgs, sync::SyncArgs,
    watch::WatchArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "coursesync",
    version,
    about = "Sync course repositories into a local course state store",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register a course repository.
    Init(InitArgs),

    /// Reconcile a course's collections with its repository.
    Sync(SyncArgs),

    /// Show which collections the next sync would touch.
    Plan(PlanArgs),

    /// Show staleness status across registered courses.
    Status(StatusArgs),

    /// Show unified diff of what a full sync would store for a course.
    Diff(DiffArgs),

    /// Watch registered courses and sync them as files change.
    Watch(WatchArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Sync(args) => args.run(),
        Commands::Plan(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Diff(args) => args.run(),
        Commands::Watch(args) => args.run(),
    }
}
