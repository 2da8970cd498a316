//! `coursesync watch`: run the file watcher in the foreground.

use anyhow::{Context, Result};
use clap::Args;

use coursesync_daemon::start_blocking;

/// Arguments for `coursesync watch`.
#[derive(Args, Debug)]
pub struct WatchArgs {}

impl WatchArgs {
    pub fn run(self) -> Result<()> {
        let home = dirs::home_dir().context("could not determine home directory")?;
        start_blocking(&home).context("watcher exited with error")?;
        Ok(())
    }
}
