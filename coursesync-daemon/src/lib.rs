//! Watch daemon: course-directory watcher + debouncer + sync processor.

mod error;
pub mod paths;
mod runtime;

pub use error::DaemonError;
pub use paths::CourseIndex;
pub use runtime::{run, start_blocking, Debouncer, SyncSummary};
