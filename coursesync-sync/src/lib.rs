//! # coursesync-sync
//!
//! Course loading, state store and sync orchestration.
//!
//! Call [`sync_course`] to bring the state store of a single registered
//! course up to date with its repository, or [`sync_all`] to process every
//! registered course. [`pipeline::run`] is the shared entrypoint for the CLI
//! and the watch daemon.

pub mod apply;
pub mod course_db;
pub mod course_sync;
pub mod diff;
pub mod error;
pub mod fast;
pub mod pipeline;
pub mod records;
pub mod staleness;
pub mod store;

pub use apply::{Collection, CollectionReport};
pub use course_sync::{
    plan_course, plan_paths, sync_all, sync_course, CourseFailure, CoursePlan, SyncCourseResult,
    SyncKind, SyncMode, SyncRun,
};
pub use error::{ApplyError, SyncError};
