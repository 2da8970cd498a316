pub mod diff;
pub mod init;
pub mod plan;
pub mod status;
pub mod sync;
pub mod watch;
