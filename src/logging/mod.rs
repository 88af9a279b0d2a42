//! Console and log file output, plus the per-run task summary.
//!
//! [`Logger`] is the facade commands talk to; it emits [`tracing`] events
//! that [`init_subscriber`] routes to the terminal and to a [`LogFile`].

mod file;
mod logger;
mod subscriber;
mod types;

pub use file::LogFile;
pub use logger::Logger;
pub use subscriber::init_subscriber;
pub use types::{Summary, TaskEntry, TaskStatus};

/// A [`Logger`] whose events land in a fresh temp-dir log file through a
/// thread-local subscriber.  Keep the guard alive for the whole test.
#[cfg(test)]
#[allow(clippy::expect_used)]
pub(crate) fn isolated_logger() -> (Logger, tempfile::TempDir, tracing::dispatcher::DefaultGuard) {
    use tracing_subscriber::{Layer as _, filter::LevelFilter, layer::SubscriberExt as _};

    let tmp = tempfile::tempdir().expect("temp dir");
    let log_file = LogFile::in_dir(tmp.path(), "test");
    let layer = subscriber::FileLayer::open(&log_file).expect("open log file");
    let registry = tracing_subscriber::registry().with(layer.with_filter(LevelFilter::DEBUG));
    let guard = tracing::dispatcher::set_default(&tracing::Dispatch::new(registry));
    (Logger::new(Some(log_file)), tmp, guard)
}
