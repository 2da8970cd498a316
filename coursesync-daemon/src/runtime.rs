use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;

use coursesync_core::{config, registry};
use coursesync_sync::{
    pipeline::{self, SyncScope},
    SyncCourseResult, SyncMode,
};

use crate::error::{io_err, DaemonError};
use crate::paths::CourseIndex;

/// Changed paths for one course, ready to sync.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SyncJob {
    course: String,
    paths: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub course: String,
    pub kind: &'static str,
    pub paths: usize,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub failed_collections: usize,
    pub duration_ms: u128,
}

// ---------------------------------------------------------------------------
// Debounce
// ---------------------------------------------------------------------------

/// Per-course debounce: a course becomes ready once no event for it has
/// arrived for a full window. Paths accumulate until then.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: HashMap<String, PendingCourse>,
}

#[derive(Debug)]
struct PendingCourse {
    paths: BTreeSet<String>,
    last_event: Instant,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
        }
    }

    pub fn record(&mut self, course: &str, path: String, now: Instant) {
        let entry = self
            .pending
            .entry(course.to_string())
            .or_insert_with(|| PendingCourse {
                paths: BTreeSet::new(),
                last_event: now,
            });
        entry.paths.insert(path);
        entry.last_event = now;
    }

    /// Earliest instant at which some course becomes ready.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending
            .values()
            .map(|p| p.last_event + self.window)
            .min()
    }

    /// Remove and return every ready course with its paths, sorted by course.
    pub fn drain_ready(&mut self, now: Instant) -> Vec<(String, Vec<String>)> {
        let mut ready: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, p)| now.duration_since(p.last_event) >= self.window)
            .map(|(course, _)| course.clone())
            .collect();
        ready.sort();
        ready
            .into_iter()
            .filter_map(|course| {
                let pending = self.pending.remove(&course)?;
                Some((course, pending.paths.into_iter().collect()))
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(home: &Path) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(home.to_path_buf()))
}

/// Run the daemon runtime until ctrl-c or a task failure.
pub async fn run(home: PathBuf) -> Result<(), DaemonError> {
    let config = config::load_at(&home)?;
    let index = CourseIndex::load(&home)?;
    tracing::info!(
        courses = index.len(),
        debounce_ms = config.debounce_ms,
        "starting watch daemon"
    );

    let (sync_tx, sync_rx) = mpsc::channel::<SyncJob>(64);
    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let watcher_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        let settings = WatchSettings {
            window: Duration::from_millis(config.debounce_ms),
            ignore_hidden: config.ignore_hidden,
        };
        tokio::spawn(async move {
            let result = watcher_task(home, index, settings, sync_tx, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let processor_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        tokio::spawn(async move {
            let result = sync_processor_task(home, sync_rx, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down daemon");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Runtime(format!("ctrl-c handler failed: {err}"))),
                    }
                }
            }
        })
    };

    let (watcher_result, processor_result, signal_result) =
        tokio::join!(watcher_handle, processor_handle, signal_handle);

    handle_join("watcher", watcher_result)?;
    handle_join("sync_processor", processor_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct WatchSettings {
    window: Duration,
    ignore_hidden: bool,
}

async fn watcher_task(
    home: PathBuf,
    mut index: CourseIndex,
    settings: WatchSettings,
    sync_tx: mpsc::Sender<SyncJob>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let registry_dir = registry::courses_dir(&home);
    if !registry_dir.exists() {
        fs::create_dir_all(&registry_dir).map_err(|e| io_err(&registry_dir, e))?;
    }
    let registry_dir = fs::canonicalize(&registry_dir).unwrap_or(registry_dir);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher: RecommendedWatcher = recommended_watcher(move |event| {
        let _ = event_tx.send(event);
    })?;
    watcher.watch(&registry_dir, RecursiveMode::NonRecursive)?;

    let mut watched = HashSet::new();
    watch_courses(&mut watcher, &mut watched, &index)?;

    let mut debouncer = Debouncer::new(settings.window);

    loop {
        let deadline = debouncer.next_deadline();
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = sleep_until(deadline) => {
                for (course, paths) in debouncer.drain_ready(Instant::now()) {
                    tracing::debug!(course = %course, paths = paths.len(), "debounce window elapsed");
                    sync_tx
                        .send(SyncJob { course, paths })
                        .await
                        .map_err(|_| DaemonError::ChannelClosed("sync queue"))?;
                }
            }
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(error = %err, "watcher event error");
                        continue;
                    }
                };
                if !is_relevant_event_kind(&event.kind) {
                    continue;
                }

                for path in event.paths {
                    if path.starts_with(&registry_dir) {
                        if is_registry_yaml(&path) {
                            match CourseIndex::load(&home) {
                                Ok(reloaded) => {
                                    index = reloaded;
                                    watch_courses(&mut watcher, &mut watched, &index)?;
                                    tracing::info!(courses = index.len(), "course registry reloaded");
                                }
                                Err(err) => {
                                    tracing::warn!(error = %err, "course registry reload failed; keeping previous courses");
                                }
                            }
                        }
                        continue;
                    }

                    if let Some((course, relative)) = index.resolve(&path, settings.ignore_hidden) {
                        debouncer.record(&course, relative, Instant::now());
                    }
                }
            }
        }
    }

    Ok(())
}

async fn sync_processor_task(
    home: PathBuf,
    mut sync_rx: mpsc::Receiver<SyncJob>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            maybe_job = sync_rx.recv() => {
                let Some(job) = maybe_job else { break };
                process_job(&home, job).await?;
            }
        }
    }

    Ok(())
}

/// Run one watcher-triggered sync on the blocking pool.
///
/// Sync failures are logged, not returned: the daemon keeps watching.
async fn process_job(home: &Path, job: SyncJob) -> Result<Vec<SyncSummary>, DaemonError> {
    let started = Instant::now();
    let course = job.course.clone();
    let path_count = job.paths.len();
    let home_for_sync = home.to_path_buf();

    let sync_result = tokio::task::spawn_blocking(move || {
        pipeline::run(
            &home_for_sync,
            SyncScope::Course(job.course),
            SyncMode::Paths(job.paths),
            false,
        )
    })
    .await
    .map_err(|err| DaemonError::Runtime(format!("sync task join error: {err}")))?;

    let run = match sync_result {
        Ok(run) => run,
        Err(err) => {
            tracing::error!(course = %course, error = %err, "watcher-triggered sync failed");
            return Ok(Vec::new());
        }
    };

    for failure in &run.failures {
        tracing::error!(course = %failure.course_name, error = %failure.error, "watcher-triggered sync failed");
    }

    let mut summaries = Vec::new();
    for result in &run.results {
        let summary = build_sync_summary(result, path_count, started.elapsed());
        tracing::info!(
            course = %summary.course,
            kind = summary.kind,
            paths = summary.paths,
            created = summary.created,
            updated = summary.updated,
            deleted = summary.deleted,
            duration_ms = summary.duration_ms,
            "watcher-triggered sync completed",
        );
        for failure in result.failures() {
            tracing::warn!(
                course = %summary.course,
                collection = %failure.collection,
                error = failure.error.as_deref().unwrap_or_default(),
                "collection not applied",
            );
        }
        for problem in &result.problems {
            tracing::debug!(course = %summary.course, "{problem}");
        }
        summaries.push(summary);
    }
    Ok(summaries)
}

fn build_sync_summary(result: &SyncCourseResult, paths: usize, duration: Duration) -> SyncSummary {
    let totals = result.summary();
    SyncSummary {
        course: result.course_name.clone(),
        kind: result.kind.as_str(),
        paths,
        created: totals.created,
        updated: totals.updated,
        deleted: totals.deleted,
        failed_collections: result.failures().count(),
        duration_ms: duration.as_millis(),
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

fn watch_courses(
    watcher: &mut RecommendedWatcher,
    watched: &mut HashSet<PathBuf>,
    index: &CourseIndex,
) -> Result<(), DaemonError> {
    for (name, root) in index.roots() {
        if !root.is_dir() {
            tracing::warn!(course = name, path = %root.display(), "course directory missing; not watching");
            continue;
        }
        if watched.insert(root.to_path_buf()) {
            watcher.watch(root, RecursiveMode::Recursive)?;
            tracing::debug!(course = name, path = %root.display(), "watching course directory");
        }
    }
    Ok(())
}

fn is_relevant_event_kind(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

fn is_registry_yaml(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("yaml")
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Runtime(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

/// `COURSESYNC_LOG_JSON` switches to JSON lines; `RUST_LOG` filters.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var_os("COURSESYNC_LOG_JSON").is_some() {
        let _ = fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .try_init();
    } else {
        let _ = fmt().with_env_filter(filter).with_target(false).try_init();
    }
}
