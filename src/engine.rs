//! Organize engine
//!
//! Runs the scan, date resolution, planning and move pipeline over one root
//! directory. Only one run may be active per engine at a time; a run can be
//! driven on the caller's thread with [`OrganizeEngine::run`] or on a
//! background worker with [`OrganizeEngine::start`].

use crate::config::{Config, SubdirLayout};
use crate::error::{Error, Result};
use crate::filesystem::{FileSystem, LocalFs};
use crate::format::is_supported_image;
use crate::planner::plan_destination;
use crate::progress::{ProgressEvent, ProgressSink, RunEvent};
use crate::time::exif::ExifMetadata;
use crate::time::{CaptureDate, DateResolver, MetadataSource};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{Level, debug, error, info, span, warn};

/// Lifecycle phase of the engine's current or most recent run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum RunPhase {
    Idle = 0,
    Scanning = 1,
    Processing = 2,
    Completed = 3,
    Cancelled = 4,
    FatalError = 5,
}

impl RunPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => RunPhase::Scanning,
            2 => RunPhase::Processing,
            3 => RunPhase::Completed,
            4 => RunPhase::Cancelled,
            5 => RunPhase::FatalError,
            _ => RunPhase::Idle,
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunOutcome {
    /// Every candidate was visited
    Completed,
    /// Cancellation was observed between candidates
    Cancelled,
    /// The root could not be scanned
    FatalError,
}

/// Status of one processed file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileStatus {
    Moved,
    Failed,
}

/// Result of processing a single file
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    /// Source file path
    pub source: PathBuf,
    /// Destination file path, once planned
    pub destination: Option<PathBuf>,
    /// Resolved capture date, once resolved
    pub capture_date: Option<CaptureDate>,
    pub status: FileStatus,
    /// Error message (if failed)
    pub error: Option<String>,
}

impl FileOutcome {
    fn moved(source: &Path, destination: PathBuf, date: CaptureDate) -> Self {
        Self {
            source: source.to_path_buf(),
            destination: Some(destination),
            capture_date: Some(date),
            status: FileStatus::Moved,
            error: None,
        }
    }

    fn failed(
        source: &Path,
        destination: Option<PathBuf>,
        date: Option<CaptureDate>,
        error: &Error,
    ) -> Self {
        Self {
            source: source.to_path_buf(),
            destination,
            capture_date: date,
            status: FileStatus::Failed,
            error: Some(error.to_string()),
        }
    }
}

/// Final, immutable record of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub root: PathBuf,
    /// Candidates found by the scan
    pub total: usize,
    /// Files moved
    pub processed: usize,
    /// Files that failed planning or moving
    pub errors: usize,
    pub cancelled: bool,
    /// Scan failure that aborted the run
    pub fatal_error: Option<String>,
    pub outcome: RunOutcome,
    /// Per-file outcomes in processing order
    pub files: Vec<FileOutcome>,
}

impl RunSummary {
    fn new(root: &Path, total: usize) -> Self {
        Self {
            root: root.to_path_buf(),
            total,
            processed: 0,
            errors: 0,
            cancelled: false,
            fatal_error: None,
            outcome: RunOutcome::Completed,
            files: Vec::new(),
        }
    }

    fn fatal(root: &Path, error: &Error) -> Self {
        Self {
            fatal_error: Some(error.to_string()),
            outcome: RunOutcome::FatalError,
            ..Self::new(root, 0)
        }
    }

    fn record(&mut self, outcome: FileOutcome) {
        match outcome.status {
            FileStatus::Moved => self.processed += 1,
            FileStatus::Failed => self.errors += 1,
        }
        self.files.push(outcome);
    }

    /// Files that failed
    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.files.iter().filter(|f| f.status == FileStatus::Failed)
    }

    /// Pretty-printed JSON for machine consumers
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "Total: {}, Processed: {}, Errors: {}, Cancelled: {}",
            self.total, self.processed, self.errors, self.cancelled
        )
    }
}

/// Cooperative cancellation flag, polled by the engine between files
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Marks the engine busy until dropped
struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A run executing on a background worker
pub struct RunHandle {
    events: Receiver<RunEvent>,
    cancel: CancelToken,
    worker: JoinHandle<RunSummary>,
}

impl RunHandle {
    /// Request cancellation; the worker stops before its next file
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that can cancel this run from another thread
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Blocking iterator over the run's events, ending after [`RunEvent::Finished`]
    pub fn events(&self) -> mpsc::Iter<'_, RunEvent> {
        self.events.iter()
    }

    /// Wait for the worker and return the run's summary
    pub fn wait(self) -> Result<RunSummary> {
        self.worker.join().map_err(|_| Error::WorkerPanicked)
    }
}

/// Organizes images under a root into dated subdirectories
#[derive(Clone)]
pub struct OrganizeEngine {
    fs: Arc<dyn FileSystem>,
    metadata: Arc<dyn MetadataSource>,
    layout: SubdirLayout,
    exclude_dirs: Vec<PathBuf>,
    active: Arc<AtomicBool>,
    phase: Arc<AtomicU8>,
}

impl OrganizeEngine {
    /// Create an engine over the given filesystem and metadata reader
    pub fn new(fs: Arc<dyn FileSystem>, metadata: Arc<dyn MetadataSource>) -> Self {
        Self {
            fs,
            metadata,
            layout: SubdirLayout::default(),
            exclude_dirs: Vec::new(),
            active: Arc::new(AtomicBool::new(false)),
            phase: Arc::new(AtomicU8::new(RunPhase::Idle as u8)),
        }
    }

    /// Create an engine on the local filesystem with EXIF metadata
    pub fn from_config(config: &Config) -> Self {
        let fs = LocalFs::new().with_follow_links(config.follow_links);
        Self::new(Arc::new(fs), Arc::new(ExifMetadata))
            .with_layout(config.layout)
            .with_exclude_dirs(config.exclude_dirs.clone())
    }

    pub fn with_layout(mut self, layout: SubdirLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_exclude_dirs(mut self, exclude_dirs: Vec<PathBuf>) -> Self {
        self.exclude_dirs = exclude_dirs;
        self
    }

    /// Phase of the current or most recent run
    pub fn phase(&self) -> RunPhase {
        RunPhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    /// Whether a run is active
    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Run to completion on the calling thread
    pub fn run(
        &self,
        root: &Path,
        sink: &mut dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<RunSummary> {
        let _guard = self.acquire()?;
        Ok(self.execute(root, sink, cancel))
    }

    /// Start a run on a background worker thread
    pub fn start(&self, root: impl Into<PathBuf>) -> Result<RunHandle> {
        let guard = self.acquire()?;
        let root = root.into();
        let (tx, events) = mpsc::channel();
        let cancel = CancelToken::new();

        let engine = self.clone();
        let worker_cancel = cancel.clone();
        let worker = thread::Builder::new()
            .name("organize-worker".into())
            .spawn(move || {
                let mut tx = tx;
                let summary = engine.execute(&root, &mut tx, &worker_cancel);
                // Free the engine before the front end learns the run is over
                drop(guard);
                let _ = tx.send(RunEvent::Finished(summary.clone()));
                summary
            })?;

        Ok(RunHandle {
            events,
            cancel,
            worker,
        })
    }

    fn acquire(&self) -> Result<ActiveGuard> {
        self.active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| {
                warn!("Rejected start request, a run is already active");
                Error::AlreadyRunning
            })?;
        Ok(ActiveGuard(self.active.clone()))
    }

    fn set_phase(&self, phase: RunPhase) {
        debug!(?phase, "Run phase");
        self.phase.store(phase as u8, Ordering::SeqCst);
    }

    fn execute(
        &self,
        root: &Path,
        sink: &mut dyn ProgressSink,
        cancel: &CancelToken,
    ) -> RunSummary {
        let _span = span!(Level::INFO, "organize_run", root = %root.display()).entered();

        self.set_phase(RunPhase::Scanning);
        info!("Scanning for images...");
        let candidates = match self.scan(root) {
            Ok(candidates) => candidates,
            Err(e) => {
                error!(error = %e, "Scan failed, aborting run");
                sink.on_progress(ProgressEvent::new(0, 0, e.to_string()));
                self.set_phase(RunPhase::FatalError);
                return RunSummary::fatal(root, &e);
            }
        };

        let total = candidates.len();
        let mut summary = RunSummary::new(root, total);
        info!(count = total, "Found image files");

        if total == 0 {
            sink.on_progress(ProgressEvent::new(0, 0, "No image files found"));
            self.set_phase(RunPhase::Completed);
            return summary;
        }

        sink.on_progress(ProgressEvent::new(
            0,
            total,
            format!("Found {} image files", total),
        ));

        self.set_phase(RunPhase::Processing);
        let resolver = DateResolver::new(self.metadata.as_ref(), self.fs.as_ref());

        for (index, path) in candidates.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(visited = index, remaining = total - index, "Cancellation requested, stopping");
                summary.cancelled = true;
                break;
            }

            let outcome = self.process_file(root, path, &resolver);
            let name = path.file_name().unwrap_or_default().to_string_lossy();
            let message = match (&outcome.status, &outcome.capture_date) {
                (FileStatus::Moved, Some(date)) => format!(
                    "Processed: {} → {}",
                    name,
                    self.layout.subdir(&date.timestamp).display()
                ),
                _ => format!(
                    "Failed: {} ({})",
                    name,
                    outcome.error.as_deref().unwrap_or("unknown error")
                ),
            };

            summary.record(outcome);
            sink.on_progress(ProgressEvent::new(index + 1, total, message));
        }

        if summary.cancelled {
            summary.outcome = RunOutcome::Cancelled;
            self.set_phase(RunPhase::Cancelled);
        } else {
            self.set_phase(RunPhase::Completed);
        }

        info!("{}", summary.summary());
        summary
    }

    /// Enumerate supported images under `root`, sorted by path
    fn scan(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let skip_dir =
            |dir: &Path| self.is_organized_dir(root, dir) || self.is_excluded_dir(root, dir);
        let mut files: Vec<PathBuf> = self
            .fs
            .list_tree(root, &skip_dir)?
            .into_iter()
            .filter(|path| is_supported_image(path))
            .collect();

        files.sort();
        Ok(files)
    }

    /// Dated directories directly under the root hold already organized files
    fn is_organized_dir(&self, root: &Path, dir: &Path) -> bool {
        let organized = dir
            .strip_prefix(root)
            .is_ok_and(|relative| self.layout.is_dated_dir(relative));
        if organized {
            debug!(?dir, "Skipping organized directory");
        }
        organized
    }

    /// Check if a path should be excluded based on exclude_dirs configuration.
    /// Folder names only match below the root, never the root's own ancestors.
    fn is_excluded_dir(&self, root: &Path, path: &Path) -> bool {
        let relative = path.strip_prefix(root).unwrap_or(path);
        for exclude in &self.exclude_dirs {
            if exclude.is_absolute() {
                if path.starts_with(exclude) {
                    debug!(?path, ?exclude, "Excluding directory (absolute path match)");
                    return true;
                }
            } else if let Some(exclude_name) = exclude.file_name()
                && relative
                    .components()
                    .any(|c| matches!(c, Component::Normal(name) if name == exclude_name))
            {
                debug!(?path, ?exclude, "Excluding directory (folder name match)");
                return true;
            }
        }

        false
    }

    /// Resolve, plan and move one file
    fn process_file(&self, root: &Path, path: &Path, resolver: &DateResolver<'_>) -> FileOutcome {
        let _span = span!(Level::DEBUG, "organize_file", ?path).entered();

        let Some(file_name) = path.file_name() else {
            let e = Error::InvalidFileName {
                path: path.to_path_buf(),
            };
            error!(?path, error = %e, "Failed to process file");
            return FileOutcome::failed(path, None, None, &e);
        };

        let date = resolver.resolve(path);

        let destination =
            match plan_destination(self.fs.as_ref(), root, self.layout, &date.timestamp, file_name) {
                Ok(destination) => destination,
                Err(e) => {
                    error!(?path, error = %e, "Failed to plan destination");
                    return FileOutcome::failed(path, None, Some(date), &e);
                }
            };

        if let Err(source) = self.fs.move_file(path, &destination) {
            let e = Error::Move {
                from: path.to_path_buf(),
                to: destination.clone(),
                source,
            };
            error!(?path, ?destination, error = %e, "Failed to move file");
            return FileOutcome::failed(path, Some(destination), Some(date), &e);
        }

        info!(
            source = ?path,
            destination = ?destination,
            date_source = ?date.source,
            timestamp = %date.timestamp,
            "Moved file"
        );
        FileOutcome::moved(path, destination, date)
    }
}
