//! The parallel filesystem scanner.
//!
//! A fixed pool of workers drains a queue of pending directories. Each
//! worker takes a directory task, enumerates it through the [`FileSystem`]
//! adapter, appends child nodes to the task's cell, and enqueues new
//! directory tasks subject to the depth limit. A sentinel is enqueued once
//! per worker when the pending-task counter drains to zero.
//!
//! Statistics are kept in worker-local counters and flushed under the shared
//! stats mutex only on task boundaries, keeping the lock cold. Cancellation
//! is cooperative: the probe is consulted before each task and on entry
//! iteration, and once observed the workers drain the queue without doing
//! further work.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::fs::{FileSystem, OsFileSystem};
use crate::tree;
use crate::types::{
    CancelCheck, NodeKind, ProgressCallback, ScanError, ScanErrorKind, ScanNode, ScanOptions,
    ScanSnapshot, ScanStats,
};

/// Progress is published once a worker crosses another multiple of this many
/// processed entries.
const PROGRESS_INTERVAL: u64 = 100;

type ProgressRef<'a> = &'a (dyn Fn(&str, u64, u64) + Send + Sync);
type CancelRef<'a> = &'a (dyn Fn() -> bool + Send + Sync);

/// A directory being scanned. Exactly one worker owns the scan of a
/// directory, so `children` has a single producer; readers only look after
/// the worker barrier.
struct DirCell {
    path: String,
    name: String,
    children: Mutex<Vec<PendingNode>>,
}

enum PendingNode {
    File(ScanNode),
    Dir(Arc<DirCell>),
}

struct Task {
    cell: Arc<DirCell>,
    depth: usize,
}

#[derive(Default)]
struct LocalCounters {
    files: u64,
    dirs: u64,
    errors: u64,
}

impl LocalCounters {
    fn flush(&mut self, stats: &Mutex<ScanStats>) {
        if self.files | self.dirs | self.errors == 0 {
            return;
        }
        let mut shared = lock(stats);
        shared.files += self.files;
        shared.directories += self.dirs;
        shared.access_errors += self.errors;
        self.files = 0;
        self.dirs = 0;
        self.errors = 0;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// State shared between the scan driver and its workers.
struct Shared {
    queue_tx: Sender<Option<Task>>,
    stats: Mutex<ScanStats>,
    pending: AtomicUsize,
    cancelled: AtomicBool,
    worker_panicked: AtomicBool,
    workers: usize,
}

impl Shared {
    fn submit(&self, task: Task) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        let _ = self.queue_tx.send(Some(task));
    }

    /// Marks one task done; the last one poisons the queue, once per worker.
    fn complete_task(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            for _ in 0..self.workers {
                let _ = self.queue_tx.send(None);
            }
        }
    }

    fn check_cancelled(&self, cancel: Option<CancelRef<'_>>) -> bool {
        if self.cancelled.load(Ordering::Relaxed) {
            return true;
        }
        if let Some(probe) = cancel {
            if probe() {
                self.cancelled.store(true, Ordering::Relaxed);
                return true;
            }
        }
        false
    }
}

/// The work-queue scanner.
///
/// Construct with the worker count, then attach optional hooks:
///
/// ```no_run
/// use diskscope::engine::Scanner;
/// use diskscope::types::ScanOptions;
///
/// let snapshot = Scanner::new(8)
///     .scan("~/projects", &ScanOptions::default())
///     .unwrap();
/// println!("{} files", snapshot.stats.files);
/// ```
pub struct Scanner {
    workers: usize,
    fs: Arc<dyn FileSystem>,
    progress: Option<ProgressCallback>,
    cancel: Option<CancelCheck>,
}

impl Scanner {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            fs: Arc::new(OsFileSystem),
            progress: None,
            cancel: None,
        }
    }

    /// Swaps the filesystem adapter (platform-specific or test double).
    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Attaches an advisory progress callback. It is invoked from worker
    /// threads with no ordering or at-least-once guarantee.
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Attaches a cooperative cancellation probe.
    pub fn with_cancel_check(mut self, cancel: CancelCheck) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Scans `path` into a finalized, size-annotated tree.
    ///
    /// # Errors
    ///
    /// Fatal failures only: a bad root (`NotFound`, `NotDirectory`,
    /// `RootStatFailed`), observed cancellation (`Cancelled`), or a worker
    /// fault (`Internal`). Per-entry failures are counted in
    /// [`ScanStats::access_errors`] and the affected subtree is abandoned.
    pub fn scan(
        &self,
        path: &str,
        options: &ScanOptions,
    ) -> std::result::Result<ScanSnapshot, ScanError> {
        let resolved = self.resolve_root(path)?;
        log::debug!("scanning {resolved} with {} workers", self.workers);

        let root_name = resolved
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or(resolved.as_str())
            .to_string();
        let root_cell = Arc::new(DirCell {
            path: resolved.clone(),
            name: root_name,
            children: Mutex::new(Vec::new()),
        });

        let (queue_tx, queue_rx) = unbounded::<Option<Task>>();
        let shared = Shared {
            queue_tx,
            stats: Mutex::new(ScanStats {
                directories: 1,
                ..ScanStats::default()
            }),
            pending: AtomicUsize::new(0),
            cancelled: AtomicBool::new(false),
            worker_panicked: AtomicBool::new(false),
            workers: self.workers,
        };
        shared.submit(Task {
            cell: Arc::clone(&root_cell),
            depth: 0,
        });

        std::thread::scope(|scope| {
            for _ in 0..self.workers {
                let rx = queue_rx.clone();
                let shared = &shared;
                let fs = self.fs.as_ref();
                let progress = self.progress.as_deref();
                let cancel = self.cancel.as_deref();
                scope.spawn(move || run_worker(shared, &rx, fs, options, progress, cancel));
            }
        });

        if shared.cancelled.load(Ordering::Relaxed) {
            return Err(ScanError::new(
                ScanErrorKind::Cancelled,
                resolved,
                "scan cancelled",
            ));
        }
        if shared.worker_panicked.load(Ordering::Relaxed) {
            return Err(ScanError::new(
                ScanErrorKind::Internal,
                resolved,
                "scan worker failed unexpectedly",
            ));
        }

        let mut root = assemble(&root_cell);
        tree::finalize_sizes(&mut root);
        let stats = *lock(&shared.stats);
        log::debug!(
            "scan of {} complete: {} files, {} dirs, {} access errors",
            root.path,
            stats.files,
            stats.directories,
            stats.access_errors
        );
        Ok(ScanSnapshot { root, stats })
    }

    fn resolve_root(&self, path: &str) -> std::result::Result<String, ScanError> {
        let expanded = self.fs.expand_user(path);
        if !self.fs.exists(&expanded) {
            return Err(ScanError::new(
                ScanErrorKind::NotFound,
                expanded,
                "path does not exist",
            ));
        }
        let resolved = self.fs.absolute(&expanded).map_err(|err| {
            ScanError::new(
                ScanErrorKind::RootStatFailed,
                expanded.clone(),
                format!("cannot resolve root: {err}"),
            )
        })?;
        let stat = self.fs.stat(&resolved).map_err(|err| {
            ScanError::new(
                ScanErrorKind::RootStatFailed,
                resolved.clone(),
                format!("cannot stat root: {err}"),
            )
        })?;
        if !stat.is_dir {
            return Err(ScanError::new(
                ScanErrorKind::NotDirectory,
                resolved,
                "path is not a directory",
            ));
        }
        Ok(resolved)
    }
}

fn run_worker(
    shared: &Shared,
    rx: &Receiver<Option<Task>>,
    fs: &dyn FileSystem,
    options: &ScanOptions,
    progress: Option<ProgressRef<'_>>,
    cancel: Option<CancelRef<'_>>,
) {
    let mut local = LocalCounters::default();
    while let Ok(message) = rx.recv() {
        let Some(task) = message else {
            break;
        };
        if !shared.check_cancelled(cancel) {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                scan_directory(shared, fs, &task, options, progress, cancel, &mut local);
            }));
            if outcome.is_err() {
                shared.worker_panicked.store(true, Ordering::Relaxed);
            }
        }
        local.flush(&shared.stats);
        shared.complete_task();
    }
}

fn scan_directory(
    shared: &Shared,
    fs: &dyn FileSystem,
    task: &Task,
    options: &ScanOptions,
    progress: Option<ProgressRef<'_>>,
    cancel: Option<CancelRef<'_>>,
    local: &mut LocalCounters,
) {
    let entries = match fs.scan_dir(&task.cell.path) {
        Ok(entries) => entries,
        Err(err) => {
            // The subtree is abandoned; the node stays as an empty directory.
            log::warn!("cannot read {}: {err}", task.cell.path);
            local.errors += 1;
            return;
        }
    };

    let before = local.files + local.dirs;
    let mut nodes: Vec<PendingNode> = Vec::new();
    let mut subdirs: Vec<Task> = Vec::new();
    let descend = options.max_depth.map_or(true, |limit| task.depth < limit);

    for entry in entries {
        if shared.check_cancelled(cancel) {
            break;
        }
        let Some(stat) = entry.stat else {
            local.errors += 1;
            continue;
        };
        if stat.is_dir {
            local.dirs += 1;
            let cell = Arc::new(DirCell {
                path: entry.path,
                name: entry.name,
                children: Mutex::new(Vec::new()),
            });
            if descend {
                subdirs.push(Task {
                    cell: Arc::clone(&cell),
                    depth: task.depth + 1,
                });
            }
            nodes.push(PendingNode::Dir(cell));
        } else {
            local.files += 1;
            nodes.push(PendingNode::File(ScanNode {
                path: entry.path,
                name: entry.name,
                kind: NodeKind::File,
                size_bytes: stat.size,
                disk_usage: stat.disk_usage,
                children: Vec::new(),
            }));
        }
    }

    lock(&task.cell.children).extend(nodes);

    if !shared.cancelled.load(Ordering::Relaxed) {
        for subtask in subdirs {
            shared.submit(subtask);
        }
    }

    if let Some(callback) = progress {
        let after = local.files + local.dirs;
        if after / PROGRESS_INTERVAL > before / PROGRESS_INTERVAL {
            let (files, dirs) = {
                let stats = lock(&shared.stats);
                (stats.files, stats.directories)
            };
            callback(&task.cell.path, files + local.files, dirs + local.dirs);
        }
    }
}

/// Converts the cell graph into the owned tree. Directory sizes stay zero
/// here; the finalizer assigns them.
fn assemble(cell: &DirCell) -> ScanNode {
    let pending = std::mem::take(&mut *lock(&cell.children));
    let mut children = Vec::with_capacity(pending.len());
    for node in pending {
        match node {
            PendingNode::File(file) => children.push(file),
            PendingNode::Dir(dir) => children.push(assemble(&dir)),
        }
    }
    ScanNode {
        path: cell.path.clone(),
        name: cell.name.clone(),
        kind: NodeKind::Directory,
        size_bytes: 0,
        disk_usage: 0,
        children,
    }
}
