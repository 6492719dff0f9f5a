//! Turn library changes into index triggers.
//!
//! Two modes:
//! - **Events**: OS notifications via `notify`, debounced so that a burst of
//!   events (a large copy, an extraction) produces one trigger. Removed game
//!   files are retired immediately through the reconciler.
//! - **Polling**: a periodic fingerprint of the tree (paths, sizes, mtimes);
//!   a changed fingerprint triggers a pass. For network shares and other
//!   filesystems that do not deliver events.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};

use gamevault_lib::scanner::has_matching_extension;
use gamevault_lib::{ScanOptions, fingerprint, resolve_root, scan_library};

use crate::error::IndexError;
use crate::reconcile::Reconciler;
use crate::scheduler::SchedulerHandle;

/// Capacity of the channel bridging `notify` callbacks into tokio. When it
/// is full, further events are dropped and a pass is triggered anyway.
const CHANNEL_CAPACITY: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchMode {
    Events { debounce: Duration },
    Polling { interval: Duration },
}

/// A running watcher. Dropping it (or calling [`stop`](Self::stop)) ends
/// the watch.
pub struct LibraryWatcher {
    /// Must stay alive; dropping it deregisters the OS watch.
    _watcher: Option<RecommendedWatcher>,
    task: JoinHandle<()>,
}

impl LibraryWatcher {
    /// Watch the canonical form of `root`, so removal paths match stored entries.
    pub fn start(
        root: &Path,
        scan: ScanOptions,
        mode: WatchMode,
        scheduler: SchedulerHandle,
        reconciler: Arc<Reconciler>,
    ) -> Result<Self, IndexError> {
        let root = resolve_root(root)?;
        match mode {
            WatchMode::Events { debounce } => {
                Self::start_events(&root, scan, debounce, scheduler, reconciler)
            }
            WatchMode::Polling { interval } => Ok(Self {
                _watcher: None,
                task: tokio::spawn(poll_loop(root, scan, interval, scheduler)),
            }),
        }
    }

    fn start_events(
        root: &Path,
        scan: ScanOptions,
        debounce: Duration,
        scheduler: SchedulerHandle,
        reconciler: Arc<Reconciler>,
    ) -> Result<Self, IndexError> {
        let (tx, rx) = mpsc::channel::<notify::Event>(CHANNEL_CAPACITY);
        let overflow = scheduler.clone();
        let mut watcher = notify::recommended_watcher(
            move |res: Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    if tx.try_send(event).is_err() {
                        overflow.trigger();
                    }
                }
                Err(e) => log::warn!("File watcher error: {}", e),
            },
        )
        .map_err(|source| IndexError::Watch {
            path: root.to_path_buf(),
            source,
        })?;

        let mode = if scan.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(root, mode)
            .map_err(|source| IndexError::Watch {
                path: root.to_path_buf(),
                source,
            })?;
        log::info!("Watching {} for changes", root.display());

        let task = tokio::spawn(event_loop(rx, scan, debounce, scheduler, reconciler));
        Ok(Self {
            _watcher: Some(watcher),
            task,
        })
    }

    pub fn stop(self) {
        self.task.abort();
    }
}

async fn event_loop(
    mut rx: mpsc::Receiver<notify::Event>,
    scan: ScanOptions,
    debounce: Duration,
    scheduler: SchedulerHandle,
    reconciler: Arc<Reconciler>,
) {
    while let Some(first) = rx.recv().await {
        let mut batch = vec![first];
        // Keep collecting until the library has been quiet for `debounce`.
        while let Ok(Some(event)) = tokio::time::timeout(debounce, rx.recv()).await {
            batch.push(event);
        }

        let (relevant, removed) = summarize(&batch, &scan);
        if !relevant {
            continue;
        }
        for path in removed {
            if path.exists() {
                continue;
            }
            if let Err(e) = reconciler.remove_path(&path) {
                log::warn!("Failed to retire {}: {}", path.display(), e);
            }
        }
        log::debug!("{} file event(s), triggering index pass", batch.len());
        if !scheduler.trigger() {
            break;
        }
    }
}

/// Whether a batch touches any game file, and which game files it removed.
fn summarize(batch: &[notify::Event], scan: &ScanOptions) -> (bool, Vec<PathBuf>) {
    let mut relevant = false;
    let mut removed = Vec::new();
    for event in batch {
        if matches!(event.kind, EventKind::Access(_)) {
            continue;
        }
        for path in &event.paths {
            // Directory events matter too: a moved folder carries game files.
            if !has_matching_extension(path, &scan.extensions) && path.extension().is_some() {
                continue;
            }
            relevant = true;
            if matches!(event.kind, EventKind::Remove(_)) && path.extension().is_some() {
                removed.push(path.clone());
            }
        }
    }
    removed.sort();
    removed.dedup();
    (relevant, removed)
}

async fn poll_loop(
    root: PathBuf,
    scan: ScanOptions,
    interval: Duration,
    scheduler: SchedulerHandle,
) {
    let interval = interval.max(Duration::from_secs(1));
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last: Option<u64> = None;
    log::info!(
        "Polling {} every {}s for changes",
        root.display(),
        interval.as_secs()
    );

    loop {
        ticker.tick().await;
        let current = match scan_library(&root, &scan) {
            Ok(files) => fingerprint(&files),
            Err(e) => {
                log::warn!("Polling scan failed: {}", e);
                continue;
            }
        };
        if last.is_some_and(|prev| prev != current) {
            log::debug!("Library fingerprint changed, triggering index pass");
            if !scheduler.trigger() {
                break;
            }
        }
        last = Some(current);
    }
}
