//! One index pass: scan the library, reconcile every file, and retire
//! entries whose files are gone.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use gamevault_catalog::GameCandidate;
use gamevault_lib::{CancelFlag, ScanOptions, WorkerPool, resolve_root, scan_library};

use crate::error::IndexError;
use crate::progress::IndexProgress;
use crate::reconcile::{ReconcileAction, ReconcileOutcome, Reconciler};

/// Where and how to index.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub root: PathBuf,
    pub scan: ScanOptions,
    /// Files reconciled concurrently (at least one).
    pub concurrency: usize,
}

impl IndexOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            scan: ScanOptions::default(),
            concurrency: 1,
        }
    }
}

/// Statistics from an index pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub files_found: usize,
    pub created: usize,
    pub unchanged: usize,
    pub updated: usize,
    pub restored: usize,
    pub deleted: usize,
    pub merge_jobs: usize,
    pub errors: usize,
    /// The pass stopped early; the deletion sweep was skipped.
    pub cancelled: bool,
}

impl IndexStats {
    pub fn processed(&self) -> usize {
        self.created + self.unchanged + self.updated + self.restored + self.errors
    }

    pub fn summary(&self) -> String {
        format!(
            "Indexed {} file(s): {} new, {} updated, {} restored, {} unchanged, {} removed, \
             {} error(s); {} merge job(s) queued{}",
            self.files_found,
            self.created,
            self.updated,
            self.restored,
            self.unchanged,
            self.deleted,
            self.errors,
            self.merge_jobs,
            if self.cancelled { " (cancelled)" } else { "" }
        )
    }

    fn record(&mut self, outcome: &ReconcileOutcome) {
        match outcome.action {
            ReconcileAction::Created => self.created += 1,
            ReconcileAction::Unchanged => self.unchanged += 1,
            ReconcileAction::Updated => self.updated += 1,
            ReconcileAction::Restored => self.restored += 1,
        }
        if outcome.merge_queued {
            self.merge_jobs += 1;
        }
    }
}

/// Run a full index pass.
///
/// The root is canonicalized first; every stored path hangs off that form.
/// Files are reconciled by `options.concurrency` workers. A file that fails
/// is reported and counted; the pass carries on. Once `cancel` is set the
/// workers finish the files in hand and the pass returns early without
/// removing anything.
pub async fn run_index(
    reconciler: Arc<Reconciler>,
    options: &IndexOptions,
    cancel: CancelFlag,
    progress: &dyn IndexProgress,
) -> Result<IndexStats, IndexError> {
    let root = resolve_root(&options.root)?;
    let files = scan_library(&root, &options.scan)?;
    let total = files.len();
    progress.on_scan_complete(total);

    let seen: HashSet<PathBuf> = files.iter().map(|f| f.path.clone()).collect();
    let mut stats = IndexStats {
        files_found: total,
        ..IndexStats::default()
    };

    let worker_reconciler = reconciler.clone();
    let mut pool = WorkerPool::start(options.concurrency, files, cancel.clone(), move |file| {
        let reconciler = worker_reconciler.clone();
        async move {
            let candidate = GameCandidate::from_file(&file.path, file.size);
            let result = reconciler.reconcile(&candidate);
            (file.file_name, result)
        }
    });

    let mut current = 0;
    while let Some((name, result)) = pool.recv().await {
        current += 1;
        match result {
            Ok(outcome) => stats.record(&outcome),
            Err(e) => {
                stats.errors += 1;
                progress.on_error(&name, &e.to_string());
            }
        }
        progress.on_file(current, total, &name);
    }

    if cancel.is_cancelled() {
        stats.cancelled = true;
        log::info!("Index pass cancelled after {} of {} file(s)", current, total);
    } else {
        stats.deleted = reconciler.remove_missing(&root, &seen)?.len();
    }

    progress.on_complete(&stats);
    Ok(stats)
}
