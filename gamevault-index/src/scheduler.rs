//! Runs index passes one at a time in response to triggers.
//!
//! Triggers come from startup, a periodic timer, the file watcher, or a
//! caller. Passes never overlap: a trigger that arrives while a pass runs is
//! remembered, and any number of such triggers collapse into a single
//! follow-up pass.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, Interval, MissedTickBehavior};

use gamevault_lib::CancelFlag;

use crate::error::IndexError;
use crate::index::{IndexOptions, IndexStats, run_index};
use crate::progress::{IndexProgress, LogProgress};
use crate::reconcile::Reconciler;

struct Shared {
    /// Holds at most one stored permit, which is the queued follow-up.
    trigger: Notify,
    stop: Notify,
    closed: AtomicBool,
    cancel: CancelFlag,
    completed: watch::Sender<u64>,
}

/// A cloneable handle for requesting index passes.
#[derive(Clone)]
pub struct SchedulerHandle {
    shared: Arc<Shared>,
}

impl SchedulerHandle {
    /// Ask for an index pass. Returns false once the scheduler is shut down.
    pub fn trigger(&self) -> bool {
        if self.shared.closed.load(Ordering::SeqCst) {
            return false;
        }
        self.shared.trigger.notify_one();
        true
    }

    /// Number of passes finished so far, updated after each pass.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.completed.subscribe()
    }
}

/// Owns the background task that runs index passes.
pub struct IndexScheduler {
    handle: SchedulerHandle,
    task: JoinHandle<Option<IndexStats>>,
}

impl IndexScheduler {
    /// Start the scheduler and queue the startup pass.
    ///
    /// `interval` adds a periodic trigger; `None` or a zero duration
    /// disables it.
    pub fn start(
        reconciler: Arc<Reconciler>,
        options: IndexOptions,
        interval: Option<Duration>,
    ) -> Self {
        Self::start_with_progress(reconciler, options, interval, Arc::new(LogProgress))
    }

    pub fn start_with_progress(
        reconciler: Arc<Reconciler>,
        options: IndexOptions,
        interval: Option<Duration>,
        progress: Arc<dyn IndexProgress>,
    ) -> Self {
        let (completed, _) = watch::channel(0);
        let shared = Arc::new(Shared {
            trigger: Notify::new(),
            stop: Notify::new(),
            closed: AtomicBool::new(false),
            cancel: CancelFlag::new(),
            completed,
        });
        let handle = SchedulerHandle {
            shared: shared.clone(),
        };
        handle.trigger();

        let ticker = interval.filter(|d| !d.is_zero()).map(|period| {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        let task = tokio::spawn(run_loop(shared, reconciler, options, ticker, progress));
        Self { handle, task }
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    pub fn trigger(&self) -> bool {
        self.handle.trigger()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.handle.subscribe()
    }

    /// Stop accepting triggers, let the running pass finish the files it
    /// has in hand, and wait for the scheduler to exit. Returns the stats
    /// of the last pass that ran.
    pub async fn shutdown(self) -> Result<Option<IndexStats>, IndexError> {
        let shared = &self.handle.shared;
        shared.closed.store(true, Ordering::SeqCst);
        shared.cancel.cancel();
        shared.stop.notify_one();
        self.task.await.map_err(|e| {
            log::error!("Indexing scheduler task failed: {}", e);
            IndexError::ShutDown
        })
    }
}

async fn run_loop(
    shared: Arc<Shared>,
    reconciler: Arc<Reconciler>,
    options: IndexOptions,
    mut ticker: Option<Interval>,
    progress: Arc<dyn IndexProgress>,
) -> Option<IndexStats> {
    let mut last = None;
    loop {
        tokio::select! {
            biased;
            _ = shared.stop.notified() => break,
            _ = shared.trigger.notified() => {}
            _ = tick(&mut ticker) => log::debug!("Periodic index pass due"),
        }
        if shared.cancel.is_cancelled() {
            break;
        }

        log::info!("Indexing {}", options.root.display());
        match run_index(
            reconciler.clone(),
            &options,
            shared.cancel.clone(),
            progress.as_ref(),
        )
        .await
        {
            Ok(stats) => last = Some(stats),
            Err(e) => log::error!("Index pass failed: {}", e),
        }
        shared.completed.send_modify(|n| *n += 1);
    }
    log::debug!("Indexing scheduler stopped");
    last
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
