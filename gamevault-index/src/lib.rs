//! Keep the catalog in step with the library on disk.
//!
//! An index pass scans the library root, classifies every game file against
//! the catalog, applies the result through the [`Reconciler`], and queues a
//! metadata merge for each entry it touched. The [`IndexScheduler`] runs
//! passes one at a time; the [`LibraryWatcher`] feeds it triggers.

pub mod error;
pub mod index;
pub mod progress;
pub mod reconcile;
pub mod scheduler;
pub mod watcher;

pub use error::IndexError;
pub use index::{IndexOptions, IndexStats, run_index};
pub use progress::{IndexProgress, LogProgress, SilentProgress};
pub use reconcile::{ReconcileAction, ReconcileOutcome, Reconciler};
pub use scheduler::{IndexScheduler, SchedulerHandle};
pub use watcher::{LibraryWatcher, WatchMode};
