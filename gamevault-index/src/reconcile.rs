//! Apply existence classifications to the catalog.
//!
//! | Classification             | Action                                   |
//! |----------------------------|------------------------------------------|
//! | DoesNotExist               | create entry, queue merge                |
//! | Exists                     | nothing                                  |
//! | ExistsButAltered           | update fields in place, queue merge      |
//! | ExistsButDeletedInDatabase | restore with candidate fields, queue merge |
//!
//! Removal goes the other way: an entry whose file is gone is soft-deleted,
//! which drops its provider records, user override and merged aggregate.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gamevault_catalog::{CatalogEntry, ExistenceCheck, ExistenceState, GameCandidate};
use gamevault_db::{CatalogStore, StoreError, check_existence};
use gamevault_metadata::MergeQueue;

use crate::error::IndexError;

/// What reconciling one candidate did to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReconcileAction {
    Created,
    Unchanged,
    Updated,
    Restored,
}

impl ReconcileAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Unchanged => "unchanged",
            Self::Updated => "updated",
            Self::Restored => "restored",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub action: ReconcileAction,
    pub entry: CatalogEntry,
    /// A merge job was newly queued (false if one was already pending).
    pub merge_queued: bool,
}

/// Keeps the catalog in step with the files on disk.
pub struct Reconciler {
    store: Arc<dyn CatalogStore>,
    queue: Arc<MergeQueue>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn CatalogStore>, queue: Arc<MergeQueue>) -> Self {
        Self { store, queue }
    }

    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    pub fn queue(&self) -> &Arc<MergeQueue> {
        &self.queue
    }

    /// Classify a candidate against the catalog and apply the result.
    pub fn reconcile(&self, candidate: &GameCandidate) -> Result<ReconcileOutcome, IndexError> {
        candidate.require()?;
        let check = check_existence(self.store.as_ref(), candidate).map_err(|e| match e {
            StoreError::Classify(e) => IndexError::Classify(e),
            other => IndexError::Store(other),
        })?;
        self.apply(candidate, check)
    }

    /// Apply an existing classification.
    pub fn apply(
        &self,
        candidate: &GameCandidate,
        check: ExistenceCheck,
    ) -> Result<ReconcileOutcome, IndexError> {
        let fields = candidate.to_fields()?;
        let (action, entry) = match (check.state, check.matched) {
            (ExistenceState::Exists, Some(entry)) => {
                return Ok(ReconcileOutcome {
                    action: ReconcileAction::Unchanged,
                    entry,
                    merge_queued: false,
                });
            }
            (ExistenceState::ExistsButAltered, Some(entry)) => {
                log::debug!(
                    "Entry {} altered ({:?}): {}",
                    entry.id,
                    check.changed,
                    fields.file_path.display()
                );
                let updated = self.store.update_entry(entry.id, &fields)?;
                (ReconcileAction::Updated, updated)
            }
            (ExistenceState::ExistsButDeletedInDatabase, Some(entry)) => {
                let restored = self.store.restore_entry(entry.id, &fields)?;
                log::info!("Restored entry {}: {}", restored.id, restored.file_path.display());
                (ReconcileAction::Restored, restored)
            }
            _ => {
                let created = self.store.create_entry(&fields)?;
                log::info!(
                    "Added '{}' as entry {} ({})",
                    created.title,
                    created.id,
                    created.file_path.display()
                );
                (ReconcileAction::Created, created)
            }
        };

        let merge_queued = self.queue.add(entry.id);
        Ok(ReconcileOutcome {
            action,
            entry,
            merge_queued,
        })
    }

    /// Soft-delete the live entry at `path`, if there is one.
    pub fn remove_path(&self, path: &Path) -> Result<Option<i64>, IndexError> {
        match self.store.find_by_path(path)? {
            Some(entry) if !entry.is_deleted() => {
                self.store.soft_delete_entry(entry.id)?;
                log::info!("Removed entry {}: {}", entry.id, path.display());
                Ok(Some(entry.id))
            }
            _ => Ok(None),
        }
    }

    /// Soft-delete live entries under `root` whose path was not `seen` and
    /// no longer exists on disk. Returns the ids removed.
    pub fn remove_missing(
        &self,
        root: &Path,
        seen: &HashSet<PathBuf>,
    ) -> Result<Vec<i64>, IndexError> {
        let mut removed = Vec::new();
        for entry in self.store.list_live_entries()? {
            if !entry.file_path.starts_with(root)
                || seen.contains(&entry.file_path)
                || entry.file_path.exists()
            {
                continue;
            }
            self.store.soft_delete_entry(entry.id)?;
            log::info!("Entry {} is gone from disk: {}", entry.id, entry.file_path.display());
            removed.push(entry.id);
        }
        Ok(removed)
    }
}
