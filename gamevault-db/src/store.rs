//! The catalog repository interface and its SQLite implementation.
//!
//! The reconciler and the metadata engine only ever see `dyn CatalogStore`,
//! so tests can wrap or replace the store. [`SqliteStore`] serializes access
//! behind a mutex and runs each write in its own transaction.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use gamevault_catalog::{
    CatalogEntry, EntityKind, EntryFields, ExistenceCheck, GameCandidate, GameMetadata,
    MetadataKind, MetadataSources, NamedEntity, classify,
};
use rusqlite::Connection;

use crate::operations::{self, StoreError};
use crate::queries::{self, CatalogStats};
use crate::schema::{open_database, open_memory};

/// Persistent storage for catalog entries and their metadata.
pub trait CatalogStore: Send + Sync {
    /// Entry at an exact path, preferring a live one.
    fn find_by_path(&self, path: &Path) -> Result<Option<CatalogEntry>, StoreError>;

    /// Entry with this exact title and release date, preferring a live one.
    fn find_by_title_and_release(
        &self,
        title: &str,
        release_date: Option<NaiveDate>,
    ) -> Result<Option<CatalogEntry>, StoreError>;

    fn get_entry(&self, id: i64) -> Result<Option<CatalogEntry>, StoreError>;

    /// Insert a new entry. `Conflict` if a live entry already has the path.
    fn create_entry(&self, fields: &EntryFields) -> Result<CatalogEntry, StoreError>;

    /// Overwrite an entry's file-derived fields in place.
    fn update_entry(&self, id: i64, fields: &EntryFields) -> Result<CatalogEntry, StoreError>;

    /// Soft-delete an entry and remove every metadata row attached to it.
    /// Deleting an already deleted entry is a no-op.
    fn soft_delete_entry(&self, id: i64) -> Result<(), StoreError>;

    /// Clear the soft-delete marker and apply fresh fields.
    fn restore_entry(&self, id: i64, fields: &EntryFields) -> Result<CatalogEntry, StoreError>;

    fn list_live_entries(&self) -> Result<Vec<CatalogEntry>, StoreError>;

    /// The entry and all of its metadata, or `None` for an unknown id.
    fn load_sources(&self, entry_id: i64) -> Result<Option<MetadataSources>, StoreError>;

    /// Insert or replace one provider record, keyed by `(entry, slug, provider id)`.
    fn upsert_provider_metadata(
        &self,
        entry_id: i64,
        metadata: &GameMetadata,
    ) -> Result<GameMetadata, StoreError>;

    /// Insert or replace the single user override of an entry.
    fn upsert_user_metadata(
        &self,
        entry_id: i64,
        metadata: &GameMetadata,
    ) -> Result<GameMetadata, StoreError>;

    /// Remove the user override (`"user"`) or one provider's rows.
    /// Returns how many rows were removed.
    fn delete_metadata_for_slug(&self, entry_id: i64, slug: &str) -> Result<usize, StoreError>;

    /// Insert or rename a named entity by natural key; the result carries its id.
    fn upsert_named_entity(
        &self,
        kind: EntityKind,
        entity: &NamedEntity,
    ) -> Result<NamedEntity, StoreError>;

    /// Insert or replace the merged aggregate of an entry. Relations must
    /// already have been upserted.
    fn save_merged_metadata(
        &self,
        entry_id: i64,
        merged: &GameMetadata,
    ) -> Result<GameMetadata, StoreError>;

    /// Point the entry at its merged aggregate.
    fn attach_merged_metadata(&self, entry_id: i64, metadata_id: i64) -> Result<(), StoreError>;

    /// Delete and detach the merged aggregate.
    fn delete_merged_metadata(&self, entry_id: i64) -> Result<(), StoreError>;

    /// Make the merged aggregate older than every source, so the next merge
    /// recomputes it instead of reporting it fresh.
    fn mark_merged_stale(&self, entry_id: i64) -> Result<(), StoreError>;
}

/// Look the candidate up by path and by title and release date, then classify it.
pub fn check_existence(
    store: &dyn CatalogStore,
    candidate: &GameCandidate,
) -> Result<ExistenceCheck, StoreError> {
    let (path, title) = candidate.require()?;
    let by_path = store.find_by_path(path)?;
    let by_title = store.find_by_title_and_release(title, candidate.release_date)?;
    Ok(classify(candidate, by_path.as_ref(), by_title.as_ref())?)
}

// ── SQLite ──────────────────────────────────────────────────────────────────

/// [`CatalogStore`] backed by one SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Open or create the database file at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self::new(open_database(path)?))
    }

    /// A fresh in-memory store.
    pub fn in_memory() -> Result<Self, StoreError> {
        Ok(Self::new(open_memory()?))
    }

    pub fn stats(&self) -> Result<CatalogStats, StoreError> {
        queries::catalog_stats(&*self.lock()?)
    }

    /// Number of relation rows attached to a metadata row.
    pub fn relation_count(&self, metadata_id: i64) -> Result<usize, StoreError> {
        queries::count_relations(&*self.lock()?, metadata_id)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Run `f` inside a transaction, committing only if it succeeds.
    fn write<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    fn require_entry(conn: &Connection, id: i64) -> Result<CatalogEntry, StoreError> {
        queries::get_entry(conn, id)?.ok_or_else(|| StoreError::not_found("catalog entry", id))
    }

    fn write_source(
        &self,
        entry_id: i64,
        kind: MetadataKind,
        metadata: &GameMetadata,
    ) -> Result<GameMetadata, StoreError> {
        self.write(|conn| {
            Self::require_entry(conn, entry_id)?;
            let (id, updated_at) =
                operations::write_source_metadata(conn, entry_id, kind, metadata)?;
            let mut stored = metadata.clone();
            stored.id = Some(id);
            stored.updated_at = Some(updated_at);
            stored.created_at.get_or_insert(updated_at);
            Ok(stored)
        })
    }
}

impl CatalogStore for SqliteStore {
    fn find_by_path(&self, path: &Path) -> Result<Option<CatalogEntry>, StoreError> {
        queries::find_entry_by_path(&*self.lock()?, path)
    }

    fn find_by_title_and_release(
        &self,
        title: &str,
        release_date: Option<NaiveDate>,
    ) -> Result<Option<CatalogEntry>, StoreError> {
        queries::find_entry_by_title_and_release(&*self.lock()?, title, release_date)
    }

    fn get_entry(&self, id: i64) -> Result<Option<CatalogEntry>, StoreError> {
        queries::get_entry(&*self.lock()?, id)
    }

    fn create_entry(&self, fields: &EntryFields) -> Result<CatalogEntry, StoreError> {
        self.write(|conn| {
            let id = operations::insert_entry(conn, fields)?;
            Self::require_entry(conn, id)
        })
    }

    fn update_entry(&self, id: i64, fields: &EntryFields) -> Result<CatalogEntry, StoreError> {
        self.write(|conn| {
            operations::write_entry_fields(conn, id, fields, false)?;
            Self::require_entry(conn, id)
        })
    }

    fn soft_delete_entry(&self, id: i64) -> Result<(), StoreError> {
        self.write(|conn| operations::mark_entry_deleted(conn, id))
    }

    fn restore_entry(&self, id: i64, fields: &EntryFields) -> Result<CatalogEntry, StoreError> {
        self.write(|conn| {
            operations::write_entry_fields(conn, id, fields, true)?;
            Self::require_entry(conn, id)
        })
    }

    fn list_live_entries(&self) -> Result<Vec<CatalogEntry>, StoreError> {
        queries::list_live_entries(&*self.lock()?)
    }

    fn load_sources(&self, entry_id: i64) -> Result<Option<MetadataSources>, StoreError> {
        queries::load_sources(&*self.lock()?, entry_id)
    }

    fn upsert_provider_metadata(
        &self,
        entry_id: i64,
        metadata: &GameMetadata,
    ) -> Result<GameMetadata, StoreError> {
        if metadata.provider_slug.is_empty() || metadata.provider_data_id.is_empty() {
            return Err(StoreError::Conflict(
                "provider metadata needs a provider slug and id".to_string(),
            ));
        }
        self.write_source(entry_id, MetadataKind::Provider, metadata)
    }

    fn upsert_user_metadata(
        &self,
        entry_id: i64,
        metadata: &GameMetadata,
    ) -> Result<GameMetadata, StoreError> {
        let mut stored = self.write_source(entry_id, MetadataKind::User, metadata)?;
        stored.provider_slug = gamevault_catalog::USER_SLUG.to_string();
        stored.provider_data_id = entry_id.to_string();
        Ok(stored)
    }

    fn delete_metadata_for_slug(&self, entry_id: i64, slug: &str) -> Result<usize, StoreError> {
        self.write(|conn| operations::delete_metadata_for_slug(conn, entry_id, slug))
    }

    fn upsert_named_entity(
        &self,
        kind: EntityKind,
        entity: &NamedEntity,
    ) -> Result<NamedEntity, StoreError> {
        let id = self.write(|conn| operations::upsert_named_entity(conn, kind, entity))?;
        let mut stored = entity.clone();
        stored.id = Some(id);
        Ok(stored)
    }

    fn save_merged_metadata(
        &self,
        entry_id: i64,
        merged: &GameMetadata,
    ) -> Result<GameMetadata, StoreError> {
        self.write(|conn| {
            Self::require_entry(conn, entry_id)?;
            let (id, updated_at) = operations::write_merged_metadata(conn, entry_id, merged)?;
            let mut stored = merged.clone();
            stored.id = Some(id);
            stored.provider_slug = gamevault_catalog::MERGED_SLUG.to_string();
            stored.provider_data_id = entry_id.to_string();
            stored.updated_at = Some(updated_at);
            stored.created_at.get_or_insert(updated_at);
            Ok(stored)
        })
    }

    fn attach_merged_metadata(&self, entry_id: i64, metadata_id: i64) -> Result<(), StoreError> {
        self.write(|conn| operations::set_entry_metadata(conn, entry_id, Some(metadata_id)))
    }

    fn delete_merged_metadata(&self, entry_id: i64) -> Result<(), StoreError> {
        self.write(|conn| operations::delete_merged_metadata(conn, entry_id))
    }

    fn mark_merged_stale(&self, entry_id: i64) -> Result<(), StoreError> {
        self.write(|conn| operations::mark_merged_stale(conn, entry_id).map(|_| ()))
    }
}
