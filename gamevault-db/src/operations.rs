//! Write operations for catalog entries, metadata rows, and named entities.
//!
//! Every function takes a plain `&Connection` so callers can run several of
//! them inside one transaction.

use chrono::{DateTime, Utc};
use gamevault_catalog::{
    ClassifyError, EntityKind, EntryFields, GameMetadata, MERGED_SLUG, MetadataKind,
    NamedEntity, USER_SLUG,
};
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use thiserror::Error;

use crate::schema::SchemaError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("JSON column error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Entity not found: {entity_type} with id '{id}'")]
    NotFound { entity_type: String, id: String },
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    #[error("Catalog store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    pub(crate) fn not_found(entity_type: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
        }
    }
}

/// Turn a uniqueness violation into [`StoreError::Conflict`].
fn conflict_or(err: rusqlite::Error, what: impl FnOnce() -> String) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            StoreError::Conflict(what())
        }
        other => other.into(),
    }
}

// ── Catalog Entries ─────────────────────────────────────────────────────────

/// Insert a new live entry. Returns its id.
pub fn insert_entry(conn: &Connection, fields: &EntryFields) -> Result<i64, StoreError> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO catalog_entries (file_path, size, version, title, sort_title,
             release_date, game_type, early_access, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
        params![
            fields.file_path.to_string_lossy(),
            fields.size as i64,
            fields.version,
            fields.title,
            fields.sort_title,
            fields.release_date,
            fields.game_type.as_str(),
            fields.early_access,
            now,
        ],
    )
    .map_err(|e| {
        conflict_or(e, || {
            format!("a live entry already exists at {}", fields.file_path.display())
        })
    })?;
    Ok(conn.last_insert_rowid())
}

/// Overwrite the file-derived fields of an entry. With `restore`, also clear
/// its soft-delete timestamp.
pub fn write_entry_fields(
    conn: &Connection,
    id: i64,
    fields: &EntryFields,
    restore: bool,
) -> Result<(), StoreError> {
    let sql = if restore {
        "UPDATE catalog_entries SET file_path = ?2, size = ?3, version = ?4, title = ?5,
             sort_title = ?6, release_date = ?7, game_type = ?8, early_access = ?9,
             updated_at = ?10, deleted_at = NULL
         WHERE id = ?1"
    } else {
        "UPDATE catalog_entries SET file_path = ?2, size = ?3, version = ?4, title = ?5,
             sort_title = ?6, release_date = ?7, game_type = ?8, early_access = ?9,
             updated_at = ?10
         WHERE id = ?1"
    };
    let changed = conn
        .execute(
            sql,
            params![
                id,
                fields.file_path.to_string_lossy(),
                fields.size as i64,
                fields.version,
                fields.title,
                fields.sort_title,
                fields.release_date,
                fields.game_type.as_str(),
                fields.early_access,
                Utc::now(),
            ],
        )
        .map_err(|e| {
            conflict_or(e, || {
                format!("a live entry already exists at {}", fields.file_path.display())
            })
        })?;
    if changed == 0 {
        return Err(StoreError::not_found("catalog entry", id));
    }
    Ok(())
}

/// Mark an entry deleted and drop every metadata row attached to it.
pub fn mark_entry_deleted(conn: &Connection, id: i64) -> Result<(), StoreError> {
    let now = Utc::now();
    let changed = conn.execute(
        "UPDATE catalog_entries SET deleted_at = ?2, metadata_id = NULL, updated_at = ?2
         WHERE id = ?1 AND deleted_at IS NULL",
        params![id, now],
    )?;
    if changed == 0 {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM catalog_entries WHERE id = ?1)",
            params![id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StoreError::not_found("catalog entry", id));
        }
        return Ok(());
    }
    conn.execute("DELETE FROM game_metadata WHERE entry_id = ?1", params![id])?;
    Ok(())
}

/// Point an entry at its merged metadata row.
pub fn set_entry_metadata(
    conn: &Connection,
    entry_id: i64,
    metadata_id: Option<i64>,
) -> Result<(), StoreError> {
    let changed = conn.execute(
        "UPDATE catalog_entries SET metadata_id = ?2, updated_at = ?3 WHERE id = ?1",
        params![entry_id, metadata_id, Utc::now()],
    )?;
    if changed == 0 {
        return Err(StoreError::not_found("catalog entry", entry_id));
    }
    Ok(())
}

// ── Named Entities ──────────────────────────────────────────────────────────

/// Insert or rename a named entity by its natural key. Returns its id.
pub fn upsert_named_entity(
    conn: &Connection,
    kind: EntityKind,
    entity: &NamedEntity,
) -> Result<i64, StoreError> {
    if entity.provider_slug.is_empty() || entity.provider_data_id.is_empty() {
        return Err(StoreError::Conflict(format!(
            "{} '{}' has an incomplete natural key",
            kind.as_str(),
            entity.name
        )));
    }
    conn.execute(
        "INSERT INTO named_entities (kind, provider_slug, provider_data_id, name)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(kind, provider_slug, provider_data_id) DO UPDATE SET
             name = excluded.name",
        params![
            kind.as_str(),
            entity.provider_slug,
            entity.provider_data_id,
            entity.name,
        ],
    )?;
    let id = conn.query_row(
        "SELECT id FROM named_entities
         WHERE kind = ?1 AND provider_slug = ?2 AND provider_data_id = ?3",
        params![kind.as_str(), entity.provider_slug, entity.provider_data_id],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Replace the relation rows of a metadata row with the given entity ids,
/// keeping their order.
fn replace_relations(
    conn: &Connection,
    metadata_id: i64,
    entity_ids: &[i64],
) -> Result<(), StoreError> {
    conn.execute(
        "DELETE FROM metadata_relations WHERE metadata_id = ?1",
        params![metadata_id],
    )?;
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO metadata_relations (metadata_id, entity_id, position)
         VALUES (?1, ?2, ?3)",
    )?;
    for (position, entity_id) in entity_ids.iter().enumerate() {
        stmt.execute(params![metadata_id, entity_id, position as i64])?;
    }
    Ok(())
}

// ── Metadata Rows ───────────────────────────────────────────────────────────

/// Find the id of the metadata row a write should replace, if any.
fn existing_metadata_id(
    conn: &Connection,
    entry_id: i64,
    kind: MetadataKind,
    metadata: &GameMetadata,
) -> Result<Option<i64>, StoreError> {
    let id = match kind {
        MetadataKind::Provider => conn
            .query_row(
                "SELECT id FROM game_metadata
                 WHERE entry_id = ?1 AND kind = 'provider'
                   AND provider_slug = ?2 AND provider_data_id = ?3",
                params![entry_id, metadata.provider_slug, metadata.provider_data_id],
                |row| row.get(0),
            )
            .optional()?,
        MetadataKind::User | MetadataKind::Merged => conn
            .query_row(
                "SELECT id FROM game_metadata WHERE entry_id = ?1 AND kind = ?2",
                params![entry_id, kind.as_str()],
                |row| row.get(0),
            )
            .optional()?,
    };
    Ok(id)
}

/// Insert or update one metadata row and its scalar and URL columns.
///
/// Returns the row id and the timestamp written as `updated_at`.
pub fn write_metadata_row(
    conn: &Connection,
    entry_id: i64,
    kind: MetadataKind,
    metadata: &GameMetadata,
) -> Result<(i64, DateTime<Utc>), StoreError> {
    let now = Utc::now();
    let websites = serde_json::to_string(&metadata.url_websites)?;
    let screenshots = serde_json::to_string(&metadata.url_screenshots)?;
    let trailers = serde_json::to_string(&metadata.url_trailers)?;
    let gameplays = serde_json::to_string(&metadata.url_gameplays)?;

    let (slug, data_id) = match kind {
        MetadataKind::Provider => (
            metadata.provider_slug.clone(),
            metadata.provider_data_id.clone(),
        ),
        MetadataKind::User => (USER_SLUG.to_string(), entry_id.to_string()),
        MetadataKind::Merged => (MERGED_SLUG.to_string(), entry_id.to_string()),
    };

    match existing_metadata_id(conn, entry_id, kind, metadata)? {
        Some(id) => {
            conn.execute(
                "UPDATE game_metadata SET
                     title = ?2, description = ?3, notes = ?4, release_date = ?5,
                     age_rating = ?6, average_playtime = ?7, rating = ?8,
                     early_access = ?9, cover_url = ?10, background_url = ?11,
                     url_websites = ?12, url_screenshots = ?13, url_trailers = ?14,
                     url_gameplays = ?15, updated_at = ?16
                 WHERE id = ?1",
                params![
                    id,
                    metadata.title,
                    metadata.description,
                    metadata.notes,
                    metadata.release_date,
                    metadata.age_rating,
                    metadata.average_playtime,
                    metadata.rating,
                    metadata.early_access,
                    metadata.cover_url,
                    metadata.background_url,
                    websites,
                    screenshots,
                    trailers,
                    gameplays,
                    now,
                ],
            )?;
            Ok((id, now))
        }
        None => {
            conn.execute(
                "INSERT INTO game_metadata (entry_id, kind, provider_slug, provider_data_id,
                     title, description, notes, release_date, age_rating, average_playtime,
                     rating, early_access, cover_url, background_url, url_websites,
                     url_screenshots, url_trailers, url_gameplays, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                     ?15, ?16, ?17, ?18, ?19, ?19)",
                params![
                    entry_id,
                    kind.as_str(),
                    slug,
                    data_id,
                    metadata.title,
                    metadata.description,
                    metadata.notes,
                    metadata.release_date,
                    metadata.age_rating,
                    metadata.average_playtime,
                    metadata.rating,
                    metadata.early_access,
                    metadata.cover_url,
                    metadata.background_url,
                    websites,
                    screenshots,
                    trailers,
                    gameplays,
                    now,
                ],
            )
            .map_err(|e| {
                conflict_or(e, || {
                    format!(
                        "{} metadata {}:{} already exists for entry {}",
                        kind.as_str(),
                        slug,
                        data_id,
                        entry_id
                    )
                })
            })?;
            Ok((conn.last_insert_rowid(), now))
        }
    }
}

/// Write a provider or user record together with its relations.
///
/// Relation entities are upserted under the record's own provider slug.
/// Entities with a blank id are keyed by their name.
pub fn write_source_metadata(
    conn: &Connection,
    entry_id: i64,
    kind: MetadataKind,
    metadata: &GameMetadata,
) -> Result<(i64, DateTime<Utc>), StoreError> {
    let (id, updated_at) = write_metadata_row(conn, entry_id, kind, metadata)?;
    let owner_slug = match kind {
        MetadataKind::User => USER_SLUG,
        _ => metadata.provider_slug.as_str(),
    };

    let mut entity_ids = Vec::new();
    for entity_kind in EntityKind::ALL {
        for entity in metadata.relations(entity_kind) {
            let mut keyed = entity.clone();
            keyed.provider_slug = owner_slug.to_string();
            if keyed.provider_data_id.is_empty() {
                keyed.provider_data_id = gamevault_catalog::slugify(&keyed.name);
            }
            if keyed.provider_data_id.is_empty() {
                log::warn!(
                    "Skipping {} with unusable name '{}' on entry {}",
                    entity_kind.as_str(),
                    entity.name,
                    entry_id
                );
                continue;
            }
            entity_ids.push(upsert_named_entity(conn, entity_kind, &keyed)?);
        }
    }
    replace_relations(conn, id, &entity_ids)?;
    Ok((id, updated_at))
}

/// Write the merged aggregate. Relations must already carry store ids;
/// relations without one are left out.
pub fn write_merged_metadata(
    conn: &Connection,
    entry_id: i64,
    merged: &GameMetadata,
) -> Result<(i64, DateTime<Utc>), StoreError> {
    let (id, updated_at) = write_metadata_row(conn, entry_id, MetadataKind::Merged, merged)?;
    let entity_ids: Vec<i64> = EntityKind::ALL
        .iter()
        .flat_map(|kind| merged.relations(*kind))
        .filter_map(|entity| entity.id)
        .collect();
    replace_relations(conn, id, &entity_ids)?;
    Ok((id, updated_at))
}

/// Delete the user override (`slug == "user"`) or every row of one provider.
/// Returns the number of rows removed.
pub fn delete_metadata_for_slug(
    conn: &Connection,
    entry_id: i64,
    slug: &str,
) -> Result<usize, StoreError> {
    let removed = if slug == USER_SLUG {
        conn.execute(
            "DELETE FROM game_metadata WHERE entry_id = ?1 AND kind = 'user'",
            params![entry_id],
        )?
    } else {
        conn.execute(
            "DELETE FROM game_metadata
             WHERE entry_id = ?1 AND kind = 'provider' AND provider_slug = ?2",
            params![entry_id, slug],
        )?
    };
    Ok(removed)
}

/// Backdate the merged aggregate so it is older than every source and the
/// next merge recomputes it. Returns false if the entry has no aggregate.
pub fn mark_merged_stale(conn: &Connection, entry_id: i64) -> Result<bool, StoreError> {
    let changed = conn.execute(
        "UPDATE game_metadata SET updated_at = ?2 WHERE entry_id = ?1 AND kind = 'merged'",
        params![entry_id, DateTime::<Utc>::UNIX_EPOCH],
    )?;
    Ok(changed > 0)
}

/// Delete the merged aggregate of an entry and detach it.
pub fn delete_merged_metadata(conn: &Connection, entry_id: i64) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE catalog_entries SET metadata_id = NULL WHERE id = ?1",
        params![entry_id],
    )?;
    conn.execute(
        "DELETE FROM game_metadata WHERE entry_id = ?1 AND kind = 'merged'",
        params![entry_id],
    )?;
    Ok(())
}
