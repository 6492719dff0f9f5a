//! Read queries for the catalog database.
//!
//! Provides entry lookups by path, by title and release date, and by id, plus
//! loading every metadata source of an entry for the merge engine.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use gamevault_catalog::{
    CatalogEntry, EntityKind, GameMetadata, GameType, MetadataKind, MetadataSources,
    NamedEntity,
};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};

use crate::operations::StoreError;

const ENTRY_COLUMNS: &str = "id, file_path, size, version, title, sort_title, release_date,
     game_type, early_access, deleted_at, metadata_id, created_at, updated_at";

const METADATA_COLUMNS: &str = "id, kind, provider_slug, provider_data_id, title, description,
     notes, release_date, age_rating, average_playtime, rating, early_access, cover_url,
     background_url, url_websites, url_screenshots, url_trailers, url_gameplays,
     created_at, updated_at";

// ── Entry Lookups ───────────────────────────────────────────────────────────

/// Find the entry at an exact path. A live entry wins over soft-deleted ones.
pub fn find_entry_by_path(
    conn: &Connection,
    path: &Path,
) -> Result<Option<CatalogEntry>, StoreError> {
    let sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM catalog_entries WHERE file_path = ?1
         ORDER BY deleted_at IS NOT NULL, updated_at DESC LIMIT 1"
    );
    conn.query_row(&sql, params![path.to_string_lossy()], row_to_entry)
        .optional()
        .map_err(Into::into)
}

/// Find an entry by exact title and release date (both `None` dates match).
/// A live entry wins over soft-deleted ones.
pub fn find_entry_by_title_and_release(
    conn: &Connection,
    title: &str,
    release_date: Option<NaiveDate>,
) -> Result<Option<CatalogEntry>, StoreError> {
    let sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM catalog_entries
         WHERE title = ?1 AND release_date IS ?2
         ORDER BY deleted_at IS NOT NULL, updated_at DESC LIMIT 1"
    );
    conn.query_row(&sql, params![title, release_date], row_to_entry)
        .optional()
        .map_err(Into::into)
}

/// Fetch an entry by id, live or deleted.
pub fn get_entry(conn: &Connection, id: i64) -> Result<Option<CatalogEntry>, StoreError> {
    let sql = format!("SELECT {ENTRY_COLUMNS} FROM catalog_entries WHERE id = ?1");
    conn.query_row(&sql, params![id], row_to_entry)
        .optional()
        .map_err(Into::into)
}

/// All live entries, ordered by sort title.
pub fn list_live_entries(conn: &Connection) -> Result<Vec<CatalogEntry>, StoreError> {
    let sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM catalog_entries WHERE deleted_at IS NULL
         ORDER BY sort_title, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], row_to_entry)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<CatalogEntry> {
    let path: String = row.get(1)?;
    let size: i64 = row.get(2)?;
    let game_type: String = row.get(7)?;
    Ok(CatalogEntry {
        id: row.get(0)?,
        file_path: PathBuf::from(path),
        size: size.max(0) as u64,
        version: row.get(3)?,
        title: row.get(4)?,
        sort_title: row.get(5)?,
        release_date: row.get(6)?,
        game_type: GameType::from_str_loose(&game_type),
        early_access: row.get(8)?,
        deleted_at: row.get(9)?,
        metadata_id: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

// ── Metadata ────────────────────────────────────────────────────────────────

/// Load the entry and all of its metadata rows, or `None` if the entry does
/// not exist. Provider rows are ordered by slug.
pub fn load_sources(
    conn: &Connection,
    entry_id: i64,
) -> Result<Option<MetadataSources>, StoreError> {
    let Some(entry) = get_entry(conn, entry_id)? else {
        return Ok(None);
    };

    let sql = format!(
        "SELECT {METADATA_COLUMNS} FROM game_metadata WHERE entry_id = ?1
         ORDER BY provider_slug, provider_data_id, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![entry_id], row_to_metadata)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut sources = MetadataSources {
        entry,
        provider: Vec::new(),
        user: None,
        merged: None,
    };
    for (kind, mut metadata) in rows {
        if let Some(id) = metadata.id {
            load_relations(conn, id, &mut metadata)?;
        }
        match kind {
            MetadataKind::Provider => sources.provider.push(metadata),
            MetadataKind::User => sources.user = Some(metadata),
            MetadataKind::Merged => sources.merged = Some(metadata),
        }
    }
    Ok(Some(sources))
}

/// Fill the four relation lists of a metadata row, in stored order.
fn load_relations(
    conn: &Connection,
    metadata_id: i64,
    metadata: &mut GameMetadata,
) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(
        "SELECT e.id, e.kind, e.provider_slug, e.provider_data_id, e.name
         FROM metadata_relations r JOIN named_entities e ON e.id = r.entity_id
         WHERE r.metadata_id = ?1 ORDER BY r.position",
    )?;
    let rows = stmt.query_map(params![metadata_id], |row| {
        let kind: String = row.get(1)?;
        Ok((
            kind,
            NamedEntity {
                id: Some(row.get(0)?),
                provider_slug: row.get(2)?,
                provider_data_id: row.get(3)?,
                name: row.get(4)?,
            },
        ))
    })?;
    for row in rows {
        let (kind, entity) = row?;
        match EntityKind::from_str_loose(&kind) {
            Some(kind) => metadata.relations_mut(kind).push(entity),
            None => log::warn!("Ignoring relation of unknown kind '{}'", kind),
        }
    }
    Ok(())
}

fn row_to_metadata(row: &rusqlite::Row<'_>) -> rusqlite::Result<(MetadataKind, GameMetadata)> {
    let kind: String = row.get(1)?;
    let metadata = GameMetadata {
        id: Some(row.get(0)?),
        provider_slug: row.get(2)?,
        provider_data_id: row.get(3)?,
        title: row.get(4)?,
        description: row.get(5)?,
        notes: row.get(6)?,
        release_date: row.get(7)?,
        age_rating: row.get(8)?,
        average_playtime: row.get(9)?,
        rating: row.get(10)?,
        early_access: row.get(11)?,
        cover_url: row.get(12)?,
        background_url: row.get(13)?,
        url_websites: json_column(row, 14)?,
        url_screenshots: json_column(row, 15)?,
        url_trailers: json_column(row, 16)?,
        url_gameplays: json_column(row, 17)?,
        created_at: row.get(18)?,
        updated_at: row.get(19)?,
        ..GameMetadata::default()
    };
    Ok((MetadataKind::from_str_loose(&kind), metadata))
}

/// Decode a JSON-encoded string list column.
fn json_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Number of relation rows attached to one metadata row.
pub fn count_relations(conn: &Connection, metadata_id: i64) -> Result<usize, StoreError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM metadata_relations WHERE metadata_id = ?1",
        params![metadata_id],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

/// Entry and metadata counts for the `entries` summary line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogStats {
    pub live_entries: usize,
    pub deleted_entries: usize,
    pub merged_entries: usize,
    pub provider_records: usize,
}

pub fn catalog_stats(conn: &Connection) -> Result<CatalogStats, StoreError> {
    let count = |sql: &str| -> Result<usize, StoreError> {
        let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n as usize)
    };
    Ok(CatalogStats {
        live_entries: count("SELECT COUNT(*) FROM catalog_entries WHERE deleted_at IS NULL")?,
        deleted_entries: count(
            "SELECT COUNT(*) FROM catalog_entries WHERE deleted_at IS NOT NULL",
        )?,
        merged_entries: count(
            "SELECT COUNT(*) FROM catalog_entries
             WHERE deleted_at IS NULL AND metadata_id IS NOT NULL",
        )?,
        provider_records: count("SELECT COUNT(*) FROM game_metadata WHERE kind = 'provider'")?,
    })
}
