use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use gamevault_catalog::*;
use gamevault_db::{CatalogStore, SqliteStore, StoreError};
use gamevault_metadata::*;

/// Wraps a real store and counts merge-side writes.
struct CountingStore {
    inner: SqliteStore,
    merged_saves: AtomicUsize,
    entity_upserts: AtomicUsize,
    /// Entity name whose upsert is rejected.
    reject_name: Option<&'static str>,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            inner: SqliteStore::in_memory().unwrap(),
            merged_saves: AtomicUsize::new(0),
            entity_upserts: AtomicUsize::new(0),
            reject_name: None,
        }
    }

    fn rejecting(name: &'static str) -> Self {
        Self {
            reject_name: Some(name),
            ..Self::new()
        }
    }

    fn saves(&self) -> usize {
        self.merged_saves.load(Ordering::SeqCst)
    }

    fn upserts(&self) -> usize {
        self.entity_upserts.load(Ordering::SeqCst)
    }
}

impl CatalogStore for CountingStore {
    fn find_by_path(&self, path: &Path) -> Result<Option<CatalogEntry>, StoreError> {
        self.inner.find_by_path(path)
    }

    fn find_by_title_and_release(
        &self,
        title: &str,
        release_date: Option<NaiveDate>,
    ) -> Result<Option<CatalogEntry>, StoreError> {
        self.inner.find_by_title_and_release(title, release_date)
    }

    fn get_entry(&self, id: i64) -> Result<Option<CatalogEntry>, StoreError> {
        self.inner.get_entry(id)
    }

    fn create_entry(&self, fields: &EntryFields) -> Result<CatalogEntry, StoreError> {
        self.inner.create_entry(fields)
    }

    fn update_entry(&self, id: i64, fields: &EntryFields) -> Result<CatalogEntry, StoreError> {
        self.inner.update_entry(id, fields)
    }

    fn soft_delete_entry(&self, id: i64) -> Result<(), StoreError> {
        self.inner.soft_delete_entry(id)
    }

    fn restore_entry(&self, id: i64, fields: &EntryFields) -> Result<CatalogEntry, StoreError> {
        self.inner.restore_entry(id, fields)
    }

    fn list_live_entries(&self) -> Result<Vec<CatalogEntry>, StoreError> {
        self.inner.list_live_entries()
    }

    fn load_sources(&self, entry_id: i64) -> Result<Option<MetadataSources>, StoreError> {
        self.inner.load_sources(entry_id)
    }

    fn upsert_provider_metadata(
        &self,
        entry_id: i64,
        metadata: &GameMetadata,
    ) -> Result<GameMetadata, StoreError> {
        self.inner.upsert_provider_metadata(entry_id, metadata)
    }

    fn upsert_user_metadata(
        &self,
        entry_id: i64,
        metadata: &GameMetadata,
    ) -> Result<GameMetadata, StoreError> {
        self.inner.upsert_user_metadata(entry_id, metadata)
    }

    fn delete_metadata_for_slug(&self, entry_id: i64, slug: &str) -> Result<usize, StoreError> {
        self.inner.delete_metadata_for_slug(entry_id, slug)
    }

    fn upsert_named_entity(
        &self,
        kind: EntityKind,
        entity: &NamedEntity,
    ) -> Result<NamedEntity, StoreError> {
        self.entity_upserts.fetch_add(1, Ordering::SeqCst);
        if self.reject_name == Some(entity.name.as_str()) {
            return Err(StoreError::Conflict(format!("{} rejected", entity.name)));
        }
        self.inner.upsert_named_entity(kind, entity)
    }

    fn save_merged_metadata(
        &self,
        entry_id: i64,
        merged: &GameMetadata,
    ) -> Result<GameMetadata, StoreError> {
        self.merged_saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save_merged_metadata(entry_id, merged)
    }

    fn attach_merged_metadata(&self, entry_id: i64, metadata_id: i64) -> Result<(), StoreError> {
        self.inner.attach_merged_metadata(entry_id, metadata_id)
    }

    fn delete_merged_metadata(&self, entry_id: i64) -> Result<(), StoreError> {
        self.inner.delete_merged_metadata(entry_id)
    }

    fn mark_merged_stale(&self, entry_id: i64) -> Result<(), StoreError> {
        self.inner.mark_merged_stale(entry_id)
    }
}

struct Ranked(&'static str, i32);

#[async_trait]
impl MetadataProvider for Ranked {
    fn slug(&self) -> &str {
        self.0
    }

    fn name(&self) -> &str {
        self.0
    }

    fn priority(&self) -> i32 {
        self.1
    }

    async fn search(&self, _query: &str) -> Result<Vec<GameMetadata>, ProviderError> {
        Ok(Vec::new())
    }

    async fn fetch_by_id(&self, id: &str) -> Result<GameMetadata, ProviderError> {
        Err(ProviderError::NotFound(id.to_string()))
    }
}

fn registry() -> ProviderRegistry {
    let registry = ProviderRegistry::new();
    registry.register(Arc::new(Ranked("low", 1))).unwrap();
    registry.register(Arc::new(Ranked("high", 10))).unwrap();
    registry
}

fn new_entry(store: &dyn CatalogStore) -> i64 {
    store
        .create_entry(&EntryFields {
            file_path: PathBuf::from("/lib/Game (2023).zip"),
            size: 10,
            version: None,
            title: "Game".to_string(),
            sort_title: "game".to_string(),
            release_date: NaiveDate::from_ymd_opt(2023, 1, 1),
            game_type: GameType::Undetected,
            early_access: false,
        })
        .unwrap()
        .id
}

fn record(slug: &str, title: Option<&str>, description: Option<&str>) -> GameMetadata {
    GameMetadata {
        title: title.map(str::to_string),
        description: description.map(str::to_string),
        ..GameMetadata::new(slug, "1")
    }
}

#[test]
fn unknown_entry_is_not_found() {
    let store = CountingStore::new();
    let err = merge_entry(&store, &registry(), 404).unwrap_err();
    assert!(matches!(err, MetadataError::EntryNotFound(404)), "{err}");
}

#[test]
fn no_sources_means_no_write() {
    let store = CountingStore::new();
    let id = new_entry(&store);
    assert_eq!(merge_entry(&store, &registry(), id).unwrap(), MergeOutcome::NoSources);
    assert_eq!(store.saves(), 0);
    assert_eq!(store.get_entry(id).unwrap().unwrap().metadata_id, None);
}

#[test]
fn merges_by_priority_and_attaches() {
    let store = CountingStore::new();
    let id = new_entry(&store);
    store
        .upsert_provider_metadata(id, &record("high", Some("Provider Title"), None))
        .unwrap();
    store
        .upsert_provider_metadata(id, &record("low", Some("Low Title"), Some("D")))
        .unwrap();

    let MergeOutcome::Merged(merged) = merge_entry(&store, &registry(), id).unwrap() else {
        panic!("expected a merge");
    };
    assert_eq!(merged.title.as_deref(), Some("Provider Title"));
    assert_eq!(merged.description.as_deref(), Some("D"));
    assert_eq!(merged.provider_slug, MERGED_SLUG);

    let entry = store.get_entry(id).unwrap().unwrap();
    assert_eq!(entry.metadata_id, merged.id);
    assert_eq!(store.saves(), 1);
}

#[test]
fn user_override_wins() {
    let store = CountingStore::new();
    let id = new_entry(&store);
    store
        .upsert_provider_metadata(id, &record("high", Some("Provider Title"), Some("D")))
        .unwrap();
    store
        .upsert_user_metadata(id, &record(USER_SLUG, Some("User Title"), None))
        .unwrap();

    let MergeOutcome::Merged(merged) = merge_entry(&store, &registry(), id).unwrap() else {
        panic!("expected a merge");
    };
    assert_eq!(merged.title.as_deref(), Some("User Title"));
    assert_eq!(merged.description.as_deref(), Some("D"));
}

#[test]
fn fresh_aggregate_is_not_saved_again() {
    let store = CountingStore::new();
    let id = new_entry(&store);
    store
        .upsert_provider_metadata(id, &record("high", Some("Provider Title"), None))
        .unwrap();

    assert!(merge_entry(&store, &registry(), id).unwrap().is_merged());
    assert_eq!(store.saves(), 1);

    assert_eq!(merge_entry(&store, &registry(), id).unwrap(), MergeOutcome::Fresh);
    assert_eq!(store.saves(), 1);
}

#[test]
fn user_override_forces_merge_even_when_fresh() {
    let store = CountingStore::new();
    let id = new_entry(&store);
    store
        .upsert_provider_metadata(id, &record("high", Some("Provider Title"), None))
        .unwrap();
    store
        .upsert_user_metadata(id, &record(USER_SLUG, Some("User Title"), None))
        .unwrap();

    assert!(merge_entry(&store, &registry(), id).unwrap().is_merged());
    assert!(merge_entry(&store, &registry(), id).unwrap().is_merged());
    assert_eq!(store.saves(), 2);
}

#[test]
fn duplicate_developers_collapse_to_one_relation() {
    let store = CountingStore::new();
    let id = new_entry(&store);
    let mut rec = record("high", Some("Game"), None);
    rec.developers = vec![
        NamedEntity::new("high", "10", "Studio One"),
        NamedEntity::new("high", "11", "Studio One"),
    ];
    store.upsert_provider_metadata(id, &rec).unwrap();
    let before = store.upserts();

    let MergeOutcome::Merged(merged) = merge_entry(&store, &registry(), id).unwrap() else {
        panic!("expected a merge");
    };
    assert_eq!(store.upserts() - before, 1);
    assert_eq!(merged.developers.len(), 1);
    assert_eq!(merged.developers[0].provider_slug, MERGED_SLUG);
    assert_eq!(merged.developers[0].provider_data_id, "studio-one");
    assert!(merged.developers[0].id.is_some());

    let merged_id = merged.id.unwrap();
    assert_eq!(store.inner.relation_count(merged_id).unwrap(), 1);
}

#[test]
fn failed_relation_upsert_drops_only_that_relation() {
    let store = CountingStore::rejecting("Broken Studio");
    let id = new_entry(&store);
    let mut rec = record("high", Some("Game"), None);
    rec.developers = vec![
        NamedEntity::new("high", "10", "Broken Studio"),
        NamedEntity::new("high", "11", "Studio One"),
    ];
    rec.publishers = vec![NamedEntity::new("high", "20", "Publisher One")];
    rec.genres = vec![NamedEntity::new("high", "30", "Puzzle")];
    store.upsert_provider_metadata(id, &rec).unwrap();

    let MergeOutcome::Merged(merged) = merge_entry(&store, &registry(), id).unwrap() else {
        panic!("expected a merge");
    };
    let developers: Vec<_> = merged.developers.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(developers, ["Studio One"]);
    assert_eq!(merged.publishers.len(), 1);
    assert_eq!(merged.publishers[0].name, "Publisher One");
    assert_eq!(merged.genres.len(), 1);
    assert_eq!(merged.genres[0].name, "Puzzle");
    assert_eq!(store.saves(), 1);

    let merged_id = merged.id.unwrap();
    assert_eq!(store.inner.relation_count(merged_id).unwrap(), 3);
    assert_eq!(store.get_entry(id).unwrap().unwrap().metadata_id, Some(merged_id));
}

#[test]
fn unregistered_provider_still_contributes() {
    let store = CountingStore::new();
    let id = new_entry(&store);
    store
        .upsert_provider_metadata(id, &record("orphan", Some("Orphan Title"), Some("Only here")))
        .unwrap();
    store
        .upsert_provider_metadata(id, &record("low", Some("Low Title"), None))
        .unwrap();

    let MergeOutcome::Merged(merged) = merge_entry(&store, &registry(), id).unwrap() else {
        panic!("expected a merge");
    };
    assert_eq!(merged.title.as_deref(), Some("Low Title"));
    assert_eq!(merged.description.as_deref(), Some("Only here"));
}
