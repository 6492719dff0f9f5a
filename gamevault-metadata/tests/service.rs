use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use gamevault_catalog::*;
use gamevault_db::{CatalogStore, SqliteStore};
use gamevault_metadata::*;
use mockall::mock;
use mockall::predicate::*;

#[async_trait]
trait Lookup: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<GameMetadata>, ProviderError>;
    async fn fetch(&self, id: &str) -> Result<GameMetadata, ProviderError>;
}

mock! {
    pub Backend {}

    #[async_trait::async_trait]
    impl Lookup for Backend {
        async fn search(&self, query: &str) -> Result<Vec<GameMetadata>, ProviderError>;
        async fn fetch(&self, id: &str) -> Result<GameMetadata, ProviderError>;
    }
}

/// A registered provider whose calls go to a mocked backend.
struct Mocked {
    slug: &'static str,
    priority: i32,
    backend: MockBackend,
}

#[async_trait]
impl MetadataProvider for Mocked {
    fn slug(&self) -> &str {
        self.slug
    }

    fn name(&self) -> &str {
        self.slug
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn search(&self, query: &str) -> Result<Vec<GameMetadata>, ProviderError> {
        self.backend.search(query).await
    }

    async fn fetch_by_id(&self, id: &str) -> Result<GameMetadata, ProviderError> {
        self.backend.fetch(id).await
    }
}

fn record(slug: &str, id: &str, title: &str) -> GameMetadata {
    GameMetadata {
        title: Some(title.to_string()),
        description: Some(format!("{title} from {slug}")),
        ..GameMetadata::new(slug, id)
    }
}

struct Harness {
    store: Arc<SqliteStore>,
    queue: Arc<MergeQueue>,
    service: MetadataService,
}

fn harness(providers: Vec<Mocked>, options: ServiceOptions) -> Harness {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let registry = Arc::new(ProviderRegistry::new());
    for p in providers {
        registry.register(Arc::new(p)).unwrap();
    }
    let queue = Arc::new(MergeQueue::new());
    let service = MetadataService::new(store.clone(), registry, queue.clone(), options);
    Harness {
        store,
        queue,
        service,
    }
}

fn no_auto_map() -> ServiceOptions {
    ServiceOptions {
        auto_map: false,
        ..ServiceOptions::default()
    }
}

fn new_entry(store: &SqliteStore, path: &str, title: &str) -> i64 {
    store
        .create_entry(&EntryFields {
            file_path: PathBuf::from(path),
            size: 1,
            version: None,
            title: title.to_string(),
            sort_title: sort_title(title),
            release_date: NaiveDate::from_ymd_opt(2020, 1, 1),
            game_type: GameType::WindowsSetup,
            early_access: false,
        })
        .unwrap()
        .id
}

#[tokio::test]
async fn search_delegates_to_the_provider() {
    let mut backend = MockBackend::new();
    backend
        .expect_search()
        .with(eq("Hollow"))
        .times(1)
        .returning(|q| Ok(vec![record("igdb", "7", q)]));
    let h = harness(
        vec![Mocked {
            slug: "igdb",
            priority: 10,
            backend,
        }],
        no_auto_map(),
    );

    let results = h.service.search("igdb", "Hollow").await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].provider_data_id, "7");

    assert!(matches!(
        h.service.search("nope", "Hollow").await,
        Err(MetadataError::ProviderNotFound(_))
    ));
}

#[tokio::test]
async fn map_stores_the_record_and_queues_a_merge() {
    let mut backend = MockBackend::new();
    backend
        .expect_fetch()
        .with(eq("42"))
        .times(1)
        .returning(|id| Ok(record("wrong-slug", id, "Fetched")));
    let h = harness(
        vec![Mocked {
            slug: "igdb",
            priority: 10,
            backend,
        }],
        no_auto_map(),
    );
    let id = new_entry(&h.store, "/lib/Game.zip", "Game");

    let saved = h.service.map(id, "igdb", "42").await.unwrap();
    assert_eq!(saved.provider_slug, "igdb");
    assert_eq!(saved.provider_data_id, "42");
    assert!(h.queue.contains(id));

    let sources = h.store.load_sources(id).unwrap().unwrap();
    assert_eq!(sources.provider.len(), 1);
    assert_eq!(sources.provider[0].title.as_deref(), Some("Fetched"));
}

#[tokio::test]
async fn map_rejects_unknown_entries_and_providers() {
    let mut backend = MockBackend::new();
    backend.expect_fetch().times(0);
    let h = harness(
        vec![Mocked {
            slug: "igdb",
            priority: 10,
            backend,
        }],
        no_auto_map(),
    );
    assert!(matches!(
        h.service.map(99, "igdb", "1").await,
        Err(MetadataError::EntryNotFound(99))
    ));

    let id = new_entry(&h.store, "/lib/Game.zip", "Game");
    assert!(matches!(
        h.service.map(id, "user", "1").await,
        Err(MetadataError::ProviderNotFound(_))
    ));

    h.store.soft_delete_entry(id).unwrap();
    assert!(matches!(
        h.service.map(id, "igdb", "1").await,
        Err(MetadataError::EntryNotFound(_))
    ));
}

#[tokio::test]
async fn provider_errors_name_the_provider() {
    let mut backend = MockBackend::new();
    backend
        .expect_fetch()
        .returning(|id| Err(ProviderError::NotFound(id.to_string())));
    let h = harness(
        vec![Mocked {
            slug: "igdb",
            priority: 10,
            backend,
        }],
        no_auto_map(),
    );
    let id = new_entry(&h.store, "/lib/Game.zip", "Game");

    let err = h.service.map(id, "igdb", "404").await.unwrap_err();
    assert!(
        matches!(
            &err,
            MetadataError::Provider { slug, source: ProviderError::NotFound(_) } if slug == "igdb"
        ),
        "{err}"
    );
    assert!(!h.queue.contains(id));
}

#[tokio::test]
async fn unmap_user_leaves_provider_metadata() {
    let mut backend = MockBackend::new();
    backend
        .expect_fetch()
        .returning(|id| Ok(record("igdb", id, "Provider Title")));
    let h = harness(
        vec![Mocked {
            slug: "igdb",
            priority: 10,
            backend,
        }],
        no_auto_map(),
    );
    let id = new_entry(&h.store, "/lib/Game.zip", "Game");
    h.service.map(id, "igdb", "1").await.unwrap();
    h.service
        .personalize(
            id,
            &GameMetadata {
                title: Some("User Title".to_string()),
                ..GameMetadata::default()
            },
        )
        .unwrap();
    let merged = h.service.process_job(id).await.unwrap();
    let MergeOutcome::Merged(merged) = merged else {
        panic!("expected a merge");
    };
    assert_eq!(merged.title.as_deref(), Some("User Title"));

    assert_eq!(h.service.unmap(id, "user").unwrap(), 1);
    let sources = h.store.load_sources(id).unwrap().unwrap();
    assert!(sources.user.is_none());
    assert_eq!(sources.provider.len(), 1);
    assert!(sources.merged.is_some(), "no automatic re-merge or delete");
}

#[tokio::test]
async fn merge_after_unmap_drops_the_removed_fields() {
    let mut backend = MockBackend::new();
    backend
        .expect_fetch()
        .returning(|id| Ok(record("igdb", id, "Provider Title")));
    let h = harness(
        vec![Mocked {
            slug: "igdb",
            priority: 10,
            backend,
        }],
        no_auto_map(),
    );
    let id = new_entry(&h.store, "/lib/Game.zip", "Game");
    h.service.map(id, "igdb", "1").await.unwrap();
    h.service
        .personalize(
            id,
            &GameMetadata {
                title: Some("User Title".to_string()),
                ..GameMetadata::default()
            },
        )
        .unwrap();
    assert!(h.service.merge(id).unwrap().is_merged());

    h.service.unmap(id, "user").unwrap();
    let MergeOutcome::Merged(merged) = h.service.merge(id).unwrap() else {
        panic!("the aggregate must be recomputed after an unmap");
    };
    assert_eq!(merged.title.as_deref(), Some("Provider Title"));
    assert_eq!(
        h.store.load_sources(id).unwrap().unwrap().merged.unwrap().title.as_deref(),
        Some("Provider Title")
    );

    assert_eq!(h.service.merge(id).unwrap(), MergeOutcome::Fresh);
}

#[tokio::test]
async fn unmap_of_an_unmapped_slug_keeps_the_aggregate_fresh() {
    let mut backend = MockBackend::new();
    backend
        .expect_fetch()
        .returning(|id| Ok(record("igdb", id, "Provider Title")));
    let h = harness(
        vec![Mocked {
            slug: "igdb",
            priority: 10,
            backend,
        }],
        no_auto_map(),
    );
    let id = new_entry(&h.store, "/lib/Game.zip", "Game");
    h.service.map(id, "igdb", "1").await.unwrap();
    assert!(h.service.merge(id).unwrap().is_merged());

    assert_eq!(h.service.unmap(id, "user").unwrap(), 0);
    assert_eq!(h.service.merge(id).unwrap(), MergeOutcome::Fresh);
}

#[tokio::test]
async fn unmapping_the_last_source_drops_the_aggregate() {
    let mut backend = MockBackend::new();
    backend
        .expect_fetch()
        .returning(|id| Ok(record("igdb", id, "Provider Title")));
    let h = harness(
        vec![Mocked {
            slug: "igdb",
            priority: 10,
            backend,
        }],
        no_auto_map(),
    );
    let id = new_entry(&h.store, "/lib/Game.zip", "Game");
    h.service.map(id, "igdb", "1").await.unwrap();
    assert!(h.service.merge(id).unwrap().is_merged());
    assert!(h.store.get_entry(id).unwrap().unwrap().metadata_id.is_some());

    assert_eq!(h.service.unmap(id, "igdb").unwrap(), 1);
    let sources = h.store.load_sources(id).unwrap().unwrap();
    assert!(!sources.has_sources());
    assert!(sources.merged.is_none());
    assert_eq!(sources.entry.metadata_id, None);

    assert_eq!(h.service.unmap(id, "igdb").unwrap(), 0, "second unmap is a no-op");
    assert!(matches!(
        h.service.unmap(id, "gamevault"),
        Err(MetadataError::InvalidSlug(_))
    ));
}

#[tokio::test]
async fn refresh_auto_maps_by_title_and_isolates_failures() {
    let mut good = MockBackend::new();
    good.expect_search()
        .with(eq("Hollow Knight"))
        .times(1)
        .returning(|q| Ok(vec![record("good", "hk", q), record("good", "other", "Other")]));
    let mut bad = MockBackend::new();
    bad.expect_search()
        .times(1)
        .returning(|_| Err(ProviderError::Request("timeout".to_string())));

    let h = harness(
        vec![
            Mocked {
                slug: "good",
                priority: 10,
                backend: good,
            },
            Mocked {
                slug: "bad",
                priority: 20,
                backend: bad,
            },
        ],
        ServiceOptions::default(),
    );
    let id = new_entry(&h.store, "/lib/Hollow Knight.zip", "Hollow Knight");

    let stats = h.service.refresh(id).await.unwrap();
    assert_eq!(
        stats,
        RefreshStats {
            refreshed: 0,
            mapped: 1,
            failed: 1
        }
    );
    let sources = h.store.load_sources(id).unwrap().unwrap();
    assert_eq!(sources.provider.len(), 1);
    assert_eq!(sources.provider[0].provider_data_id, "hk");
}

#[tokio::test]
async fn refresh_leaves_recent_records_alone() {
    let mut backend = MockBackend::new();
    backend.expect_search().times(0);
    backend
        .expect_fetch()
        .times(1)
        .returning(|id| Ok(record("igdb", id, "Game")));
    let h = harness(
        vec![Mocked {
            slug: "igdb",
            priority: 10,
            backend,
        }],
        ServiceOptions::default(),
    );
    let id = new_entry(&h.store, "/lib/Game.zip", "Game");
    h.service.map(id, "igdb", "1").await.unwrap();

    assert_eq!(h.service.refresh(id).await.unwrap(), RefreshStats::default());
}

#[tokio::test]
async fn process_job_skips_refresh_for_deleted_entries() {
    let mut backend = MockBackend::new();
    backend.expect_search().times(0);
    let h = harness(
        vec![Mocked {
            slug: "igdb",
            priority: 10,
            backend,
        }],
        ServiceOptions::default(),
    );
    let id = new_entry(&h.store, "/lib/Game.zip", "Game");
    h.store.soft_delete_entry(id).unwrap();

    assert_eq!(h.service.process_job(id).await.unwrap(), MergeOutcome::NoSources);
    assert!(matches!(
        h.service.process_job(12345).await,
        Err(MetadataError::EntryNotFound(12345))
    ));
}

#[tokio::test]
async fn drain_processes_every_queued_entry() {
    let mut backend = MockBackend::new();
    backend
        .expect_search()
        .returning(|q| Ok(vec![record("igdb", &slugify(q), q)]));
    let h = harness(
        vec![Mocked {
            slug: "igdb",
            priority: 10,
            backend,
        }],
        ServiceOptions::default(),
    );
    let a = new_entry(&h.store, "/lib/Alpha.zip", "Alpha");
    let b = new_entry(&h.store, "/lib/Beta.zip", "Beta");
    assert!(h.service.add_merge_job(a));
    assert!(h.service.add_merge_job(b));
    assert!(!h.service.add_merge_job(a));

    let stats = drain_merge_queue(&h.queue, &h.service, 2).await;
    assert_eq!(
        stats,
        DrainStats {
            processed: 2,
            merged: 2,
            failed: 0
        }
    );
    assert!(h.queue.is_idle());
    for id in [a, b] {
        assert!(h.store.get_entry(id).unwrap().unwrap().metadata_id.is_some());
    }
}

#[tokio::test]
async fn workers_finish_pending_jobs_on_shutdown() {
    let h = harness(Vec::new(), no_auto_map());
    let id = new_entry(&h.store, "/lib/Game.zip", "Game");
    h.store
        .upsert_user_metadata(
            id,
            &GameMetadata {
                title: Some("Mine".to_string()),
                ..GameMetadata::default()
            },
        )
        .unwrap();

    let service = Arc::new(h.service);
    let workers = MergeWorkers::spawn(h.queue.clone(), service.clone(), 2);
    h.queue.add(id);
    let stats = workers.shutdown().await;

    assert_eq!(stats.processed, 1);
    assert_eq!(stats.merged, 1);
    assert!(h.store.get_entry(id).unwrap().unwrap().metadata_id.is_some());
}
