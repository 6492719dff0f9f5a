pub(crate) mod config;
pub(crate) mod entries;
pub(crate) mod metadata;
pub(crate) mod scan;
pub(crate) mod watch;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use gamevault_db::SqliteStore;
use gamevault_index::{IndexOptions, Reconciler};
use gamevault_lib::{Settings, settings_path};
use gamevault_metadata::providers::yaml::YAML_SLUG;
use gamevault_metadata::{
    MergeQueue, MetadataProvider, MetadataService, ProviderRegistry, RateLimited, ServiceOptions,
    YamlProvider,
};

use crate::error::CliError;

/// Everything a command needs, resolved from settings and CLI flags.
pub(crate) struct AppContext {
    pub settings: Settings,
    pub root: PathBuf,
    pub store: Arc<SqliteStore>,
    pub queue: Arc<MergeQueue>,
    pub service: Arc<MetadataService>,
}

impl AppContext {
    pub(crate) fn open(
        library: Option<PathBuf>,
        database: Option<PathBuf>,
    ) -> Result<Self, CliError> {
        let settings = Settings::load()?;
        let root = settings.library_root(library);
        let db_path = settings.database_path(database);
        log::debug!("Catalog database: {}", db_path.display());

        let store = Arc::new(SqliteStore::open(&db_path)?);
        let queue = Arc::new(MergeQueue::new());
        let registry = Arc::new(build_registry(&settings)?);
        let service = Arc::new(MetadataService::new(
            store.clone(),
            registry,
            queue.clone(),
            ServiceOptions {
                ttl_days: settings.metadata.ttl_days,
                auto_map: settings.metadata.auto_map,
            },
        ));

        Ok(Self {
            settings,
            root,
            store,
            queue,
            service,
        })
    }

    pub(crate) fn reconciler(&self) -> Arc<Reconciler> {
        Arc::new(Reconciler::new(self.store.clone(), self.queue.clone()))
    }

    pub(crate) fn index_options(&self, concurrency: Option<usize>) -> IndexOptions {
        IndexOptions {
            root: self.root.clone(),
            scan: self.settings.scan_options(),
            concurrency: concurrency.unwrap_or(self.settings.scan.concurrency).max(1),
        }
    }

    pub(crate) fn merge_concurrency(&self) -> usize {
        self.settings.metadata.merge_concurrency.max(1)
    }
}

/// Directory of the local YAML provider when settings do not name one.
pub(crate) fn default_yaml_dir() -> PathBuf {
    settings_path().with_file_name("metadata")
}

/// Register the built-in providers with their settings overrides applied.
fn build_registry(settings: &Settings) -> Result<ProviderRegistry, CliError> {
    let registry = ProviderRegistry::new();

    let yaml_settings = settings.provider(YAML_SLUG);
    let dir = yaml_settings.directory.clone().unwrap_or_else(default_yaml_dir);
    let yaml: Arc<dyn MetadataProvider> = Arc::new(YamlProvider::load(&dir)?);
    let yaml = RateLimited::new(yaml).with_overrides(
        yaml_settings.enabled,
        yaml_settings.priority,
        yaml_settings.request_interval_millis.map(Duration::from_millis),
    );
    registry.register(Arc::new(yaml))?;

    for slug in settings.providers.keys() {
        if slug != YAML_SLUG {
            log::warn!("Settings name unknown metadata provider '{}'", slug);
        }
    }
    Ok(registry)
}

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::runtime(format!("failed to create tokio runtime: {e}")))
}

/// Truncate a string to a maximum width, appending "..." if needed.
pub(crate) fn truncate_str(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else if max > 3 {
        let head: String = s.chars().take(max - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max).collect()
    }
}
