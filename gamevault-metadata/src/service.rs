//! Metadata operations on catalog entries and the merge job runners.

use std::sync::Arc;

use chrono::{Duration, Utc};
use futures::future::join_all;
use gamevault_catalog::{CatalogEntry, GameMetadata, USER_SLUG, is_reserved_slug};
use gamevault_db::CatalogStore;
use tokio::task::JoinHandle;

use crate::error::MetadataError;
use crate::merge::{MergeOutcome, merge_entry};
use crate::provider::MetadataProvider;
use crate::queue::MergeQueue;
use crate::registry::ProviderRegistry;

/// Tuning for provider refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceOptions {
    /// Provider records older than this many days are re-fetched.
    /// Zero or negative disables re-fetching.
    pub ttl_days: i64,
    /// Search unmapped enabled providers by title and map the best result.
    pub auto_map: bool,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            ttl_days: 30,
            auto_map: true,
        }
    }
}

/// Counters for one [`MetadataService::refresh`] call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RefreshStats {
    /// Stale provider records that were re-fetched.
    pub refreshed: usize,
    /// Providers newly mapped by title search.
    pub mapped: usize,
    /// Provider calls or writes that failed.
    pub failed: usize,
}

/// Entry-level metadata operations over a store, a registry and a merge queue.
pub struct MetadataService {
    store: Arc<dyn CatalogStore>,
    registry: Arc<ProviderRegistry>,
    queue: Arc<MergeQueue>,
    options: ServiceOptions,
}

impl MetadataService {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        registry: Arc<ProviderRegistry>,
        queue: Arc<MergeQueue>,
        options: ServiceOptions,
    ) -> Self {
        Self {
            store,
            registry,
            queue,
            options,
        }
    }

    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn queue(&self) -> &Arc<MergeQueue> {
        &self.queue
    }

    pub fn options(&self) -> ServiceOptions {
        self.options
    }

    /// Search one provider by title.
    pub async fn search(
        &self,
        slug: &str,
        query: &str,
    ) -> Result<Vec<GameMetadata>, MetadataError> {
        let provider = self.registry.get_by_slug(slug)?;
        provider
            .search(query)
            .await
            .map_err(|e| MetadataError::provider(provider.slug(), e))
    }

    /// Fetch a provider record and attach it to an entry, replacing whatever
    /// that provider had mapped before. Queues a merge.
    pub async fn map(
        &self,
        entry_id: i64,
        slug: &str,
        provider_data_id: &str,
    ) -> Result<GameMetadata, MetadataError> {
        let provider = self.registry.get_by_slug(slug)?;
        self.live_entry(entry_id)?;

        let record = provider
            .fetch_by_id(provider_data_id)
            .await
            .map_err(|e| MetadataError::provider(provider.slug(), e))?;

        self.store.delete_metadata_for_slug(entry_id, provider.slug())?;
        let saved =
            self.save_provider_record(entry_id, provider.as_ref(), record, provider_data_id)?;
        log::info!(
            "Mapped entry {} to {} record '{}'",
            entry_id,
            provider.slug(),
            saved.provider_data_id
        );
        self.add_merge_job(entry_id);
        Ok(saved)
    }

    /// Set the user override of an entry. Queues a merge.
    pub fn personalize(
        &self,
        entry_id: i64,
        user: &GameMetadata,
    ) -> Result<GameMetadata, MetadataError> {
        self.live_entry(entry_id)?;
        let saved = self.store.upsert_user_metadata(entry_id, user)?;
        log::info!("Saved user metadata for entry {}", entry_id);
        self.add_merge_job(entry_id);
        Ok(saved)
    }

    /// Remove the user override (`"user"`) or one provider's records.
    ///
    /// When no source remains, the merged aggregate is deleted and detached.
    /// Otherwise it is marked stale so the next merge drops the removed
    /// fields. Nothing is re-merged here. Returns how many source rows were
    /// removed.
    pub fn unmap(&self, entry_id: i64, slug: &str) -> Result<usize, MetadataError> {
        let slug = slug.trim();
        if slug.is_empty() || (is_reserved_slug(slug) && slug != USER_SLUG) {
            return Err(MetadataError::InvalidSlug(slug.to_string()));
        }

        let removed = self.store.delete_metadata_for_slug(entry_id, slug)?;
        let sources = self
            .store
            .load_sources(entry_id)?
            .ok_or(MetadataError::EntryNotFound(entry_id))?;

        if !sources.has_sources() && sources.merged.is_some() {
            self.store.delete_merged_metadata(entry_id)?;
            log::info!("Entry {}: last source removed, merged metadata deleted", entry_id);
        } else if removed > 0 && sources.merged.is_some() {
            self.store.mark_merged_stale(entry_id)?;
        }
        if removed > 0 {
            log::info!("Unmapped '{}' from entry {}", slug, entry_id);
        } else {
            log::debug!("Entry {}: nothing mapped for '{}'", entry_id, slug);
        }
        Ok(removed)
    }

    /// Recompute the merged aggregate of an entry now.
    pub fn merge(&self, entry_id: i64) -> Result<MergeOutcome, MetadataError> {
        merge_entry(self.store.as_ref(), &self.registry, entry_id)
    }

    /// Bring provider records of an entry up to date.
    ///
    /// Stale records are re-fetched by id. With auto-mapping on, enabled
    /// providers without a record are searched by the entry's title and the
    /// first result is mapped. A failing provider is logged and skipped.
    pub async fn refresh(&self, entry_id: i64) -> Result<RefreshStats, MetadataError> {
        let sources = self
            .store
            .load_sources(entry_id)?
            .ok_or(MetadataError::EntryNotFound(entry_id))?;
        let mut stats = RefreshStats::default();
        if sources.entry.is_deleted() {
            log::debug!("Entry {} is deleted, skipping refresh", entry_id);
            return Ok(stats);
        }

        let cutoff = (self.options.ttl_days > 0)
            .then(|| Utc::now() - Duration::days(self.options.ttl_days));

        for provider in self.registry.enabled() {
            let existing: Vec<&GameMetadata> = sources
                .provider
                .iter()
                .filter(|m| m.provider_slug == provider.slug())
                .collect();

            if existing.is_empty() {
                if self.options.auto_map {
                    match self.auto_map(&sources.entry, provider.as_ref()).await {
                        Ok(true) => stats.mapped += 1,
                        Ok(false) => {}
                        Err(e) => {
                            log::warn!(
                                "Entry {}: auto-map via {} failed: {}",
                                entry_id,
                                provider.slug(),
                                e
                            );
                            stats.failed += 1;
                        }
                    }
                }
                continue;
            }

            let Some(cutoff) = cutoff else { continue };
            for record in existing {
                if record.updated_at.is_some_and(|t| t >= cutoff) {
                    continue;
                }
                match self.refetch(entry_id, provider.as_ref(), record).await {
                    Ok(()) => stats.refreshed += 1,
                    Err(e) => {
                        log::warn!(
                            "Entry {}: refreshing {} record '{}' failed: {}",
                            entry_id,
                            provider.slug(),
                            record.provider_data_id,
                            e
                        );
                        stats.failed += 1;
                    }
                }
            }
        }

        if stats != RefreshStats::default() {
            log::debug!("Entry {}: refresh {:?}", entry_id, stats);
        }
        Ok(stats)
    }

    /// Run one merge job: refresh providers, then merge.
    pub async fn process_job(&self, entry_id: i64) -> Result<MergeOutcome, MetadataError> {
        self.refresh(entry_id).await?;
        self.merge(entry_id)
    }

    /// Queue a merge for an entry. Returns false if one is already pending
    /// or running.
    pub fn add_merge_job(&self, entry_id: i64) -> bool {
        self.queue.add(entry_id)
    }

    async fn auto_map(
        &self,
        entry: &CatalogEntry,
        provider: &dyn MetadataProvider,
    ) -> Result<bool, MetadataError> {
        let results = provider
            .search(&entry.title)
            .await
            .map_err(|e| MetadataError::provider(provider.slug(), e))?;
        let Some(best) = results.into_iter().next() else {
            log::debug!("Entry {}: no {} match for '{}'", entry.id, provider.slug(), entry.title);
            return Ok(false);
        };
        let fallback_id = best.provider_data_id.clone();
        let saved = self.save_provider_record(entry.id, provider, best, &fallback_id)?;
        log::info!(
            "Entry {}: auto-mapped {} record '{}'",
            entry.id,
            provider.slug(),
            saved.provider_data_id
        );
        Ok(true)
    }

    async fn refetch(
        &self,
        entry_id: i64,
        provider: &dyn MetadataProvider,
        record: &GameMetadata,
    ) -> Result<(), MetadataError> {
        let fresh = provider
            .fetch_by_id(&record.provider_data_id)
            .await
            .map_err(|e| MetadataError::provider(provider.slug(), e))?;
        self.save_provider_record(entry_id, provider, fresh, &record.provider_data_id)?;
        Ok(())
    }

    fn save_provider_record(
        &self,
        entry_id: i64,
        provider: &dyn MetadataProvider,
        mut record: GameMetadata,
        fallback_id: &str,
    ) -> Result<GameMetadata, MetadataError> {
        record.id = None;
        record.provider_slug = provider.slug().to_string();
        if record.provider_data_id.trim().is_empty() {
            record.provider_data_id = fallback_id.to_string();
        }
        Ok(self.store.upsert_provider_metadata(entry_id, &record)?)
    }

    fn live_entry(&self, entry_id: i64) -> Result<CatalogEntry, MetadataError> {
        match self.store.get_entry(entry_id)? {
            Some(entry) if !entry.is_deleted() => Ok(entry),
            _ => Err(MetadataError::EntryNotFound(entry_id)),
        }
    }
}

/// Counters for one [`drain_merge_queue`] run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainStats {
    pub processed: usize,
    pub merged: usize,
    pub failed: usize,
}

impl DrainStats {
    fn record(&mut self, entry_id: i64, result: Result<MergeOutcome, MetadataError>) {
        self.processed += 1;
        match result {
            Ok(outcome) if outcome.is_merged() => self.merged += 1,
            Ok(_) => {}
            Err(e) => {
                log::warn!("Merge job for entry {} failed: {}", entry_id, e);
                self.failed += 1;
            }
        }
    }

    fn add(mut self, other: DrainStats) -> Self {
        self.processed += other.processed;
        self.merged += other.merged;
        self.failed += other.failed;
        self
    }
}

/// Process queued jobs with `workers` concurrent runners until nothing is
/// pending or in flight.
pub async fn drain_merge_queue(
    queue: &MergeQueue,
    service: &MetadataService,
    workers: usize,
) -> DrainStats {
    let runners = (0..workers.max(1)).map(|_| async {
        let mut stats = DrainStats::default();
        while let Some(job) = queue.next_until_idle().await {
            let id = job.entry_id();
            stats.record(id, service.process_job(id).await);
        }
        stats
    });
    join_all(runners)
        .await
        .into_iter()
        .fold(DrainStats::default(), DrainStats::add)
}

/// Long-lived merge runners pulling from a shared queue.
pub struct MergeWorkers {
    queue: Arc<MergeQueue>,
    handles: Vec<JoinHandle<DrainStats>>,
}

impl MergeWorkers {
    /// Spawn `workers` tasks that process jobs until the queue is closed.
    pub fn spawn(queue: Arc<MergeQueue>, service: Arc<MetadataService>, workers: usize) -> Self {
        let handles = (0..workers.max(1))
            .map(|worker| {
                let queue = queue.clone();
                let service = service.clone();
                tokio::spawn(async move {
                    let mut stats = DrainStats::default();
                    while let Some(job) = queue.next().await {
                        let id = job.entry_id();
                        stats.record(id, service.process_job(id).await);
                    }
                    log::debug!("Merge worker {} stopped", worker);
                    stats
                })
            })
            .collect();
        Self { queue, handles }
    }

    /// Close the queue, let the workers finish what is pending, and wait
    /// for them.
    pub async fn shutdown(self) -> DrainStats {
        self.queue.close();
        let mut total = DrainStats::default();
        for handle in self.handles {
            match handle.await {
                Ok(stats) => total = total.add(stats),
                Err(e) => log::error!("Merge worker panicked: {}", e),
            }
        }
        total
    }
}
