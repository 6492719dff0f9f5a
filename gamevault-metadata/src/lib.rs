//! Metadata providers, the merge engine, and merge job processing.
//!
//! Providers are registered once at startup. Each catalog entry can carry
//! records from several providers plus a user override; the merge engine
//! folds them into one canonical aggregate. Merge jobs go through a
//! deduplicating in-process queue.

pub mod error;
pub mod merge;
pub mod provider;
pub mod providers;
pub mod queue;
pub mod rate_limit;
pub mod registry;
pub mod service;

pub use error::{MetadataError, ProviderError};
pub use merge::{MergeOutcome, fold, fold_order, is_fresh, merge_entry};
pub use provider::{MetadataProvider, ProviderRegistration};
pub use providers::YamlProvider;
pub use queue::{MergeJob, MergeQueue};
pub use rate_limit::{RateLimited, RateLimiter};
pub use registry::ProviderRegistry;
pub use service::{
    DrainStats, MergeWorkers, MetadataService, RefreshStats, ServiceOptions, drain_merge_queue,
};
