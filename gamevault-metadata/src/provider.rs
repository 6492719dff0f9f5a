//! The contract every metadata provider implements.
//!
//! Providers are constructed explicitly at startup and handed to the
//! [`ProviderRegistry`](crate::registry::ProviderRegistry); nothing is
//! discovered at runtime.

use std::time::Duration;

use async_trait::async_trait;
use gamevault_catalog::GameMetadata;

use crate::error::ProviderError;

/// An external source of per-title metadata.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Unique, stable identifier (e.g., "igdb", "yaml").
    fn slug(&self) -> &str;

    /// Human-readable name for display.
    fn name(&self) -> &str;

    /// Merge rank; higher wins. Unique across registered providers.
    fn priority(&self) -> i32;

    fn enabled(&self) -> bool {
        true
    }

    /// Minimum spacing between two calls to this provider.
    fn request_interval(&self) -> Duration {
        Duration::ZERO
    }

    /// Find candidate records for a title. Results are ordered best first.
    async fn search(&self, query: &str) -> Result<Vec<GameMetadata>, ProviderError>;

    /// Fetch the full record with the given provider-native id.
    async fn fetch_by_id(&self, provider_data_id: &str) -> Result<GameMetadata, ProviderError>;

    fn registration(&self) -> ProviderRegistration {
        ProviderRegistration {
            slug: self.slug().to_string(),
            name: self.name().to_string(),
            priority: self.priority(),
            enabled: self.enabled(),
            request_interval: self.request_interval(),
        }
    }
}

/// A snapshot of a provider's registration properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRegistration {
    pub slug: String,
    pub name: String,
    pub priority: i32,
    pub enabled: bool,
    pub request_interval: Duration,
}
