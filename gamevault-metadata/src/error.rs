use gamevault_catalog::YamlError;
use gamevault_db::StoreError;

/// Errors raised by an individual metadata provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("No record with id '{0}'")]
    NotFound(String),

    #[error("Provider is disabled")]
    Disabled,

    #[error("Failed to load records: {0}")]
    Yaml(#[from] YamlError),
}

/// Errors that can occur in the metadata layer.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// Duplicate slug or priority at registration.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Blank or reserved provider slug.
    #[error("Invalid provider slug: '{0}'")]
    InvalidSlug(String),

    #[error("Provider not found: '{0}'")]
    ProviderNotFound(String),

    #[error("Catalog entry not found: {0}")]
    EntryNotFound(i64),

    #[error("Provider '{slug}' failed: {source}")]
    Provider {
        slug: String,
        #[source]
        source: ProviderError,
    },

    #[error("Catalog store error: {0}")]
    Store(#[from] StoreError),
}

impl MetadataError {
    pub(crate) fn provider(slug: &str, source: ProviderError) -> Self {
        Self::Provider {
            slug: slug.to_string(),
            source,
        }
    }
}
