use gamevault_db::StoreError;
use gamevault_index::IndexError;
use gamevault_lib::SettingsError;
use gamevault_metadata::{MetadataError, ProviderError};
use thiserror::Error;

/// Errors that can occur during CLI command execution.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// I/O error
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Catalog database operation failed
    #[error("Database error: {0}")]
    Database(#[from] StoreError),

    #[error("Indexing error: {0}")]
    Index(#[from] IndexError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Runtime creation or async error
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl CliError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub(crate) fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }
}
