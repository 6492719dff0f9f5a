use std::path::PathBuf;

use gamevault_catalog::ClassifyError;
use gamevault_db::StoreError;
use gamevault_lib::ScanError;
use thiserror::Error;

/// Errors raised while indexing the library.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The file cannot be cataloged (no usable title or path)
    #[error("Cannot catalog file: {0}")]
    Classify(#[from] ClassifyError),

    #[error("Catalog store error: {0}")]
    Store(#[from] StoreError),

    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),

    #[error("File watcher error on {}: {source}", path.display())]
    Watch {
        path: PathBuf,
        source: notify::Error,
    },

    #[error("Indexing scheduler has shut down")]
    ShutDown,
}
