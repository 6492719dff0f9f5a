use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while walking the library.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The configured library root does not exist
    #[error("Library root not found: {}", .0.display())]
    RootNotFound(PathBuf),

    /// The configured library root is a file
    #[error("Library root is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// I/O error while reading the root itself
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while loading or saving settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid settings file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// An environment override could not be parsed
    #[error("Invalid value for {key}: '{value}'")]
    InvalidEnv { key: String, value: String },
}
