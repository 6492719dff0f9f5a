//! Library-level building blocks shared by the indexer and the front ends:
//! directory scanning, the bounded worker pool, and settings resolution.

pub mod error;
pub mod scanner;
pub mod settings;
pub mod util;
pub mod worker_pool;

pub use error::{ScanError, SettingsError};
pub use scanner::{ScanOptions, ScannedFile, fingerprint, resolve_root, scan_library};
pub use settings::{Settings, settings_path};
pub use worker_pool::{CancelFlag, WorkerPool};
