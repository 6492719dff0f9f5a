//! Application settings (library root, database, scanning, metadata).
//!
//! Settings live in `~/.config/gamevault/settings.toml`. Values are resolved
//! with the priority chain CLI flag > `GAMEVAULT_*` environment variable >
//! settings file > built-in default. CLI flags are applied by the front end;
//! this module handles the rest.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::scanner::{DEFAULT_EXTENSIONS, ScanOptions};

/// Canonical path to the settings file: `~/.config/gamevault/settings.toml`.
pub fn settings_path() -> PathBuf {
    let config = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config.join("gamevault").join("settings.toml")
}

/// Default catalog database location: `~/.local/share/gamevault/catalog.db`.
pub fn default_database_path() -> PathBuf {
    let data = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    data.join("gamevault").join("catalog.db")
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub library: LibrarySettings,
    pub scan: ScanSettings,
    pub metadata: MetadataSettings,
    /// Per-provider overrides keyed by provider slug.
    pub providers: BTreeMap<String, ProviderSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    pub root: Option<PathBuf>,
    pub database: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    pub extensions: Vec<String>,
    pub recursive: bool,
    /// Number of files reconciled concurrently.
    pub concurrency: usize,
    /// Minutes between periodic full scans; zero or negative disables the timer.
    pub interval_minutes: i64,
    /// Poll the tree instead of subscribing to OS file events.
    pub use_polling: bool,
    pub poll_interval_seconds: u64,
    /// Quiet period after the last file event before a scan is triggered.
    pub debounce_millis: u64,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            recursive: true,
            concurrency: 1,
            interval_minutes: 60,
            use_polling: false,
            poll_interval_seconds: 30,
            debounce_millis: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataSettings {
    /// Provider records older than this are re-fetched during a merge job.
    pub ttl_days: i64,
    pub merge_concurrency: usize,
    /// Search enabled providers by title for entries they have no record for.
    pub auto_map: bool,
}

impl Default for MetadataSettings {
    fn default() -> Self {
        Self {
            ttl_days: 30,
            merge_concurrency: 1,
            auto_map: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub enabled: Option<bool>,
    pub priority: Option<i32>,
    pub request_interval_millis: Option<u64>,
    /// Record directory, for providers backed by local files.
    pub directory: Option<PathBuf>,
}

impl Settings {
    /// Load the settings file and apply environment overrides.
    pub fn load() -> Result<Self, SettingsError> {
        let mut settings = Self::load_from(&settings_path())?;
        settings.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No settings file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        toml::from_str(&contents).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `GAMEVAULT_*` overrides. `lookup` returns the variable's value,
    /// if set; tests pass a map instead of touching the process environment.
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), SettingsError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("GAMEVAULT_LIBRARY_ROOT") {
            self.library.root = Some(PathBuf::from(v));
        }
        if let Some(v) = get("GAMEVAULT_DATABASE") {
            self.library.database = Some(PathBuf::from(v));
        }
        if let Some(v) = get("GAMEVAULT_SCAN_EXTENSIONS") {
            self.scan.extensions = v
                .split(',')
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .collect();
        }
        override_parsed(&get, "GAMEVAULT_SCAN_RECURSIVE", &mut self.scan.recursive, parse_bool)?;
        override_parsed(&get, "GAMEVAULT_SCAN_CONCURRENCY", &mut self.scan.concurrency, parse_num)?;
        override_parsed(
            &get,
            "GAMEVAULT_SCAN_INTERVAL_MINUTES",
            &mut self.scan.interval_minutes,
            parse_num,
        )?;
        override_parsed(
            &get,
            "GAMEVAULT_SCAN_USE_POLLING",
            &mut self.scan.use_polling,
            parse_bool,
        )?;
        override_parsed(
            &get,
            "GAMEVAULT_SCAN_POLL_INTERVAL_SECONDS",
            &mut self.scan.poll_interval_seconds,
            parse_num,
        )?;
        override_parsed(
            &get,
            "GAMEVAULT_SCAN_DEBOUNCE_MILLIS",
            &mut self.scan.debounce_millis,
            parse_num,
        )?;
        override_parsed(
            &get,
            "GAMEVAULT_METADATA_TTL_DAYS",
            &mut self.metadata.ttl_days,
            parse_num,
        )?;
        override_parsed(
            &get,
            "GAMEVAULT_METADATA_MERGE_CONCURRENCY",
            &mut self.metadata.merge_concurrency,
            parse_num,
        )?;
        override_parsed(
            &get,
            "GAMEVAULT_METADATA_AUTO_MAP",
            &mut self.metadata.auto_map,
            parse_bool,
        )?;
        Ok(())
    }

    /// Write the settings to `path` atomically, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let serialized = self.to_toml_string()?;
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, &serialized).map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(io_err)?;
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Resolve the library root: CLI override, then settings, then the
    /// current working directory.
    pub fn library_root(&self, cli_override: Option<PathBuf>) -> PathBuf {
        if let Some(p) = cli_override {
            return p;
        }
        if let Some(p) = &self.library.root {
            return p.clone();
        }
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }

    /// Resolve the database path: CLI override, then settings, then the default.
    pub fn database_path(&self, cli_override: Option<PathBuf>) -> PathBuf {
        cli_override
            .or_else(|| self.library.database.clone())
            .unwrap_or_else(default_database_path)
    }

    pub fn scan_options(&self) -> ScanOptions {
        if self.scan.extensions.is_empty() {
            ScanOptions {
                recursive: self.scan.recursive,
                ..ScanOptions::default()
            }
        } else {
            ScanOptions::new(&self.scan.extensions, self.scan.recursive)
        }
    }

    /// Overrides for one provider; all `None` if the provider is not configured.
    pub fn provider(&self, slug: &str) -> ProviderSettings {
        self.providers.get(slug).cloned().unwrap_or_default()
    }
}

fn override_parsed<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
    parse: fn(&str) -> Option<T>,
) -> Result<(), SettingsError> {
    if let Some(raw) = get(key) {
        *target = parse(raw.trim()).ok_or_else(|| SettingsError::InvalidEnv {
            key: key.to_string(),
            value: raw.clone(),
        })?;
    }
    Ok(())
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_num<T: FromStr>(s: &str) -> Option<T> {
    s.parse().ok()
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
