//! A provider backed by hand-written YAML records in a local directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use gamevault_catalog::{GameMetadata, load_metadata_records};

use crate::error::ProviderError;
use crate::provider::MetadataProvider;

pub const YAML_SLUG: &str = "yaml";

/// Lowest rank by default so any network provider outranks local files.
pub const DEFAULT_PRIORITY: i32 = 0;

pub struct YamlProvider {
    directory: PathBuf,
    priority: i32,
    records: Vec<GameMetadata>,
}

impl YamlProvider {
    /// Load every record in `directory`. A missing directory gives an empty provider.
    pub fn load(directory: &Path) -> Result<Self, ProviderError> {
        let records = load_metadata_records(directory, YAML_SLUG)?;
        log::debug!(
            "Loaded {} YAML metadata record(s) from {}",
            records.len(),
            directory.display()
        );
        Ok(Self {
            directory: directory.to_path_buf(),
            priority: DEFAULT_PRIORITY,
            records,
        })
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl MetadataProvider for YamlProvider {
    fn slug(&self) -> &str {
        YAML_SLUG
    }

    fn name(&self) -> &str {
        "Local YAML"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    /// Exact title matches first, then titles containing the query,
    /// both ignoring case.
    async fn search(&self, query: &str) -> Result<Vec<GameMetadata>, ProviderError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let mut exact = Vec::new();
        let mut partial = Vec::new();
        for record in &self.records {
            let Some(title) = record.title.as_deref() else {
                continue;
            };
            let title = title.to_lowercase();
            if title == needle {
                exact.push(record.clone());
            } else if title.contains(&needle) {
                partial.push(record.clone());
            }
        }
        exact.extend(partial);
        Ok(exact)
    }

    async fn fetch_by_id(&self, provider_data_id: &str) -> Result<GameMetadata, ProviderError> {
        self.records
            .iter()
            .find(|r| r.provider_data_id == provider_data_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(provider_data_id.to_string()))
    }
}
