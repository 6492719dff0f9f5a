//! YAML loading for hand-written metadata records.
//!
//! A directory of `.yaml`/`.yml` files, one [`GameMetadata`] per file, serves
//! as a local metadata source. The file stem doubles as the record's
//! provider-native id when the file does not set one.

use std::path::Path;

use thiserror::Error;

use crate::types::GameMetadata;

#[derive(Debug, Error)]
pub enum YamlError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("YAML parse error in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yml::Error,
    },
    #[error("Not a directory: {0}")]
    NotADirectory(String),
}

/// Load every metadata record in `dir`, sorted by file name.
///
/// A missing directory yields an empty list. Records are stamped with
/// `provider_slug` and, if unset, a `provider_data_id` taken from the file stem.
pub fn load_metadata_records(
    dir: &Path,
    provider_slug: &str,
) -> Result<Vec<GameMetadata>, YamlError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    if !dir.is_dir() {
        return Err(YamlError::NotADirectory(dir.display().to_string()));
    }

    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .map_err(|e| YamlError::Io {
            path: dir.display().to_string(),
            source: e,
        })?
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .is_some_and(|ext| ext == "yaml" || ext == "yml")
        })
        .collect();
    entries.sort_by_key(|e| e.file_name());

    let mut records = Vec::with_capacity(entries.len());
    for entry in entries {
        let path = entry.path();
        let contents = std::fs::read_to_string(&path).map_err(|e| YamlError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let mut record: GameMetadata =
            serde_yml::from_str(&contents).map_err(|e| YamlError::Parse {
                path: path.display().to_string(),
                source: e,
            })?;

        record.provider_slug = provider_slug.to_string();
        if record.provider_data_id.is_empty() {
            record.provider_data_id = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        for kind in crate::types::EntityKind::ALL {
            for entity in record.relations_mut(kind) {
                entity.provider_slug = provider_slug.to_string();
                if entity.provider_data_id.is_empty() {
                    entity.provider_data_id = crate::normalize::slugify(&entity.name);
                }
            }
        }
        records.push(record);
    }

    Ok(records)
}
