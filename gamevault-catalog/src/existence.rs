//! Existence classification of scanned files against the catalog.
//!
//! A scanned file becomes a [`GameCandidate`]. The store looks up existing
//! entries by exact path and by `(title, release date)`, and [`classify`]
//! decides which of four states the candidate is in. Classification is a pure
//! function of its inputs; all I/O happens in the caller.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;

use crate::name_parser::{parse_filename, split_extension};
use crate::normalize::sort_title;
use crate::types::{CatalogEntry, EntryFields, GameType};

/// A candidate is missing a field every catalog entry must have.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("No title could be derived from '{0}'")]
    MissingTitle(String),
    #[error("Candidate has no file path")]
    MissingPath,
}

/// How a candidate relates to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExistenceState {
    /// No entry matches by path or by title and release date.
    DoesNotExist,
    /// A live entry matches and nothing tracked differs.
    Exists,
    /// A live entry matches but at least one tracked field differs.
    ExistsButAltered,
    /// The matching entry is soft-deleted: the file reappeared.
    ExistsButDeletedInDatabase,
}

impl ExistenceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DoesNotExist => "does_not_exist",
            Self::Exists => "exists",
            Self::ExistsButAltered => "exists_but_altered",
            Self::ExistsButDeletedInDatabase => "exists_but_deleted_in_database",
        }
    }
}

/// Fields compared between a candidate and its matched entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackedField {
    Size,
    Version,
    GameType,
    EarlyAccess,
    FilePath,
}

/// Result of classifying a candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct ExistenceCheck {
    pub state: ExistenceState,
    pub matched: Option<CatalogEntry>,
    /// Tracked fields that differ from `matched`. Empty unless altered or deleted.
    pub changed: Vec<TrackedField>,
}

/// A game file as seen on disk, before it is reconciled with the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct GameCandidate {
    pub file_path: Option<PathBuf>,
    pub size: u64,
    pub title: Option<String>,
    pub version: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub game_type: GameType,
    pub early_access: bool,
}

impl GameCandidate {
    /// Build a candidate from a file path and its size on disk.
    ///
    /// The filename is parsed for title, version, year and tags. The type
    /// comes from an explicit filename tag, else from the extension.
    pub fn from_file(path: &Path, size: u64) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parsed = parse_filename(&file_name);
        let game_type = parsed.game_type.unwrap_or_else(|| {
            split_extension(&file_name)
                .1
                .map(GameType::from_extension)
                .unwrap_or_default()
        });

        Self {
            file_path: if path.as_os_str().is_empty() {
                None
            } else {
                Some(path.to_path_buf())
            },
            size,
            title: parsed.title,
            version: parsed.version,
            release_date: parsed.release_date,
            game_type,
            early_access: parsed.early_access,
        }
    }

    /// The required fields, or the reason the candidate cannot be cataloged.
    pub fn require(&self) -> Result<(&Path, &str), ClassifyError> {
        let path = self.file_path.as_deref().ok_or(ClassifyError::MissingPath)?;
        let title = self
            .title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ClassifyError::MissingTitle(path.display().to_string()))?;
        Ok((path, title))
    }

    /// Convert into the fields written to the catalog.
    pub fn to_fields(&self) -> Result<EntryFields, ClassifyError> {
        let (path, title) = self.require()?;
        Ok(EntryFields {
            file_path: path.to_path_buf(),
            size: self.size,
            version: self.version.clone(),
            title: title.to_string(),
            sort_title: sort_title(title),
            release_date: self.release_date,
            game_type: self.game_type,
            early_access: self.early_access,
        })
    }

    /// Tracked fields whose value differs from `entry`.
    pub fn changed_fields(&self, entry: &CatalogEntry) -> Vec<TrackedField> {
        let mut changed = Vec::new();
        if self.size != entry.size {
            changed.push(TrackedField::Size);
        }
        if self.version != entry.version {
            changed.push(TrackedField::Version);
        }
        if self.game_type != entry.game_type {
            changed.push(TrackedField::GameType);
        }
        if self.early_access != entry.early_access {
            changed.push(TrackedField::EarlyAccess);
        }
        if self.file_path.as_deref() != Some(entry.file_path.as_path()) {
            changed.push(TrackedField::FilePath);
        }
        changed
    }
}

/// Classify a candidate against the results of the two catalog lookups.
///
/// `by_path` is the entry found at the candidate's exact path and `by_title`
/// the entry found by `(title, release_date)`. A live match is preferred over
/// a soft-deleted one, and the path match over the title match.
pub fn classify(
    candidate: &GameCandidate,
    by_path: Option<&CatalogEntry>,
    by_title: Option<&CatalogEntry>,
) -> Result<ExistenceCheck, ClassifyError> {
    candidate.require()?;

    let lookups = [by_path, by_title];
    let matched = lookups
        .iter()
        .flatten()
        .find(|e| !e.is_deleted())
        .or_else(|| lookups.iter().flatten().next())
        .copied();

    let Some(entry) = matched else {
        return Ok(ExistenceCheck {
            state: ExistenceState::DoesNotExist,
            matched: None,
            changed: Vec::new(),
        });
    };

    let changed = candidate.changed_fields(entry);
    let state = if entry.is_deleted() {
        ExistenceState::ExistsButDeletedInDatabase
    } else if changed.is_empty() {
        ExistenceState::Exists
    } else {
        ExistenceState::ExistsButAltered
    };

    Ok(ExistenceCheck {
        state,
        matched: Some(entry.clone()),
        changed,
    })
}
