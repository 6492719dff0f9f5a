//! Data model types for the game catalog.
//!
//! These types represent the persistent catalog schema: catalog entries,
//! per-provider and user-authored metadata, the merged aggregate, and the
//! named entities (developers, publishers, genres, tags) shared between them.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Reserved provider slug for user-authored metadata.
pub const USER_SLUG: &str = "user";

/// Reserved provider slug owning the merged aggregate and its normalized relations.
pub const MERGED_SLUG: &str = "gamevault";

/// Returns true for slugs no external provider may register under.
pub fn is_reserved_slug(slug: &str) -> bool {
    slug == USER_SLUG || slug == MERGED_SLUG
}

// ── Game Type ───────────────────────────────────────────────────────────────

/// How a game file is meant to be installed or run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    #[default]
    Undetected,
    WindowsPortable,
    WindowsSetup,
    LinuxPortable,
}

impl GameType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Undetected => "undetected",
            Self::WindowsPortable => "windows_portable",
            Self::WindowsSetup => "windows_setup",
            Self::LinuxPortable => "linux_portable",
        }
    }

    pub fn from_str_loose(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "windows_portable" | "w_p" => Self::WindowsPortable,
            "windows_setup" | "w_s" => Self::WindowsSetup,
            "linux_portable" | "l_p" => Self::LinuxPortable,
            _ => Self::Undetected,
        }
    }

    /// Explicit type override from a filename tag such as `(W_P)`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "W_P" => Some(Self::WindowsPortable),
            "W_S" => Some(Self::WindowsSetup),
            "L_P" => Some(Self::LinuxPortable),
            _ => None,
        }
    }

    /// Best guess from the file extension alone.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "exe" | "msi" => Self::WindowsSetup,
            "sh" | "appimage" | "deb" | "rpm" => Self::LinuxPortable,
            "7z" | "zip" | "rar" | "tar" | "gz" | "xz" | "bz2" | "tgz" | "zst" | "iso" => {
                Self::WindowsPortable
            }
            _ => Self::Undetected,
        }
    }
}

// ── Catalog Entry ───────────────────────────────────────────────────────────

/// One discovered game file and its derived state.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub id: i64,
    pub file_path: PathBuf,
    pub size: u64,
    pub version: Option<String>,
    pub title: String,
    pub sort_title: String,
    pub release_date: Option<NaiveDate>,
    pub game_type: GameType,
    pub early_access: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    /// The merged metadata aggregate attached to this entry, if any.
    pub metadata_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogEntry {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// The file-derived fields written when an entry is created, altered, or restored.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryFields {
    pub file_path: PathBuf,
    pub size: u64,
    pub version: Option<String>,
    pub title: String,
    pub sort_title: String,
    pub release_date: Option<NaiveDate>,
    pub game_type: GameType,
    pub early_access: bool,
}

// ── Named Entities ──────────────────────────────────────────────────────────

/// The four relation families attached to metadata records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Developer,
    Publisher,
    Genre,
    Tag,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Developer,
        EntityKind::Publisher,
        EntityKind::Genre,
        EntityKind::Tag,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Developer => "developer",
            Self::Publisher => "publisher",
            Self::Genre => "genre",
            Self::Tag => "tag",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "developer" => Some(Self::Developer),
            "publisher" => Some(Self::Publisher),
            "genre" => Some(Self::Genre),
            "tag" => Some(Self::Tag),
            _ => None,
        }
    }
}

/// A developer, publisher, genre, or tag.
///
/// The natural key is `(kind, provider_slug, provider_data_id)`; `id` is the
/// store's surrogate and is `None` until the row has been upserted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedEntity {
    #[serde(skip)]
    pub id: Option<i64>,
    #[serde(default)]
    pub provider_slug: String,
    #[serde(default)]
    pub provider_data_id: String,
    pub name: String,
}

impl NamedEntity {
    pub fn new(
        provider_slug: impl Into<String>,
        provider_data_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            provider_slug: provider_slug.into(),
            provider_data_id: provider_data_id.into(),
            name: name.into(),
        }
    }

    /// `(provider_slug, provider_data_id)`, unique within one [`EntityKind`].
    pub fn natural_key(&self) -> (&str, &str) {
        (&self.provider_slug, &self.provider_data_id)
    }
}

// ── Metadata ────────────────────────────────────────────────────────────────

/// Which role a metadata row plays for its catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataKind {
    /// One external provider's view of the title.
    Provider,
    /// Human-authored override; always folded last.
    User,
    /// The canonical aggregate produced by the merge engine.
    Merged,
}

impl MetadataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Provider => "provider",
            Self::User => "user",
            Self::Merged => "merged",
        }
    }

    pub fn from_str_loose(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "user" => Self::User,
            "merged" => Self::Merged,
            _ => Self::Provider,
        }
    }
}

/// A metadata record. Provider, user, and merged records share this shape.
///
/// Scalars are `Option` and collections are `Vec` so that "absent" and
/// "empty" can be told apart by the merge fold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameMetadata {
    #[serde(skip)]
    pub id: Option<i64>,
    pub provider_slug: String,
    pub provider_data_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub age_rating: Option<u32>,
    /// Average playtime in minutes.
    pub average_playtime: Option<u32>,
    pub rating: Option<f64>,
    pub early_access: Option<bool>,
    pub cover_url: Option<String>,
    pub background_url: Option<String>,
    pub url_websites: Vec<String>,
    pub url_screenshots: Vec<String>,
    pub url_trailers: Vec<String>,
    pub url_gameplays: Vec<String>,
    pub developers: Vec<NamedEntity>,
    pub publishers: Vec<NamedEntity>,
    pub genres: Vec<NamedEntity>,
    pub tags: Vec<NamedEntity>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl GameMetadata {
    pub fn new(provider_slug: impl Into<String>, provider_data_id: impl Into<String>) -> Self {
        Self {
            provider_slug: provider_slug.into(),
            provider_data_id: provider_data_id.into(),
            ..Self::default()
        }
    }

    pub fn relations(&self, kind: EntityKind) -> &[NamedEntity] {
        match kind {
            EntityKind::Developer => &self.developers,
            EntityKind::Publisher => &self.publishers,
            EntityKind::Genre => &self.genres,
            EntityKind::Tag => &self.tags,
        }
    }

    pub fn relations_mut(&mut self, kind: EntityKind) -> &mut Vec<NamedEntity> {
        match kind {
            EntityKind::Developer => &mut self.developers,
            EntityKind::Publisher => &mut self.publishers,
            EntityKind::Genre => &mut self.genres,
            EntityKind::Tag => &mut self.tags,
        }
    }
}

/// Everything the merge engine needs for one entry, loaded in one call.
#[derive(Debug, Clone)]
pub struct MetadataSources {
    pub entry: CatalogEntry,
    pub provider: Vec<GameMetadata>,
    pub user: Option<GameMetadata>,
    pub merged: Option<GameMetadata>,
}

impl MetadataSources {
    pub fn has_sources(&self) -> bool {
        !self.provider.is_empty() || self.user.is_some()
    }
}
