//! Library directory scanning.
//!
//! Walks the library root and collects every file whose extension is in the
//! configured set. Results are sorted by path so that repeated scans of an
//! unchanged tree produce identical output.

use std::collections::HashSet;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

use crate::error::ScanError;

/// Extensions indexed when the settings do not name any.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "7z", "zip", "rar", "tar", "gz", "tgz", "xz", "bz2", "zst", "iso", "exe", "msi", "sh",
    "appimage", "deb", "rpm",
];

/// What to collect during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Lowercase extensions without the leading dot.
    pub extensions: HashSet<String>,
    /// Descend into subdirectories.
    pub recursive: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extensions: extension_set(DEFAULT_EXTENSIONS),
            recursive: true,
        }
    }
}

impl ScanOptions {
    pub fn new<S: AsRef<str>>(extensions: &[S], recursive: bool) -> Self {
        Self {
            extensions: extension_set(extensions),
            recursive,
        }
    }
}

/// A game file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

/// Collect matching files under `root`, sorted by path.
///
/// Unreadable subdirectories are logged and skipped; only a missing or
/// non-directory root is an error.
pub fn scan_library(root: &Path, options: &ScanOptions) -> Result<Vec<ScannedFile>, ScanError> {
    if !root.exists() {
        return Err(ScanError::RootNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    let mut walker = WalkDir::new(root).follow_links(true).min_depth(1);
    if !options.recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::warn!("Skipping unreadable path under {}: {}", root.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file()
            || !has_matching_extension(entry.path(), &options.extensions)
        {
            continue;
        }
        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                log::warn!("Cannot stat {}: {}", entry.path().display(), e);
                continue;
            }
        };
        files.push(ScannedFile {
            path: entry.path().to_path_buf(),
            file_name: entry.file_name().to_string_lossy().into_owned(),
            size: metadata.len(),
            modified: metadata.modified().ok(),
        });
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    log::debug!("Scanned {}: {} matching files", root.display(), files.len());
    Ok(files)
}

/// Absolute, symlink-free form of the library root.
///
/// Entries are stored under this path, so a library reached through a
/// relative or aliased path maps onto the same rows.
pub fn resolve_root(root: &Path) -> Result<PathBuf, ScanError> {
    if !root.exists() {
        return Err(ScanError::RootNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }
    Ok(root.canonicalize()?)
}

/// Build a lowercase extension set; a leading dot is ignored.
pub fn extension_set<S: AsRef<str>>(extensions: &[S]) -> HashSet<String> {
    extensions
        .iter()
        .map(|e| e.as_ref().trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

/// Check if a path has an extension in the allowed set.
pub fn has_matching_extension(path: &Path, extensions: &HashSet<String>) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.contains(&e.to_lowercase()))
        .unwrap_or(false)
}

/// Hash of every file's path, size and modification time.
///
/// Two scans of an unchanged tree yield the same fingerprint; any addition,
/// removal, resize or touch changes it.
pub fn fingerprint(files: &[ScannedFile]) -> u64 {
    let mut hasher = DefaultHasher::new();
    files.len().hash(&mut hasher);
    for file in files {
        file.path.hash(&mut hasher);
        file.size.hash(&mut hasher);
        file.modified.hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
#[path = "tests/scanner_tests.rs"]
mod tests;
