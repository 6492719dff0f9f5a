//! Parser for game archive filenames.
//!
//! Library files follow a loose naming convention where parenthesized groups
//! carry structured information alongside the title:
//! ```text
//! Game Title (2023) (v1.2.3-beta) (EA) (W_P).zip
//! ```
//!
//! Each group is classified on its own, so year, version, early-access and
//! type tags may appear in any order and any combination. The title is what
//! remains once the extension and every group have been removed.

use chrono::NaiveDate;

use crate::types::GameType;

/// Earliest and latest years accepted from a `(YYYY)` group.
const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2100;

/// Structured fields extracted from a filename.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedFilename {
    /// Title with extension and all parenthetical groups removed, whitespace
    /// collapsed. `None` when nothing is left.
    pub title: Option<String>,
    /// Version tag including its leading `v` (e.g., "v1.0").
    pub version: Option<String>,
    /// January 1 of the year found in a `(YYYY)` group.
    pub release_date: Option<NaiveDate>,
    /// True iff some group is exactly `EA`.
    pub early_access: bool,
    /// Explicit type override from a `(W_P)`, `(W_S)` or `(L_P)` group.
    pub game_type: Option<GameType>,
}

/// Parse a filename (no directory components) into its components.
///
/// # Examples
///
/// ```
/// use gamevault_catalog::name_parser::parse_filename;
///
/// let parsed = parse_filename("Game (2023) (v1.0) (EA).zip");
/// assert_eq!(parsed.title.as_deref(), Some("Game"));
/// assert_eq!(parsed.version.as_deref(), Some("v1.0"));
/// assert!(parsed.early_access);
///
/// let parsed = parse_filename("Game (ea).zip");
/// assert!(!parsed.early_access);
/// ```
pub fn parse_filename(name: &str) -> ParsedFilename {
    let (stem, _ext) = split_extension(name);
    let (title, groups) = extract_title_and_groups(stem);

    let mut result = ParsedFilename {
        title,
        ..ParsedFilename::default()
    };

    for group in &groups {
        classify_group(group, &mut result);
    }

    result
}

/// Compression suffixes that may follow a `.tar`.
const TAR_COMPRESSIONS: &[&str] = &["gz", "bz2", "xz", "zst"];

/// Split off a trailing `.ext`, if the name has one.
///
/// The dot must come after any parenthetical group and the extension must be
/// a single token, so `Game (v1.0.1)` keeps its version intact. A `.tar`
/// before a compression suffix is removed from the stem too; the returned
/// extension is the compression suffix.
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    let Some(dot) = name.rfind('.') else {
        return (name, None);
    };
    let (stem, ext) = (&name[..dot], &name[dot + 1..]);
    let is_token = ext.chars().any(|c| c.is_ascii_alphabetic())
        && ext.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !is_token || stem.trim().is_empty() {
        return (name, None);
    }
    (strip_tar(stem, ext), Some(ext))
}

fn strip_tar<'a>(stem: &'a str, ext: &str) -> &'a str {
    if !TAR_COMPRESSIONS.iter().any(|c| ext.eq_ignore_ascii_case(c)) {
        return stem;
    }
    let cut = stem.len().saturating_sub(4);
    let is_tar = stem.get(cut..).is_some_and(|t| t.eq_ignore_ascii_case(".tar"));
    match stem.get(..cut) {
        Some(inner) if is_tar && !inner.trim().is_empty() => inner,
        _ => stem,
    }
}

// ── Internal parsing ────────────────────────────────────────────────────────

/// Split a stem into its title (groups removed) and the content of each group.
fn extract_title_and_groups(stem: &str) -> (Option<String>, Vec<String>) {
    let mut groups = Vec::new();
    let mut title = String::with_capacity(stem.len());
    let mut chars = stem.char_indices();

    while let Some((i, ch)) = chars.next() {
        if ch != '(' {
            title.push(ch);
            continue;
        }

        let start = i + ch.len_utf8();
        let mut end = stem.len();
        let mut depth = 1u32;
        for (j, c) in chars.by_ref() {
            if c == '(' {
                depth += 1;
            } else if c == ')' {
                depth -= 1;
                if depth == 0 {
                    end = j;
                    break;
                }
            }
        }

        // A group separates the words around it.
        title.push(' ');
        let content = &stem[start..end];
        if !content.is_empty() {
            groups.push(content.to_string());
        }
    }

    let collapsed = title.split_whitespace().collect::<Vec<_>>().join(" ");
    let title = if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    };
    (title, groups)
}

/// Classify one group's content and update the result accordingly.
fn classify_group(content: &str, result: &mut ParsedFilename) {
    if content == "EA" {
        result.early_access = true;
        return;
    }

    if let Some(game_type) = GameType::from_tag(content) {
        result.game_type.get_or_insert(game_type);
        return;
    }

    if let Some(date) = parse_year(content) {
        result.release_date.get_or_insert(date);
        return;
    }

    if is_version(content) {
        result.version.get_or_insert_with(|| content.to_string());
    }
}

/// A group that is exactly four digits forming a plausible year.
fn parse_year(content: &str) -> Option<NaiveDate> {
    if content.len() != 4 || !content.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = content.parse().ok()?;
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, 1, 1)
}

/// `v` followed by a digit and a dotted/hyphenated identifier: `v1.2.3-beta`.
fn is_version(content: &str) -> bool {
    let Some(rest) = content.strip_prefix('v') else {
        return false;
    };
    rest.chars().next().is_some_and(|c| c.is_ascii_digit())
        && rest
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+'))
}
