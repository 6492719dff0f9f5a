//! Text normalization shared by the catalog and the merge engine.

/// Leading articles dropped from sort titles.
const ARTICLES: &[&str] = &["the ", "a ", "an "];

/// Convert a display name into a lowercase, hyphen-separated slug.
///
/// Used to derive provider-native ids for normalized relations, so it must be
/// deterministic: `"Ubisoft Montréal"` and `"ubisoft montreal!"` differ, but
/// `"Ubisoft"` and `"  ubisoft "` do not.
pub fn slugify(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut last_was_separator = false;

    for c in s.chars() {
        if c.is_alphanumeric() {
            result.extend(c.to_lowercase());
            last_was_separator = false;
        } else if !last_was_separator && !result.is_empty() {
            result.push('-');
            last_was_separator = true;
        }
    }

    // Trim trailing separator
    if result.ends_with('-') {
        result.pop();
    }

    result
}

/// Build the sort key for a title: lowercase, one leading article removed,
/// punctuation dropped, whitespace collapsed.
pub fn sort_title(title: &str) -> String {
    let lower = title.trim().to_lowercase();
    let without_article = ARTICLES
        .iter()
        .find_map(|article| lower.strip_prefix(article))
        .unwrap_or(&lower);

    without_article
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Ubisoft Montreal"), "ubisoft-montreal");
        assert_eq!(slugify("  Ubisoft  "), "ubisoft");
        assert_eq!(slugify("Role-playing (RPG)"), "role-playing-rpg");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn sort_title_strips_leading_article() {
        assert_eq!(sort_title("The Witcher 3: Wild Hunt"), "witcher 3 wild hunt");
        assert_eq!(sort_title("A Plague Tale"), "plague tale");
        assert_eq!(sort_title("Anno 1800"), "anno 1800");
        assert_eq!(sort_title("Theme Hospital"), "theme hospital");
    }
}
