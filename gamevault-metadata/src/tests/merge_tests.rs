use super::*;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use gamevault_catalog::{CatalogEntry, GameType, USER_SLUG};

fn entry() -> CatalogEntry {
    let now = Utc::now();
    CatalogEntry {
        id: 1,
        file_path: PathBuf::from("/lib/Game.zip"),
        size: 1,
        version: None,
        title: "Game".to_string(),
        sort_title: "game".to_string(),
        release_date: None,
        game_type: GameType::Undetected,
        early_access: false,
        deleted_at: None,
        metadata_id: None,
        created_at: now,
        updated_at: now,
    }
}

fn sources(provider: Vec<GameMetadata>, user: Option<GameMetadata>) -> MetadataSources {
    MetadataSources {
        entry: entry(),
        provider,
        user,
        merged: None,
    }
}

fn record(slug: &str, title: Option<&str>, description: Option<&str>) -> GameMetadata {
    GameMetadata {
        title: title.map(str::to_string),
        description: description.map(str::to_string),
        ..GameMetadata::new(slug, "1")
    }
}

fn stamped(mut m: GameMetadata, at: DateTime<Utc>) -> GameMetadata {
    m.updated_at = Some(at);
    m
}

fn priorities(slug: &str) -> Option<i32> {
    match slug {
        "low" => Some(1),
        "high" => Some(10),
        _ => None,
    }
}

// ── Fold ────────────────────────────────────────────────────────────────────

#[test]
fn higher_priority_wins_and_user_comes_last() {
    let s = sources(
        vec![
            record("high", Some("Provider Title"), None),
            record("low", Some("Low Title"), Some("D")),
        ],
        Some(record(USER_SLUG, Some("User Title"), None)),
    );
    let merged = fold(&fold_order(&s, priorities));
    assert_eq!(merged.title.as_deref(), Some("User Title"));
    assert_eq!(merged.description.as_deref(), Some("D"));
    assert_eq!(merged.provider_slug, MERGED_SLUG);
}

#[test]
fn without_user_the_provider_title_stands() {
    let s = sources(
        vec![
            record("low", None, Some("D")),
            record("high", Some("Provider Title"), None),
        ],
        None,
    );
    let merged = fold(&fold_order(&s, priorities));
    assert_eq!(merged.title.as_deref(), Some("Provider Title"));
    assert_eq!(merged.description.as_deref(), Some("D"));
}

#[test]
fn unregistered_slugs_fold_first_by_slug() {
    let s = sources(
        vec![
            record("high", None, None),
            record("zeta", None, None),
            record("alpha", None, None),
            record("low", None, None),
        ],
        Some(record(USER_SLUG, None, None)),
    );
    let order: Vec<&str> = fold_order(&s, priorities)
        .iter()
        .map(|m| m.provider_slug.as_str())
        .collect();
    assert_eq!(order, ["alpha", "zeta", "low", "high", USER_SLUG]);
}

#[test]
fn empty_values_never_overwrite() {
    let base = GameMetadata {
        title: Some("Kept".to_string()),
        cover_url: Some("https://img/cover.png".to_string()),
        url_screenshots: vec!["https://img/1.png".to_string()],
        rating: Some(80.0),
        genres: vec![NamedEntity::new("a", "rpg", "RPG")],
        ..GameMetadata::new("a", "1")
    };
    let blank = GameMetadata {
        title: Some("   ".to_string()),
        cover_url: Some(String::new()),
        url_screenshots: Vec::new(),
        rating: None,
        ..GameMetadata::new("b", "1")
    };
    let merged = fold(&[&base, &blank]);
    assert_eq!(merged.title.as_deref(), Some("Kept"));
    assert_eq!(merged.cover_url.as_deref(), Some("https://img/cover.png"));
    assert_eq!(merged.url_screenshots, vec!["https://img/1.png".to_string()]);
    assert_eq!(merged.rating, Some(80.0));
    assert_eq!(merged.genres.len(), 1);
}

#[test]
fn present_values_overwrite_even_when_zero() {
    let base = GameMetadata {
        age_rating: Some(18),
        early_access: Some(true),
        ..GameMetadata::new("a", "1")
    };
    let later = GameMetadata {
        age_rating: Some(0),
        early_access: Some(false),
        ..GameMetadata::new("b", "1")
    };
    let merged = fold(&[&base, &later]);
    assert_eq!(merged.age_rating, Some(0));
    assert_eq!(merged.early_access, Some(false));
}

#[test]
fn non_empty_lists_replace_rather_than_append() {
    let a = GameMetadata {
        url_trailers: vec!["a1".to_string(), "a2".to_string()],
        ..GameMetadata::new("a", "1")
    };
    let b = GameMetadata {
        url_trailers: vec!["b1".to_string()],
        ..GameMetadata::new("b", "1")
    };
    assert_eq!(fold(&[&a, &b]).url_trailers, vec!["b1".to_string()]);
}

// ── Relations ───────────────────────────────────────────────────────────────

#[test]
fn relations_are_rekeyed_and_deduplicated() {
    let mut merged = GameMetadata {
        developers: vec![
            NamedEntity {
                id: Some(7),
                ..NamedEntity::new("igdb", "42", "Studio One")
            },
            NamedEntity::new("igdb", "43", " studio one "),
            NamedEntity::new("igdb", "44", "Second Studio"),
        ],
        tags: vec![NamedEntity::new("igdb", "x", "!!!")],
        ..GameMetadata::new(MERGED_SLUG, "")
    };
    normalize_relations(&mut merged);

    assert_eq!(merged.developers.len(), 2);
    assert_eq!(merged.developers[0].id, None);
    assert_eq!(merged.developers[0].provider_slug, MERGED_SLUG);
    assert_eq!(merged.developers[0].provider_data_id, "studio-one");
    assert_eq!(merged.developers[0].name, "Studio One");
    assert_eq!(merged.developers[1].provider_data_id, "second-studio");
    assert!(merged.tags.is_empty(), "names without alphanumerics are dropped");
}

// ── Freshness ───────────────────────────────────────────────────────────────

#[test]
fn fresh_only_when_merged_is_newest_and_no_user() {
    let t0 = Utc::now() - Duration::hours(2);
    let t1 = t0 + Duration::hours(1);

    let mut s = sources(vec![stamped(record("low", Some("T"), None), t0)], None);
    assert!(!is_fresh(&s), "no merged aggregate yet");

    s.merged = Some(stamped(GameMetadata::new(MERGED_SLUG, "1"), t1));
    assert!(is_fresh(&s));

    s.merged = Some(stamped(GameMetadata::new(MERGED_SLUG, "1"), t0));
    assert!(is_fresh(&s), "equal timestamps count as fresh");

    s.provider.push(stamped(record("high", Some("T"), None), t1 + Duration::minutes(1)));
    assert!(!is_fresh(&s), "a newer provider record forces a merge");

    let mut s = sources(vec![stamped(record("low", None, None), t0)], None);
    s.merged = Some(stamped(GameMetadata::new(MERGED_SLUG, "1"), t1));
    s.user = Some(stamped(record(USER_SLUG, None, None), t0));
    assert!(!is_fresh(&s), "a user override always forces a merge");
}
