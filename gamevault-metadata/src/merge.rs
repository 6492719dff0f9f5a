//! The metadata merge engine.
//!
//! Provider records are folded in ascending priority order, then the user
//! override is folded last. A field only overwrites the accumulator when it
//! is present and non-empty, so the highest-priority source that sets a
//! field wins it. Relations of the result are re-keyed under the reserved
//! merged slug and upserted one by one before the aggregate is saved.

use std::collections::HashSet;

use gamevault_catalog::{
    EntityKind, GameMetadata, MERGED_SLUG, MetadataSources, NamedEntity, slugify,
};
use gamevault_db::CatalogStore;

use crate::error::MetadataError;
use crate::registry::ProviderRegistry;

/// What a call to [`merge_entry`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// The entry has neither provider records nor a user override.
    NoSources,
    /// The stored aggregate is newer than every source.
    Fresh,
    /// A new aggregate was computed and saved.
    Merged(GameMetadata),
}

impl MergeOutcome {
    pub fn is_merged(&self) -> bool {
        matches!(self, Self::Merged(_))
    }
}

/// Recompute and persist the merged aggregate of one entry.
pub fn merge_entry(
    store: &dyn CatalogStore,
    registry: &ProviderRegistry,
    entry_id: i64,
) -> Result<MergeOutcome, MetadataError> {
    let sources = store
        .load_sources(entry_id)?
        .ok_or(MetadataError::EntryNotFound(entry_id))?;

    if !sources.has_sources() {
        log::debug!("Entry {}: no metadata sources, nothing to merge", entry_id);
        return Ok(MergeOutcome::NoSources);
    }
    if is_fresh(&sources) {
        log::debug!("Entry {}: merged metadata is up to date", entry_id);
        return Ok(MergeOutcome::Fresh);
    }

    let ordered = fold_order(&sources, |slug| registry.priority_of(slug));
    let mut merged = fold(&ordered);
    normalize_relations(&mut merged);

    for kind in EntityKind::ALL {
        let relations = std::mem::take(merged.relations_mut(kind));
        let mut stored = Vec::with_capacity(relations.len());
        for entity in relations {
            match store.upsert_named_entity(kind, &entity) {
                Ok(saved) => stored.push(saved),
                Err(e) => log::warn!(
                    "Entry {}: dropping {} '{}': {}",
                    entry_id,
                    kind.as_str(),
                    entity.name,
                    e
                ),
            }
        }
        *merged.relations_mut(kind) = stored;
    }

    let saved = store.save_merged_metadata(entry_id, &merged)?;
    if let Some(id) = saved.id {
        store.attach_merged_metadata(entry_id, id)?;
    }
    log::info!(
        "Merged metadata for entry {} from {} source(s)",
        entry_id,
        ordered.len()
    );
    Ok(MergeOutcome::Merged(saved))
}

/// True if a merged aggregate exists, there is no user override, and the
/// aggregate is at least as new as every provider record.
pub fn is_fresh(sources: &MetadataSources) -> bool {
    if sources.user.is_some() {
        return false;
    }
    let Some(merged_at) = sources.merged.as_ref().and_then(|m| m.updated_at) else {
        return false;
    };
    sources
        .provider
        .iter()
        .all(|p| p.updated_at.is_some_and(|t| merged_at >= t))
}

/// Sources in fold order: providers by ascending priority, the user override last.
///
/// Providers without a registered priority come first, ordered by slug.
pub fn fold_order(
    sources: &MetadataSources,
    priority_of: impl Fn(&str) -> Option<i32>,
) -> Vec<&GameMetadata> {
    let mut providers: Vec<&GameMetadata> = sources.provider.iter().collect();
    providers.sort_by(|a, b| {
        let pa = priority_of(&a.provider_slug);
        let pb = priority_of(&b.provider_slug);
        pa.cmp(&pb)
            .then_with(|| a.provider_slug.cmp(&b.provider_slug))
            .then_with(|| a.provider_data_id.cmp(&b.provider_data_id))
    });
    providers.extend(sources.user.as_ref());
    providers
}

/// Fold sources in order into a fresh merged record.
pub fn fold(sources: &[&GameMetadata]) -> GameMetadata {
    let mut acc = GameMetadata::new(MERGED_SLUG, "");
    for source in sources {
        overlay(&mut acc, source);
    }
    acc
}

/// Copy every present, non-empty field of `src` onto `acc`.
pub fn overlay(acc: &mut GameMetadata, src: &GameMetadata) {
    overlay_text(&mut acc.title, &src.title);
    overlay_text(&mut acc.description, &src.description);
    overlay_text(&mut acc.notes, &src.notes);
    overlay_text(&mut acc.cover_url, &src.cover_url);
    overlay_text(&mut acc.background_url, &src.background_url);

    overlay_value(&mut acc.release_date, &src.release_date);
    overlay_value(&mut acc.age_rating, &src.age_rating);
    overlay_value(&mut acc.average_playtime, &src.average_playtime);
    overlay_value(&mut acc.rating, &src.rating);
    overlay_value(&mut acc.early_access, &src.early_access);

    overlay_list(&mut acc.url_websites, &src.url_websites);
    overlay_list(&mut acc.url_screenshots, &src.url_screenshots);
    overlay_list(&mut acc.url_trailers, &src.url_trailers);
    overlay_list(&mut acc.url_gameplays, &src.url_gameplays);

    for kind in EntityKind::ALL {
        overlay_list(acc.relations_mut(kind), src.relations(kind));
    }
}

fn overlay_text(acc: &mut Option<String>, src: &Option<String>) {
    if let Some(s) = src {
        if !s.trim().is_empty() {
            *acc = Some(s.clone());
        }
    }
}

fn overlay_value<T: Clone>(acc: &mut Option<T>, src: &Option<T>) {
    if src.is_some() {
        acc.clone_from(src);
    }
}

fn overlay_list<T: Clone>(acc: &mut Vec<T>, src: &[T]) {
    if !src.is_empty() {
        *acc = src.to_vec();
    }
}

/// Re-key every relation under the merged slug with an id derived from its
/// name, drop store ids, and collapse duplicates (first occurrence wins).
pub fn normalize_relations(merged: &mut GameMetadata) {
    for kind in EntityKind::ALL {
        let mut seen = HashSet::new();
        let normalized: Vec<NamedEntity> = merged
            .relations(kind)
            .iter()
            .filter_map(|entity| {
                let key = slugify(&entity.name);
                if key.is_empty() {
                    log::warn!("Ignoring {} with unusable name '{}'", kind.as_str(), entity.name);
                    return None;
                }
                seen.insert(key.clone())
                    .then(|| NamedEntity::new(MERGED_SLUG, key, entity.name.trim()))
            })
            .collect();
        *merged.relations_mut(kind) = normalized;
    }
}

#[cfg(test)]
#[path = "tests/merge_tests.rs"]
mod tests;
