use std::path::PathBuf;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use gamevault_catalog::GameMetadata;
use gamevault_db::CatalogStore;
use gamevault_metadata::{MergeOutcome, MetadataService};

use crate::CliError;

use super::{AppContext, runtime, truncate_str};

pub(crate) fn run_merge(
    library: Option<PathBuf>,
    database: Option<PathBuf>,
    entry_id: Option<i64>,
    all: bool,
    refresh: bool,
) -> Result<(), CliError> {
    let ctx = AppContext::open(library, database)?;
    let ids: Vec<i64> = if all {
        ctx.store.list_live_entries()?.into_iter().map(|e| e.id).collect()
    } else {
        entry_id.into_iter().collect()
    };
    if ids.is_empty() {
        log::info!("Nothing to merge.");
        return Ok(());
    }

    let rt = runtime()?;
    let mut merged = 0usize;
    let mut failed = 0usize;
    for id in &ids {
        let result = if refresh {
            rt.block_on(ctx.service.process_job(*id))
        } else {
            ctx.service.merge(*id)
        };
        match result {
            Ok(outcome) => {
                if outcome.is_merged() {
                    merged += 1;
                }
                log_outcome(*id, &outcome);
            }
            // A single explicit entry surfaces its error; --all keeps going.
            Err(e) if !all => return Err(e.into()),
            Err(e) => {
                failed += 1;
                log::warn!("  Entry {}: {}", id, e);
            }
        }
    }

    if all {
        crate::log_blank();
        log::info!(
            "{} {} entr{} checked, {} merged, {} failed",
            "Done:".if_supports_color(Stdout, |t| t.bold()),
            ids.len(),
            if ids.len() == 1 { "y" } else { "ies" },
            merged,
            failed,
        );
    }
    Ok(())
}

fn log_outcome(entry_id: i64, outcome: &MergeOutcome) {
    match outcome {
        MergeOutcome::Merged(meta) => log::info!(
            "  {} Entry {}: merged as {}",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            entry_id,
            meta.title
                .as_deref()
                .unwrap_or("(untitled)")
                .if_supports_color(Stdout, |t| t.bold()),
        ),
        MergeOutcome::Fresh => log::info!(
            "  {} Entry {}: already up to date",
            "-".if_supports_color(Stdout, |t| t.dimmed()),
            entry_id,
        ),
        MergeOutcome::NoSources => log::info!(
            "  {} Entry {}: no metadata sources",
            "-".if_supports_color(Stdout, |t| t.dimmed()),
            entry_id,
        ),
    }
}

pub(crate) fn run_unmap(
    library: Option<PathBuf>,
    database: Option<PathBuf>,
    entry_id: i64,
    slug: String,
) -> Result<(), CliError> {
    let ctx = AppContext::open(library, database)?;
    let removed = ctx.service.unmap(entry_id, &slug)?;
    if removed == 0 {
        log::info!("Entry {} has no '{}' metadata.", entry_id, slug);
        return Ok(());
    }
    log::info!(
        "  {} Removed {} '{}' record(s) from entry {}",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        removed,
        slug,
        entry_id,
    );
    log::info!("Run 'gamevault merge {}' to recompute its metadata.", entry_id);
    Ok(())
}

pub(crate) fn run_search(
    library: Option<PathBuf>,
    database: Option<PathBuf>,
    slug: String,
    query: String,
) -> Result<(), CliError> {
    let ctx = AppContext::open(library, database)?;
    let rt = runtime()?;
    let results = rt.block_on(ctx.service.search(&slug, &query))?;

    if results.is_empty() {
        log::info!("No '{}' results for \"{}\".", slug, query);
        return Ok(());
    }
    log::info!(
        "{} result(s) from {}:",
        results.len(),
        slug.if_supports_color(Stdout, |t| t.cyan()),
    );
    for meta in &results {
        log::info!("  {}", format_result(meta));
    }
    Ok(())
}

fn format_result(meta: &GameMetadata) -> String {
    let title = truncate_str(meta.title.as_deref().unwrap_or("(untitled)"), 50);
    let year = meta
        .release_date
        .map(|d| d.format(" (%Y)").to_string())
        .unwrap_or_default();
    format!(
        "{:<20} {}{}",
        truncate_str(&meta.provider_data_id, 20),
        title.if_supports_color(Stdout, |t| t.bold()),
        year,
    )
}

pub(crate) fn run_map(
    library: Option<PathBuf>,
    database: Option<PathBuf>,
    entry_id: i64,
    slug: String,
    provider_id: String,
) -> Result<(), CliError> {
    let ctx = AppContext::open(library, database)?;
    let rt = runtime()?;
    let record = rt.block_on(ctx.service.map(entry_id, &slug, &provider_id))?;
    log::info!(
        "  {} Mapped {} '{}' to entry {}",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        slug,
        record.title.as_deref().unwrap_or(&record.provider_data_id),
        entry_id,
    );
    process_queued(&ctx.service)
}

/// Merge whatever the last operation queued, without refreshing providers.
fn process_queued(service: &MetadataService) -> Result<(), CliError> {
    while let Some(job) = service.queue().try_next() {
        let id = job.entry_id();
        log_outcome(id, &service.merge(id)?);
    }
    Ok(())
}
