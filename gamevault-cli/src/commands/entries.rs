use std::path::PathBuf;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use gamevault_db::CatalogStore;
use gamevault_lib::util::format_bytes;

use crate::CliError;

use super::{AppContext, truncate_str};

pub(crate) fn run_entries(
    library: Option<PathBuf>,
    database: Option<PathBuf>,
    unmerged: bool,
) -> Result<(), CliError> {
    let ctx = AppContext::open(library, database)?;
    let entries: Vec<_> = ctx
        .store
        .list_live_entries()?
        .into_iter()
        .filter(|e| !unmerged || e.metadata_id.is_none())
        .collect();

    if entries.is_empty() {
        log::info!("No catalog entries.");
        log::info!("Run 'gamevault scan' to index the library.");
        return Ok(());
    }

    log::info!(
        "{}",
        format!(
            "{:>6}  {:<40} {:>6} {:>10}  {}",
            "ID", "Title", "Year", "Size", "Path"
        )
        .if_supports_color(Stdout, |t| t.bold()),
    );
    for entry in &entries {
        let year = entry
            .release_date
            .map(|d| d.format("%Y").to_string())
            .unwrap_or_default();
        let marker = if entry.metadata_id.is_some() { " " } else { "*" };
        log::info!(
            "{:>6}{} {:<40} {:>6} {:>10}  {}",
            entry.id,
            marker,
            truncate_str(&entry.title, 40),
            year,
            format_bytes(entry.size),
            entry.file_path.display().if_supports_color(Stdout, |t| t.dimmed()),
        );
    }

    let stats = ctx.store.stats()?;
    crate::log_blank();
    log::info!(
        "  {} live, {} deleted, {} merged, {} provider record(s)",
        stats.live_entries,
        stats.deleted_entries,
        stats.merged_entries,
        stats.provider_records,
    );
    if !unmerged && stats.merged_entries < stats.live_entries {
        log::info!("  {}", "* no merged metadata yet".if_supports_color(Stdout, |t| t.dimmed()));
    }
    Ok(())
}
