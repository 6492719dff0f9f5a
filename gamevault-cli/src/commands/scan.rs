use std::path::PathBuf;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use gamevault_index::run_index;
use gamevault_lib::CancelFlag;
use gamevault_metadata::drain_merge_queue;

use crate::CliError;
use crate::spinner::ScanSpinner;

use super::{AppContext, runtime};

/// Index the library once, then process the merge jobs the pass queued.
pub(crate) fn run_scan(
    library: Option<PathBuf>,
    database: Option<PathBuf>,
    concurrency: Option<usize>,
    no_merge: bool,
    quiet: bool,
) -> Result<(), CliError> {
    let ctx = AppContext::open(library, database)?;
    let options = ctx.index_options(concurrency);

    if !options.root.is_dir() {
        return Err(CliError::config(format!(
            "Library root not found: {}",
            options.root.display()
        )));
    }

    log::info!(
        "{} {}",
        "Scanning".if_supports_color(Stdout, |t| t.bold()),
        options.root.display().if_supports_color(Stdout, |t| t.cyan()),
    );

    let rt = runtime()?;
    let reconciler = ctx.reconciler();
    let spinner = ScanSpinner::new(quiet);
    let stats = rt.block_on(run_index(reconciler, &options, CancelFlag::new(), &spinner))?;

    log::info!(
        "  {} {}",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        stats.summary(),
    );
    if stats.errors > 0 {
        log::warn!(
            "  {} file(s) could not be indexed",
            stats.errors.if_supports_color(Stdout, |t| t.yellow()),
        );
    }

    if no_merge {
        if !ctx.queue.is_empty() {
            log::info!("  {} merge job(s) left unprocessed", ctx.queue.len());
        }
        return Ok(());
    }
    if ctx.queue.is_empty() {
        return Ok(());
    }

    crate::log_blank();
    log::info!(
        "{} {} entr{}",
        "Merging metadata for".if_supports_color(Stdout, |t| t.bold()),
        ctx.queue.len(),
        if ctx.queue.len() == 1 { "y" } else { "ies" },
    );
    let drained = rt.block_on(drain_merge_queue(
        &ctx.queue,
        &ctx.service,
        ctx.merge_concurrency(),
    ));
    log::info!(
        "  {} {} merged, {} skipped, {} failed",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        drained.merged,
        drained.processed - drained.merged - drained.failed,
        drained.failed,
    );
    Ok(())
}
