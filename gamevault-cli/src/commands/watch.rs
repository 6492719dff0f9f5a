use std::path::PathBuf;
use std::time::Duration;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use gamevault_index::{IndexScheduler, LibraryWatcher, WatchMode};
use gamevault_metadata::MergeWorkers;

use crate::CliError;

use super::{AppContext, runtime};

/// Keep the catalog in sync until Ctrl-C.
///
/// Merge workers start first so jobs from the startup pass are picked up
/// immediately; shutdown runs in reverse.
pub(crate) fn run_watch(
    library: Option<PathBuf>,
    database: Option<PathBuf>,
    polling: bool,
    interval: Option<i64>,
) -> Result<(), CliError> {
    let ctx = AppContext::open(library, database)?;
    let options = ctx.index_options(None);
    if !options.root.is_dir() {
        return Err(CliError::config(format!(
            "Library root not found: {}",
            options.root.display()
        )));
    }

    let scan = &ctx.settings.scan;
    let minutes = interval.unwrap_or(scan.interval_minutes);
    let period = (minutes > 0).then(|| Duration::from_secs(minutes as u64 * 60));
    let mode = if polling || scan.use_polling {
        WatchMode::Polling {
            interval: Duration::from_secs(scan.poll_interval_seconds.max(1)),
        }
    } else {
        WatchMode::Events {
            debounce: Duration::from_millis(scan.debounce_millis),
        }
    };

    log::info!(
        "{} {}",
        "Watching".if_supports_color(Stdout, |t| t.bold()),
        options.root.display().if_supports_color(Stdout, |t| t.cyan()),
    );
    match period {
        Some(p) => log::info!("  Full scan every {} minute(s)", p.as_secs() / 60),
        None => log::info!("  Periodic full scans disabled"),
    }
    log::info!("  Press Ctrl-C to stop");

    let rt = runtime()?;
    rt.block_on(async {
        let workers = MergeWorkers::spawn(
            ctx.queue.clone(),
            ctx.service.clone(),
            ctx.merge_concurrency(),
        );
        let reconciler = ctx.reconciler();
        let root = options.root.clone();
        let scan_options = options.scan.clone();
        let scheduler = IndexScheduler::start(reconciler.clone(), options, period);
        let watcher = match LibraryWatcher::start(
            &root,
            scan_options,
            mode,
            scheduler.handle(),
            reconciler,
        ) {
            Ok(w) => Some(w),
            Err(e) => {
                log::error!("{}", e);
                log::warn!("Continuing with periodic scans only");
                None
            }
        };

        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {}", e);
        }
        crate::log_blank();
        log::info!("Shutting down...");

        if let Some(watcher) = watcher {
            watcher.stop();
        }
        let last = scheduler.shutdown().await;
        let merged = workers.shutdown().await;

        match &last {
            Ok(Some(stats)) => log::info!("  Last pass: {}", stats.summary()),
            Ok(None) => {}
            Err(e) => log::warn!("  Last pass failed: {}", e),
        }
        log::info!(
            "  {} {} merge job(s) processed, {} merged, {} failed",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            merged.processed,
            merged.merged,
            merged.failed,
        );
        last.map(|_| ())
    })?;
    Ok(())
}
