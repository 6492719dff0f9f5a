//! gamevault CLI
//!
//! Command-line interface for indexing a game library and merging its
//! metadata.

mod cli_types;
mod commands;
mod error;
mod spinner;

use std::io::Write;

use clap::Parser;

use cli_types::{Cli, Commands, ConfigAction};
use commands::config::{run_config_init, run_config_path, run_config_show};
use commands::entries::run_entries;
use commands::metadata::{run_map, run_merge, run_search, run_unmap};
use commands::scan::run_scan;
use commands::watch::run_watch;
pub(crate) use error::CliError;

/// Log an empty line, keeping output ordering with the rest of the log.
pub(crate) fn log_blank() {
    log::info!("");
}

/// Route `log` output to the terminal. `RUST_LOG` wins over the flags.
fn init_logging(quiet: bool, verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else if quiet {
        log::LevelFilter::Warn
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_env("RUST_LOG")
        .format(|buf, record| match record.level() {
            log::Level::Info => writeln!(buf, "{}", record.args()),
            level => writeln!(buf, "{}: {}", level.as_str().to_lowercase(), record.args()),
        })
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let Cli {
        library,
        database,
        quiet,
        command,
        ..
    } = cli;

    let result = match command {
        Commands::Scan {
            concurrency,
            no_merge,
        } => run_scan(library, database, concurrency, no_merge, quiet),
        Commands::Watch { polling, interval } => run_watch(library, database, polling, interval),
        Commands::Merge {
            entry_id,
            all,
            refresh,
        } => run_merge(library, database, entry_id, all, refresh),
        Commands::Unmap { entry_id, slug } => run_unmap(library, database, entry_id, slug),
        Commands::Search { slug, query } => run_search(library, database, slug, query),
        Commands::Map {
            entry_id,
            slug,
            provider_id,
        } => run_map(library, database, entry_id, slug, provider_id),
        Commands::Entries { unmerged } => run_entries(library, database, unmerged),
        Commands::Config { action } => match action {
            ConfigAction::Show => run_config_show(library, database),
            ConfigAction::Init { force } => run_config_init(force),
            ConfigAction::Path => {
                run_config_path();
                Ok(())
            }
        },
    };

    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
