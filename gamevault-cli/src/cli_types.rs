//! CLI type definitions: command enums and argument structs.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gamevault")]
#[command(about = "Index a game library and merge its metadata", long_about = None)]
pub(crate) struct Cli {
    /// Library root to index (overrides settings and GAMEVAULT_LIBRARY_ROOT)
    #[arg(short, long, global = true)]
    pub library: Option<PathBuf>,

    /// Catalog database path (overrides settings and GAMEVAULT_DATABASE)
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Only show warnings and errors (suppress normal output)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Scan the library once, reconcile the catalog, and process merge jobs
    Scan {
        /// Files reconciled concurrently (overrides scan.concurrency)
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,

        /// Leave merge jobs unprocessed
        #[arg(long)]
        no_merge: bool,
    },

    /// Keep the catalog in sync with the library until interrupted
    Watch {
        /// Poll the tree instead of using OS file events
        #[arg(long)]
        polling: bool,

        /// Minutes between periodic full scans (0 disables)
        #[arg(long)]
        interval: Option<i64>,
    },

    /// Recompute merged metadata
    Merge {
        /// Entry to merge (omit with --all)
        #[arg(required_unless_present = "all")]
        entry_id: Option<i64>,

        /// Merge every live entry
        #[arg(long, conflicts_with = "entry_id")]
        all: bool,

        /// Refresh provider records before merging
        #[arg(long)]
        refresh: bool,
    },

    /// Remove a provider's records (or "user" for the user override) from an entry
    Unmap {
        entry_id: i64,
        slug: String,
    },

    /// Search a metadata provider by title
    Search {
        /// Provider slug (e.g., yaml)
        slug: String,
        query: String,
    },

    /// Attach a provider record to an entry
    Map {
        entry_id: i64,
        /// Provider slug
        slug: String,
        /// The provider's id for the record
        provider_id: String,
    },

    /// List catalog entries
    Entries {
        /// Only entries without merged metadata
        #[arg(long)]
        unmerged: bool,
    },

    /// Show or manage settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Show effective settings and catalog status
    Show,

    /// Write a settings file with the default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the settings file path
    Path,
}
