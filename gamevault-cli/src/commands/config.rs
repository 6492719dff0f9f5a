use std::path::PathBuf;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use gamevault_db::SqliteStore;
use gamevault_lib::{Settings, settings_path};

use crate::CliError;

/// Show effective settings (file plus environment) and catalog status.
pub(crate) fn run_config_show(
    library: Option<PathBuf>,
    database: Option<PathBuf>,
) -> Result<(), CliError> {
    let path = settings_path();
    let settings = Settings::load()?;

    log::info!(
        "{}",
        "gamevault Configuration".if_supports_color(Stdout, |t| t.bold()),
    );
    crate::log_blank();

    if path.exists() {
        log::info!(
            "  Settings file: {} {}",
            path.display().if_supports_color(Stdout, |t| t.cyan()),
            "(exists)".if_supports_color(Stdout, |t| t.green()),
        );
    } else {
        log::info!(
            "  Settings file: {} {}",
            path.display().if_supports_color(Stdout, |t| t.cyan()),
            "(not found, using defaults)".if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
    log::info!("  Library root:  {}", settings.library_root(library).display());

    let db_path = settings.database_path(database);
    if db_path.exists() {
        let store = SqliteStore::open(&db_path)?;
        let stats = store.stats()?;
        log::info!(
            "  Database:      {} ({} live entries, {} merged)",
            db_path.display(),
            stats.live_entries,
            stats.merged_entries,
        );
    } else {
        log::info!(
            "  Database:      {} {}",
            db_path.display(),
            "(not created yet)".if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
    log::info!(
        "  YAML records:  {}",
        settings
            .provider(gamevault_metadata::providers::yaml::YAML_SLUG)
            .directory
            .unwrap_or_else(super::default_yaml_dir)
            .display(),
    );

    crate::log_blank();
    log::info!("{}", "Effective settings:".if_supports_color(Stdout, |t| t.bold()));
    for line in settings.to_toml_string()?.lines() {
        log::info!("  {}", line);
    }
    Ok(())
}

/// Write a settings file holding the defaults.
pub(crate) fn run_config_init(force: bool) -> Result<(), CliError> {
    let path = settings_path();
    if path.exists() && !force {
        return Err(CliError::config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    Settings::default().save_to(&path)?;
    log::info!(
        "  {} Wrote default settings to {}",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        path.display(),
    );
    Ok(())
}

/// Print the settings file path.
pub(crate) fn run_config_path() {
    println!("{}", settings_path().display());
}
