//! Command handler modules for capsync-cli.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod capacity;
pub mod db;
pub mod registry;

use anyhow::Result;
use serde::Serialize;

use capsync_config::{ServiceProfile, ServiceSettings};
use capsync_daemon::bootstrap;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Explicit `--config` flags win; otherwise fall back to the environment.
pub fn resolve_config_paths(flags: Vec<String>) -> Vec<String> {
    if flags.is_empty() {
        bootstrap::config_paths_from_env()
    } else {
        flags
    }
}

pub fn load_cli_settings(paths: &[String]) -> Result<ServiceSettings> {
    let (_loaded, settings) = bootstrap::load_settings(ServiceProfile::Cli, paths)?;
    Ok(settings)
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
