//! Diagnostic logging to a file.
//!
//! The terminal belongs to the chat UI, so events are only recorded when a
//! log file is configured. `IO_TUI_LOG` overrides the configured filter.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "IO_TUI_LOG";
pub const DEFAULT_FILTER: &str = "io_tui=info";

/// Chooses the filter directives: environment, then config, then default.
pub fn resolve_filter_directives(env_value: Option<&str>, configured: Option<&str>) -> String {
    [env_value, configured]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .unwrap_or(DEFAULT_FILTER)
        .to_string()
}

/// Installs the global subscriber. Returns `Ok(false)` when no log file is
/// configured.
pub fn init_file_logging(
    log_file: Option<&Path>,
    configured_filter: Option<&str>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let Some(path) = log_file else {
        return Ok(false);
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let env_value = std::env::var(LOG_ENV_VAR).ok();
    let directives = resolve_filter_directives(env_value.as_deref(), configured_filter);
    let filter = EnvFilter::try_new(&directives)
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(true)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|err| -> Box<dyn std::error::Error> { err })?;

    Ok(true)
}
