use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_INPUT_CHAR_LIMIT: usize = 2000;

/// Settings read from `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database location; defaults to the platform data directory.
    pub database_path: Option<PathBuf>,
    /// Diagnostic log destination. No file means no logging.
    pub log_file: Option<PathBuf>,
    pub log_filter: Option<String>,
    /// Persona to activate at startup.
    pub default_persona: Option<String>,
    /// Seconds before a provider call is abandoned; `0` disables the limit.
    pub request_timeout_secs: Option<u64>,
    /// Ask a newly selected persona to introduce itself.
    pub introduce_on_switch: Option<bool>,
    pub input_char_limit: Option<usize>,
}

impl Config {
    pub fn request_timeout(&self) -> Option<Duration> {
        match self
            .request_timeout_secs
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
        {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn introduce_on_switch(&self) -> bool {
        self.introduce_on_switch.unwrap_or(true)
    }

    pub fn input_char_limit(&self) -> usize {
        self.input_char_limit
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_INPUT_CHAR_LIMIT)
    }
}

/// Shortens paths under the home directory to `~/...` for display.
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
