//! Command-line interface parsing and startup.
//!
//! io has no subcommands: the flags pick the database, config, log file,
//! and starting persona, then the full-screen session takes over.

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use crate::core::config::Config;
use crate::ui::chat_loop::{run_chat, LaunchOptions};
use crate::utils::logging::init_file_logging;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_DESCRIBE"),
    " ",
    env!("VERGEN_GIT_SHA"),
    ", built ",
    env!("VERGEN_BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "io")]
#[command(version, long_version = LONG_VERSION)]
#[command(about = "A terminal chat client for talking with AI personas")]
#[command(
    long_about = "io is a full-screen terminal chat client. Conversations are saved per persona \
in a local SQLite database, and the persona, provider, and model can be switched mid-session.\n\n\
Authentication:\n\
  Set GEMINI_API_KEY (or GOOGLE_API_KEY), or store a key in the system keyring under the \
service 'io-tui' with the provider id as the user name.\n\n\
Controls:\n\
  Enter             Send the message\n\
  Alt+Enter         Insert a new line\n\
  Esc               Cancel the reply in progress or close a picker\n\
  PageUp/PageDown   Scroll the transcript\n\
  Ctrl+C            Quit\n\n\
Commands:\n\
  /help             List all slash-commands"
)]
pub struct Args {
    /// SQLite database to use instead of the default location
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Config file to read instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write diagnostic logs to this file
    #[arg(short = 'l', long, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Persona to activate at startup
    #[arg(short = 'p', long, value_name = "NAME")]
    pub persona: Option<String>,
}

impl Args {
    /// Resolves the flags against the config file.
    fn resolve(self) -> Result<(LaunchOptions, Option<PathBuf>), Box<dyn Error>> {
        let config = match &self.config {
            Some(path) => Config::load_from_path(path)?,
            None => Config::load()?,
        };
        let log_file = self.log.or_else(|| config.log_file.clone());
        let database_path = match self.db {
            Some(path) => path,
            None => config.resolve_database_path()?,
        };
        Ok((
            LaunchOptions {
                config,
                database_path,
                persona: self.persona,
            },
            log_file,
        ))
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let (options, log_file) = args.resolve()?;

    if init_file_logging(log_file.as_deref(), options.config.log_filter.as_deref())? {
        info!(version = LONG_VERSION, "io starting");
    }

    tokio::runtime::Runtime::new()?.block_on(run_chat(options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn flags_parse() {
        let args = Args::try_parse_from([
            "io",
            "--db",
            "/tmp/io.db",
            "--log",
            "io.log",
            "--persona",
            "Makise",
        ])
        .expect("args");
        assert_eq!(args.db, Some(PathBuf::from("/tmp/io.db")));
        assert_eq!(args.log, Some(PathBuf::from("io.log")));
        assert_eq!(args.persona.as_deref(), Some("Makise"));
        assert!(args.config.is_none());
    }

    #[test]
    fn subcommands_are_rejected() {
        assert!(Args::try_parse_from(["io", "chat"]).is_err());
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config_path = dir.path().join("config.toml");
        fs::write(
            &config_path,
            "database_path = \"/from/config.db\"\nlog_file = \"/from/config.log\"\n",
        )
        .expect("write config");

        let args = Args::try_parse_from([
            "io",
            "--config",
            config_path.to_str().expect("utf-8 path"),
            "--db",
            "/from/flag.db",
        ])
        .expect("args");
        let (options, log_file) = args.resolve().expect("resolve");
        assert_eq!(options.database_path, PathBuf::from("/from/flag.db"));
        assert_eq!(log_file, Some(PathBuf::from("/from/config.log")));
    }

    #[test]
    fn broken_config_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "request_timeout_secs = \"soon\"").expect("write config");

        let args = Args::try_parse_from(["io", "--config", config_path.to_str().expect("utf-8")])
            .expect("args");
        let err = args.resolve().err().expect("parse error");
        assert!(err.to_string().starts_with("Failed to parse config at"));
    }

    #[test]
    fn version_mentions_build_metadata() {
        assert!(LONG_VERSION.starts_with(env!("CARGO_PKG_VERSION")));
        assert!(LONG_VERSION.contains("built"));
    }
}
