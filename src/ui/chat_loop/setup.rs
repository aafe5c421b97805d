use std::error::Error;
use std::path::PathBuf;

use tracing::info;

use crate::core::app::{App, SessionContext, UiState};
use crate::core::config::data::path_display;
use crate::core::config::Config;
use crate::core::providers::{default_factory, ProviderFactory};
use crate::core::store::{PersonaRegistry, SqliteStore};

/// Everything needed to start a session.
pub struct LaunchOptions {
    pub config: Config,
    pub database_path: PathBuf,
    /// Persona to activate before the first frame; overrides the config.
    pub persona: Option<String>,
}

/// Opens the store, applies the startup persona, and builds the [`App`].
///
/// Failures here are fatal: the terminal has not been taken over yet, so
/// the caller can print them plainly.
pub fn bootstrap_app(options: LaunchOptions) -> Result<App, Box<dyn Error>> {
    let factory = default_factory(reqwest::Client::new());
    bootstrap_app_with(options, factory)
}

pub(crate) fn bootstrap_app_with(
    options: LaunchOptions,
    factory: ProviderFactory,
) -> Result<App, Box<dyn Error>> {
    let LaunchOptions {
        config,
        database_path,
        persona,
    } = options;

    let mut store = SqliteStore::open(&database_path)?;
    info!(path = %path_display(&database_path), "store opened");

    if let Some(name) = persona.or_else(|| config.default_persona.clone()) {
        store.set_active_persona(&name)?;
    }

    let session = SessionContext::new(
        Box::new(store),
        factory,
        config.request_timeout(),
        config.introduce_on_switch(),
    )?;
    Ok(App::new(session, UiState::new(config.input_char_limit())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::providers::UnavailableProvider;
    use std::sync::Arc;

    fn factory() -> ProviderFactory {
        Box::new(|name| Arc::new(UnavailableProvider::new(name)))
    }

    fn options(dir: &tempfile::TempDir, persona: Option<&str>, config: Config) -> LaunchOptions {
        LaunchOptions {
            config,
            database_path: dir.path().join("nested").join("data.db"),
            persona: persona.map(str::to_string),
        }
    }

    #[test]
    fn fresh_database_starts_with_default_persona() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = bootstrap_app_with(options(&dir, None, Config::default()), factory())
            .expect("bootstrap");
        assert_eq!(app.persona().name, "Default");
        assert!(app.active_conversation().is_none());
        assert_eq!(app.ui.input_char_limit(), 2000);
    }

    #[test]
    fn flag_persona_wins_over_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config {
            default_persona: Some("Makise".to_string()),
            input_char_limit: Some(500),
            ..Config::default()
        };
        let app = bootstrap_app_with(options(&dir, Some("io"), config), factory())
            .expect("bootstrap");
        assert_eq!(app.persona().name, "Io");
        assert_eq!(app.ui.input_char_limit(), 500);
    }

    #[test]
    fn unknown_startup_persona_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = bootstrap_app_with(options(&dir, Some("Nobody"), Config::default()), factory())
            .err()
            .expect("unknown persona");
        assert_eq!(err.to_string(), "persona 'Nobody' not found");
    }

    #[test]
    fn zero_timeout_disables_the_limit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config {
            request_timeout_secs: Some(0),
            introduce_on_switch: Some(false),
            ..Config::default()
        };
        let app = bootstrap_app_with(options(&dir, None, config), factory()).expect("bootstrap");
        assert_eq!(app.session.request_timeout, None);
        assert!(!app.session.introduce_on_switch);
    }
}
