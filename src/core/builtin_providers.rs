//! Built-in provider catalog
//!
//! Provider metadata is embedded from `builtin_providers.toml` at build time.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltinProvider {
    pub id: String,
    pub display_name: String,
    pub base_url: String,
    pub default_model: String,
    pub models: Vec<String>,
    /// Environment variables checked for an API key, in order.
    #[serde(default)]
    pub api_key_env: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BuiltinProvidersConfig {
    providers: Vec<BuiltinProvider>,
}

impl BuiltinProvider {
    /// Exact model id match as listed in the catalog.
    pub fn find_model(&self, model: &str) -> Option<&str> {
        self.models
            .iter()
            .find(|candidate| candidate.eq_ignore_ascii_case(model))
            .map(String::as_str)
    }
}

/// Load built-in providers from the embedded configuration
pub fn load_builtin_providers() -> Vec<BuiltinProvider> {
    const CONFIG_CONTENT: &str = include_str!("../builtin_providers.toml");

    let config: BuiltinProvidersConfig =
        toml::from_str(CONFIG_CONTENT).expect("Failed to parse builtin_providers.toml");

    config.providers
}

/// Find a built-in provider by ID (case-insensitive)
pub fn find_builtin_provider(id: &str) -> Option<BuiltinProvider> {
    load_builtin_providers()
        .into_iter()
        .find(|p| p.id.eq_ignore_ascii_case(id))
}

/// The provider new personas start with.
pub fn default_provider() -> BuiltinProvider {
    load_builtin_providers()
        .into_iter()
        .next()
        .expect("builtin_providers.toml lists at least one provider")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lists_gemini() {
        let providers = load_builtin_providers();
        let gemini = providers
            .iter()
            .find(|p| p.id == "gemini")
            .expect("gemini entry");
        assert_eq!(gemini.display_name, "Google Gemini");
        assert_eq!(gemini.default_model, "gemini-2.5-flash-lite");
        assert_eq!(
            gemini.models,
            vec!["gemini-2.5-flash-lite".to_string(), "gemini-2.5-flash".to_string()]
        );
        assert_eq!(gemini.api_key_env, vec!["GEMINI_API_KEY", "GOOGLE_API_KEY"]);
    }

    #[test]
    fn default_model_is_listed() {
        for provider in load_builtin_providers() {
            assert!(
                provider.find_model(&provider.default_model).is_some(),
                "{} default model missing from its list",
                provider.id
            );
        }
    }

    #[test]
    fn lookups_ignore_case() {
        let provider = find_builtin_provider("Gemini").expect("case-insensitive");
        assert_eq!(provider.id, "gemini");
        assert_eq!(provider.find_model("GEMINI-2.5-FLASH"), Some("gemini-2.5-flash"));
        assert!(provider.find_model("gpt-4o").is_none());
        assert!(find_builtin_provider("nonexistent").is_none());
        assert_eq!(default_provider().id, "gemini");
    }
}
