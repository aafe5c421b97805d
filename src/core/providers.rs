//! Turns a persona's provider name into a ready-to-use provider.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::api::gemini::GeminiProvider;
use crate::api::{GenerationRequest, ProviderError};
use crate::core::builtin_providers::{find_builtin_provider, BuiltinProvider};
use crate::core::keyring;
use crate::core::provider::{GenerationProvider, ProviderCapabilities};

/// Builds the provider for a provider name. Never fails: unknown names and
/// missing credentials surface per turn as provider errors.
pub type ProviderFactory = Box<dyn Fn(&str) -> Arc<dyn GenerationProvider> + Send>;

/// Looks up an API key: environment variables first, then the keyring.
pub fn resolve_api_key_with<E, K>(provider: &BuiltinProvider, env: E, keyring: K) -> Option<String>
where
    E: Fn(&str) -> Option<String>,
    K: FnOnce(&str) -> Option<String>,
{
    provider
        .api_key_env
        .iter()
        .find_map(|name| env(name).filter(|value| !value.trim().is_empty()))
        .or_else(|| keyring(&provider.id))
        .map(|key| key.trim().to_string())
}

pub fn resolve_api_key(provider: &BuiltinProvider) -> Option<String> {
    resolve_api_key_with(
        provider,
        |name| std::env::var(name).ok(),
        |id| match keyring::read_api_key(id) {
            Ok(secret) => secret,
            Err(err) => {
                warn!(provider = id, recoverable = err.is_recoverable(), "keyring lookup failed: {err}");
                None
            }
        },
    )
}

pub fn build_provider(provider_name: &str, client: &reqwest::Client) -> Arc<dyn GenerationProvider> {
    let Some(provider) = find_builtin_provider(provider_name) else {
        warn!(provider = provider_name, "persona references an unknown provider");
        return Arc::new(UnavailableProvider::new(provider_name));
    };

    match provider.id.as_str() {
        GeminiProvider::NAME => {
            let api_key = resolve_api_key(&provider);
            debug!(
                provider = %provider.id,
                has_key = api_key.is_some(),
                "constructed provider"
            );
            Arc::new(GeminiProvider::new(
                client.clone(),
                provider.base_url.clone(),
                api_key,
                provider.api_key_env.clone(),
            ))
        }
        other => Arc::new(UnavailableProvider::new(other)),
    }
}

/// The factory used by the interactive session.
pub fn default_factory(client: reqwest::Client) -> ProviderFactory {
    Box::new(move |name| build_provider(name, &client))
}

/// Stand-in for a provider the catalog cannot serve.
pub struct UnavailableProvider {
    name: String,
}

impl UnavailableProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl GenerationProvider for UnavailableProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::plain()
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<String, ProviderError> {
        Err(ProviderError::UnknownProvider(self.name.clone()))
    }
}
