//! Generation backend factory.
//!
//! Resolves a provider name from configuration into a concrete client.

use crate::client::LlmClient;
use crate::providers::{AnthropicClient, OllamaClient};
use std::sync::Arc;
use std::time::Duration;
use syllabus_core::config::ProviderConfig;
use syllabus_core::{AppError, AppResult};

/// Create a generation client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama", "claude" or "anthropic")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - Optional API key (required by Anthropic)
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or a required
/// secret is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    match provider.to_lowercase().as_str() {
        "ollama" => {
            let base_url = endpoint.unwrap_or("http://localhost:11434");
            let client = OllamaClient::with_base_url(base_url);
            Ok(Arc::new(client))
        }
        "claude" | "anthropic" => {
            let api_key = api_key
                .filter(|key| !key.is_empty())
                .ok_or_else(|| AppError::Config("Claude provider requires API key".to_string()))?;
            let client = match endpoint {
                Some(url) => AnthropicClient::with_base_url(url, api_key),
                None => AnthropicClient::new(api_key),
            };
            Ok(Arc::new(client))
        }
        _ => Err(AppError::Config(format!("Unknown provider: {}", provider))),
    }
}

/// Create a client honoring the provider's configured endpoint, request
/// timeout (Ollama) and API version (Anthropic).
pub fn create_configured_client(
    provider: &str,
    config: Option<&ProviderConfig>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    match config {
        Some(ProviderConfig::Ollama {
            endpoint,
            timeout: Some(secs),
            ..
        }) if provider.eq_ignore_ascii_case("ollama") => Ok(Arc::new(OllamaClient::with_timeout(
            endpoint.as_str(),
            Duration::from_secs(*secs),
        )?)),
        Some(ProviderConfig::Claude {
            endpoint,
            api_version: Some(version),
            ..
        }) if !provider.eq_ignore_ascii_case("ollama") => {
            let api_key = api_key
                .filter(|key| !key.is_empty())
                .ok_or_else(|| AppError::Config("Claude provider requires API key".to_string()))?;
            let client = match endpoint {
                Some(url) => AnthropicClient::with_base_url(url.as_str(), api_key),
                None => AnthropicClient::new(api_key),
            };
            Ok(Arc::new(client.with_api_version(version.as_str())))
        }
        other => create_client(provider, other.and_then(|c| c.endpoint()), api_key),
    }
}
