//! # LLM Providers
//!
//! Contains implementations for specific LLM providers (OpenAI, Anthropic,
//! Gemini). Each module exposes a `chat` function over the shared
//! `ProviderConfig`/`Context` types.

mod anthropic;
mod gemini;
mod openai;

use crate::domain::config::AgentConfig;
use crate::infrastructure::llm::{Context, Error, Provider, Response};

/// Configuration for a provider
#[derive(Clone)]
pub struct ProviderConfig {
    /// API key
    pub api_key: String,
    /// Base URL (for non-default endpoints)
    pub base_url: Option<String>,
    /// Default model
    pub default_model: String,
    /// Timeout in seconds
    pub timeout: Option<u64>,
}

impl ProviderConfig {
    pub fn from_agent_config(config: &AgentConfig) -> Result<Self, Error> {
        let api_key = if let Some(key) = &config.api_key {
            key.clone()
        } else if let Some(env_var) = &config.api_key_env {
            std::env::var(env_var).map_err(|e| {
                Error::new(
                    &config.provider,
                    format!("API key env var {} not set: {}", env_var, e),
                )
            })?
        } else {
            return Err(Error::new(
                &config.provider,
                "No API key provided - set api_key or api_key_env",
            ));
        };

        Ok(Self {
            api_key,
            base_url: config.endpoint.clone(),
            default_model: config.model.clone(),
            timeout: config.timeout,
        })
    }
}

/// Execute a chat request with the specified provider
pub async fn chat(
    provider: Provider,
    config: ProviderConfig,
    context: Context,
) -> Result<Response, Error> {
    match provider {
        Provider::OpenAI => openai::chat(config, context).await,
        Provider::Anthropic => anthropic::chat(config, context).await,
        Provider::Gemini => gemini::chat(config, context).await,
    }
}
