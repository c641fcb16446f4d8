//! # LLM Client
//!
//! Entry point for model interactions. Routes requests to the provider
//! named by the agent configuration, retries retryable failures with
//! exponential backoff, and falls back once to a secondary model when the
//! primary keeps failing.

use crate::domain::config::{AgentConfig, AppConfig};
use crate::domain::traits::LlmProvider;
use crate::domain::types::{ChatTurn, TurnRole};
use crate::infrastructure::llm::providers;
use crate::infrastructure::llm::{Context, Error, MessageRole, Provider, Response};
use async_trait::async_trait;
use std::time::Duration;

const MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY: u64 = 5;

pub struct Client {
    app_config: AppConfig,
}

impl Client {
    pub fn new(app_config: AppConfig) -> Self {
        Self { app_config }
    }

    fn agent(&self, agent_name: &str) -> Result<&AgentConfig, Error> {
        self.app_config
            .agents
            .get(agent_name)
            .ok_or_else(|| Error::new(agent_name, "Agent not found"))
    }

    async fn chat_once(
        &self,
        agent: &AgentConfig,
        model_override: Option<&str>,
        context: &Context,
    ) -> Result<Response, Error> {
        let provider_type = Provider::from_str(&agent.provider)
            .ok_or_else(|| Error::new(&agent.provider, "Unknown provider"))?;
        let provider_config = providers::ProviderConfig::from_agent_config(agent)?;
        tracing::debug!("Dispatching request to {} provider", provider_type.as_str());

        let mut context = context.clone();
        if let Some(model) = model_override {
            context = context.with_model(model);
        }

        providers::chat(provider_type, provider_config, context).await
    }

    /// Send a request with bounded retry on retryable failures and a
    /// one-time switch to the agent's fallback model once the primary has
    /// exhausted its attempts.
    pub async fn chat_with_retry(
        &self,
        agent_name: &str,
        context: Context,
    ) -> Result<Response, Error> {
        let agent = self.agent(agent_name)?;
        let base_delay = agent.retry_delay.unwrap_or(DEFAULT_RETRY_DELAY).max(1);

        let mut last_error = Error::new(agent_name, "No attempts made");

        for attempt in 1..=MAX_ATTEMPTS {
            match self.chat_once(agent, None, &context).await {
                Ok(response) => {
                    if attempt > 1 {
                        tracing::info!("[{}] Request succeeded on attempt {}", agent_name, attempt);
                    }
                    tracing::debug!("[{}] Completion from model {}", agent_name, response.model);
                    return Ok(response);
                }
                Err(e) if e.is_retryable() => {
                    let delay = base_delay * 2u64.pow(attempt - 1);
                    tracing::warn!(
                        "[{}] Request failed (attempt {}/{}): {}. Retrying in {}s...",
                        agent_name,
                        attempt,
                        MAX_ATTEMPTS,
                        e,
                        delay
                    );
                    last_error = e;
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(Duration::from_secs(delay)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        if let Some(fallback) = &agent.fallback_model {
            tracing::warn!(
                "[{}] Primary model exhausted, trying fallback model {}",
                agent_name,
                fallback
            );
            return self.chat_once(agent, Some(fallback), &context).await;
        }

        Err(Error::new(
            agent_name,
            format!("Failed after {} attempts: {}", MAX_ATTEMPTS, last_error.message),
        ))
    }
}

#[async_trait]
impl LlmProvider for Client {
    async fn generate(
        &self,
        agent: &str,
        system_instruction: &str,
        history: &[ChatTurn],
        temperature: f32,
    ) -> Result<String, String> {
        let mut context = Context::new();
        context.temperature = Some(temperature);
        context.push(MessageRole::System, system_instruction);
        for turn in history {
            let role = match turn.role {
                TurnRole::User => MessageRole::User,
                TurnRole::Model => MessageRole::Assistant,
            };
            context.push(role, &turn.content);
        }

        self.chat_with_retry(agent, context)
            .await
            .map(|r| r.content)
            .map_err(|e| e.to_string())
    }
}
