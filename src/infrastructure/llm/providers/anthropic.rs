//! Anthropic (Claude) messages provider

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::ProviderConfig;
use crate::infrastructure::llm::{Context, Error, MessageRole, Response};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// HTTP client reused across requests
fn http_client() -> &'static Client {
    use std::sync::OnceLock;
    static CLIENT: OnceLock<Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client")
    })
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

/// Execute a chat request using Anthropic's messages API
pub async fn chat(config: ProviderConfig, context: Context) -> Result<Response, Error> {
    let base_url = config
        .base_url
        .unwrap_or_else(|| "https://api.anthropic.com".to_string());

    let model = context.model.unwrap_or_else(|| {
        if config.default_model.is_empty() {
            "claude-3-5-sonnet-20241022".to_string()
        } else {
            config.default_model.clone()
        }
    });

    // System messages map to the dedicated `system` field
    let mut system: Option<String> = None;
    let mut messages = Vec::new();
    for msg in &context.messages {
        match msg.role {
            MessageRole::System => system = Some(msg.content.clone()),
            MessageRole::User => messages.push(ApiMessage {
                role: "user".to_string(),
                content: msg.content.clone(),
            }),
            MessageRole::Assistant => messages.push(ApiMessage {
                role: "assistant".to_string(),
                content: msg.content.clone(),
            }),
        }
    }

    let request = MessagesRequest {
        model: model.clone(),
        max_tokens: context.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        system,
        messages,
        temperature: context.temperature,
    };

    let response = http_client()
        .post(format!("{}/v1/messages", base_url))
        .header("x-api-key", &config.api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .json(&request)
        .send()
        .await
        .map_err(|e| Error::new("anthropic", format!("HTTP request failed: {}", e)))?;

    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());
        return Err(Error::new(
            "anthropic",
            format!("HTTP {}: {}", status, error_text),
        ));
    }

    let messages_response: MessagesResponse = response
        .json()
        .await
        .map_err(|e| Error::new("anthropic", format!("Failed to parse response: {}", e)))?;

    let content = messages_response
        .content
        .iter()
        .map(|block| block.text.clone())
        .collect::<Vec<_>>()
        .join("\n");

    if content.is_empty() {
        return Err(Error::new("anthropic", "No content in response"));
    }

    Ok(Response { content, model })
}
