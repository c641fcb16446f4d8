//! OpenAI-compatible chat completions provider

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::ProviderConfig;
use crate::infrastructure::llm::{Context, Error, MessageRole, Response};

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
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// Execute a chat request against an OpenAI-compatible endpoint
pub async fn chat(config: ProviderConfig, context: Context) -> Result<Response, Error> {
    let base_url = config
        .base_url
        .unwrap_or_else(|| "https://api.openai.com/v1".to_string());

    let model = context.model.unwrap_or_else(|| {
        if config.default_model.is_empty() {
            "gpt-4o-mini".to_string()
        } else {
            config.default_model.clone()
        }
    });

    let messages = context
        .messages
        .iter()
        .map(|msg| ChatMessage {
            role: match msg.role {
                MessageRole::System => "system".to_string(),
                MessageRole::User => "user".to_string(),
                MessageRole::Assistant => "assistant".to_string(),
            },
            content: msg.content.clone(),
        })
        .collect();

    let request = ChatRequest {
        model: model.clone(),
        messages,
        temperature: context.temperature,
        max_tokens: context.max_tokens,
    };

    let response = http_client()
        .post(format!("{}/chat/completions", base_url))
        .bearer_auth(&config.api_key)
        .json(&request)
        .send()
        .await
        .map_err(|e| Error::new("openai", format!("HTTP request failed: {}", e)))?;

    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());
        return Err(Error::new(
            "openai",
            format!("HTTP {}: {}", status, error_text),
        ));
    }

    let chat_response: ChatResponse = response
        .json()
        .await
        .map_err(|e| Error::new("openai", format!("Failed to parse response: {}", e)))?;

    let Some(choice) = chat_response.choices.into_iter().next() else {
        return Err(Error::new("openai", "No choices in response"));
    };

    Ok(Response {
        content: choice.message.content,
        model,
    })
}
