//! Gemini provider
//!
//! Talks to the `generateContent` endpoint. The system instruction is
//! passed natively via `systemInstruction` rather than folded into the
//! message list.

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

/// Gemini API request format
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

/// Gemini content (message)
#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

/// Gemini API response format
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

/// Execute a chat request using Gemini's API
pub async fn chat(config: ProviderConfig, context: Context) -> Result<Response, Error> {
    let base_url = config
        .base_url
        .unwrap_or_else(|| "https://generativelanguage.googleapis.com".to_string());

    let model = context.model.unwrap_or_else(|| {
        if config.default_model.is_empty() {
            "gemini-1.5-pro".to_string()
        } else {
            config.default_model.clone()
        }
    });

    let url = format!(
        "{}/v1beta/models/{}:generateContent?key={}",
        base_url, model, config.api_key
    );

    let mut system_instruction = None;
    let mut contents = Vec::new();

    for msg in &context.messages {
        match msg.role {
            MessageRole::System => {
                system_instruction = Some(GeminiContent {
                    role: None,
                    parts: vec![GeminiPart {
                        text: msg.content.clone(),
                    }],
                });
            }
            MessageRole::User | MessageRole::Assistant => {
                let role = if msg.role == MessageRole::User {
                    "user"
                } else {
                    "model"
                };
                contents.push(GeminiContent {
                    role: Some(role.to_string()),
                    parts: vec![GeminiPart {
                        text: msg.content.clone(),
                    }],
                });
            }
        }
    }

    let generation_config = if context.temperature.is_some() || context.max_tokens.is_some() {
        Some(GenerationConfig {
            temperature: context.temperature,
            max_output_tokens: context.max_tokens,
        })
    } else {
        None
    };

    let request = GeminiRequest {
        system_instruction,
        contents,
        generation_config,
    };

    let response = http_client()
        .post(&url)
        .header("Content-Type", "application/json")
        .json(&request)
        .send()
        .await
        .map_err(|e| Error::new("gemini", format!("HTTP request failed: {}", e)))?;

    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());

        // Prefer the API's own error message when present
        if let Ok(error_json) = serde_json::from_str::<serde_json::Value>(&error_text) {
            if let Some(error_msg) = error_json
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
            {
                return Err(Error::new(
                    "gemini",
                    format!("HTTP {}: {}", status, error_msg),
                ));
            }
        }

        return Err(Error::new(
            "gemini",
            format!("HTTP {}: {}", status, error_text),
        ));
    }

    let gemini_response: GeminiResponse = response
        .json()
        .await
        .map_err(|e| Error::new("gemini", format!("Failed to parse response: {}", e)))?;

    let Some(candidate) = gemini_response.candidates.first() else {
        return Err(Error::new("gemini", "No candidates in response"));
    };

    let content: String = candidate
        .content
        .parts
        .iter()
        .map(|part| part.text.clone())
        .collect::<Vec<_>>()
        .join("\n");

    Ok(Response { content, model })
}
