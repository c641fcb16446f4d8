//! # Media Adapter
//!
//! Image generation for VISUAL_PROMPT directives. One implementation per
//! capability, selected by a configuration-driven factory returning a
//! polymorphic handle. Failures degrade to a text-only fallback upstream.

use crate::domain::config::MediaConfig;
use crate::domain::traits::MediaProvider;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// HTTP client reused across requests
fn http_client() -> &'static Client {
    use std::sync::OnceLock;
    static CLIENT: OnceLock<Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        Client::builder()
            .timeout(std::time::Duration::from_secs(180))
            .build()
            .expect("Failed to create HTTP client")
    })
}

/// Build the configured media provider, if any. Unknown providers and
/// missing credentials are logged and disable image generation entirely.
pub fn from_config(config: &Option<MediaConfig>) -> Option<Arc<dyn MediaProvider>> {
    let cfg = config.as_ref()?;

    let api_key = match (&cfg.api_key, &cfg.api_key_env) {
        (Some(key), _) => key.clone(),
        (None, Some(env_var)) => match std::env::var(env_var) {
            Ok(key) => key,
            Err(_) => {
                tracing::warn!("Media API key env var {} not set, visuals disabled", env_var);
                return None;
            }
        },
        (None, None) => {
            tracing::warn!("Media provider configured without an API key, visuals disabled");
            return None;
        }
    };

    match cfg.provider.to_lowercase().as_str() {
        "openai" | "dall-e" => Some(Arc::new(OpenAiImages {
            api_key,
            base_url: cfg
                .endpoint
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: cfg.model.clone().unwrap_or_else(|| "dall-e-3".to_string()),
        })),
        other => {
            tracing::warn!("Unknown media provider '{}', visuals disabled", other);
            None
        }
    }
}

/// OpenAI-compatible image generation endpoint
pub struct OpenAiImages {
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ImageRequest {
    model: String,
    prompt: String,
    n: u32,
    size: String,
    response_format: String,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
}

#[async_trait]
impl MediaProvider for OpenAiImages {
    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>, String> {
        let request = ImageRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            n: 1,
            size: "1024x1024".to_string(),
            response_format: "b64_json".to_string(),
        };

        let response = http_client()
            .post(format!("{}/images/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("HTTP request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(format!("HTTP {status}: {error_text}"));
        }

        let image_response: ImageResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse response: {e}"))?;

        let encoded = image_response
            .data
            .into_iter()
            .next()
            .and_then(|d| d.b64_json)
            .ok_or_else(|| "No image data in response".to_string())?;

        BASE64
            .decode(encoded.as_bytes())
            .map_err(|e| format!("Failed to decode image payload: {e}"))
    }
}
