//! # LLM Infrastructure
//!
//! Shared types for the model client and its providers: the provider
//! enum, request context, response, and the error type with its
//! retryable/fatal classification.

pub mod client;
pub mod providers;

pub use client::Client;

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Anthropic,
    Gemini,
}

impl Provider {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Some(Provider::OpenAI),
            "anthropic" | "claude" => Some(Provider::Anthropic),
            "gemini" | "google" => Some(Provider::Gemini),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAI => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Gemini => "gemini",
        }
    }
}

/// Error from a provider call
#[derive(Debug, Clone)]
pub struct Error {
    pub provider: String,
    pub message: String,
}

impl Error {
    pub fn new(provider: &str, message: impl Into<String>) -> Self {
        Self {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    /// Rate/quota exhaustion, transient network trouble, and server-side
    /// 5xx responses are worth retrying; everything else is fatal.
    pub fn is_retryable(&self) -> bool {
        let msg = self.message.to_lowercase();

        if msg.contains("429")
            || msg.contains("too many requests")
            || msg.contains("rate limit")
            || msg.contains("quota")
        {
            return true;
        }

        if msg.contains("network")
            || msg.contains("connection")
            || msg.contains("timeout")
            || msg.contains("timed out")
        {
            return true;
        }

        if msg.contains("500")
            || msg.contains("502")
            || msg.contains("503")
            || msg.contains("internal server error")
            || msg.contains("service unavailable")
        {
            return true;
        }

        false
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.provider, self.message)
    }
}

impl std::error::Error for Error {}

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// One message of a request context
#[derive(Debug, Clone)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

/// Request context passed to a provider
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Model override; the agent's default model when None
    pub model: Option<String>,
    pub messages: Vec<Message>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn push(&mut self, role: MessageRole, content: impl Into<String>) {
        self.messages.push(Message {
            role,
            content: content.into(),
        });
    }
}

/// Completed provider response
#[derive(Debug, Clone)]
pub struct Response {
    pub content: String,
    pub model: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_str() {
        assert_eq!(Provider::from_str("openai"), Some(Provider::OpenAI));
        assert_eq!(Provider::from_str("anthropic"), Some(Provider::Anthropic));
        assert_eq!(Provider::from_str("claude"), Some(Provider::Anthropic));
        assert_eq!(Provider::from_str("gemini"), Some(Provider::Gemini));
        assert_eq!(Provider::from_str("Gemini"), Some(Provider::Gemini));
        assert_eq!(Provider::from_str("unknown"), None);
    }

    #[test]
    fn test_retryable_errors() {
        let retryable = [
            "429 Too Many Requests",
            "Rate limit exceeded",
            "Quota exceeded for project",
            "Connection refused",
            "Request timed out",
            "503 Service Unavailable",
            "500 Internal Server Error",
        ];
        for msg in retryable {
            assert!(Error::new("test", msg).is_retryable(), "{msg}");
        }

        let fatal = ["Invalid API key", "404 Not Found", "400 Bad Request"];
        for msg in fatal {
            assert!(!Error::new("test", msg).is_retryable(), "{msg}");
        }
    }
}
