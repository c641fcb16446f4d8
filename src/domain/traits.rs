//! # Domain Traits
//!
//! Abstract interfaces for the external collaborators (chat transport,
//! generative model, media generation). Implementations live in the
//! Infrastructure layer.

use crate::domain::types::ChatTurn;
use async_trait::async_trait;

/// Abstract interface for a chat transport (e.g. Matrix, Console)
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send a message to the channel. Content must already be chunked to
    /// the transport size limit.
    async fn send_message(&self, content: &str) -> Result<String, String>;

    /// Send a notification (status/error, not part of the narrative)
    async fn send_notification(&self, content: &str) -> Result<(), String>;

    /// Send a typing indicator
    async fn typing(&self, active: bool) -> Result<(), String>;

    /// Get the current channel ID
    fn room_id(&self) -> String;
}

/// Abstract interface for a generative model provider
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for the named agent configuration.
    ///
    /// `history` is the ordered conversation; the system instruction is
    /// passed separately so providers can map it natively.
    async fn generate(
        &self,
        agent: &str,
        system_instruction: &str,
        history: &[ChatTurn],
        temperature: f32,
    ) -> Result<String, String>;
}

/// Abstract interface for an image generation backend
#[async_trait]
pub trait MediaProvider: Send + Sync {
    /// Render an image for a scene prompt. Returns raw PNG bytes.
    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>, String>;
}
