//! # Configuration
//!
//! Manages the loading and parsing of the application's configuration file
//! (`config.yaml`). Defines the structs for system settings, agent
//! configurations, and service credentials.

use serde::Deserialize;
use std::collections::HashMap;

/// Main application configuration structure.
/// Matches the layout of `data/config.yaml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub services: ServicesConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub media: Option<MediaConfig>,
}

/// Configuration for various connected services.
#[derive(Debug, Deserialize, Clone)]
pub struct ServicesConfig {
    pub matrix: MatrixConfig,
}

/// Specific configuration for the Matrix service.
#[derive(Debug, Deserialize, Clone)]
pub struct MatrixConfig {
    pub username: String,
    pub password: String,
    pub homeserver: String,
    /// Room the bot narrates in. Other rooms are ignored.
    #[serde(default)]
    pub room: Option<String>,
}

pub type AgentsConfig = HashMap<String, AgentConfig>;

/// One named model configuration (e.g. "gm", "architect").
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AgentConfig {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>, // e.g. "GEMINI_API_KEY"
    /// Secondary model tried once when the primary keeps hitting rate limits
    #[serde(default)]
    pub fallback_model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Base retry delay in seconds for retryable failures
    #[serde(default)]
    pub retry_delay: Option<u64>,
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// System-level settings for the bot.
#[derive(Debug, Deserialize, Clone)]
pub struct SystemConfig {
    #[serde(default = "default_memory_dir")]
    pub memory_dir: String,
    #[serde(default = "default_knowledge_dir")]
    pub knowledge_dir: String,
    #[serde(default = "default_persona_dir")]
    pub persona_dir: String,
    #[serde(default = "default_away_file")]
    pub away_file: String,
    #[serde(default = "default_table_file")]
    pub table_file: String,
    #[serde(default = "default_media_dir")]
    pub media_dir: String,
    /// Transport message size limit in characters
    #[serde(default = "default_message_limit")]
    pub message_limit: usize,
    /// Conversation turns kept as model context
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// User IDs allowed to run destructive commands
    #[serde(default)]
    pub admin: Vec<String>,
    /// Agent used for narration
    #[serde(default = "default_gm_agent")]
    pub gm_agent: String,
    /// Agent used for ledger maintenance
    #[serde(default = "default_architect_agent")]
    pub architect_agent: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            memory_dir: default_memory_dir(),
            knowledge_dir: default_knowledge_dir(),
            persona_dir: default_persona_dir(),
            away_file: default_away_file(),
            table_file: default_table_file(),
            media_dir: default_media_dir(),
            message_limit: default_message_limit(),
            history_limit: default_history_limit(),
            admin: Vec::new(),
            gm_agent: default_gm_agent(),
            architect_agent: default_architect_agent(),
        }
    }
}

/// Configuration for the image generation backend.
#[derive(Debug, Deserialize, Clone)]
pub struct MediaConfig {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

fn default_memory_dir() -> String {
    "data/memory".to_string()
}
fn default_knowledge_dir() -> String {
    "data/knowledge".to_string()
}
fn default_persona_dir() -> String {
    "data/persona".to_string()
}
fn default_away_file() -> String {
    "data/away_status.json".to_string()
}
fn default_table_file() -> String {
    "data/table_state.json".to_string()
}
fn default_media_dir() -> String {
    "data/media".to_string()
}
fn default_message_limit() -> usize {
    1900
}
fn default_history_limit() -> usize {
    15
}
fn default_gm_agent() -> String {
    "gm".to_string()
}
fn default_architect_agent() -> String {
    "architect".to_string()
}
