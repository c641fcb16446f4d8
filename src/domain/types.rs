//! # Domain Types
//!
//! Core value types shared across the application: dice results, presence
//! records, the session phase enum, pending roll calls, and the structured
//! output of the response parser.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of a single dice roll request. Immutable once created.
///
/// Invalid notation never raises: the `error` field is set and the roll
/// vector is left empty.
#[derive(Debug, Clone, PartialEq)]
pub struct DiceResult {
    /// Original notation string (e.g. "2d6+3")
    pub notation: String,
    /// Individual die results, one per die
    pub rolls: Vec<i32>,
    /// Numeric modifier applied (0 when absent)
    pub modifier: i32,
    /// Sum of rolls plus modifier (0 for pools and errors)
    pub total: i32,
    /// Chat-ready formatted string
    pub formatted: String,
    /// Failure reason for invalid notation
    pub error: Option<String>,
}

impl DiceResult {
    pub fn invalid(notation: &str, error: impl Into<String>) -> Self {
        Self {
            notation: notation.to_string(),
            rolls: Vec::new(),
            modifier: 0,
            total: 0,
            formatted: String::new(),
            error: Some(error.into()),
        }
    }
}

/// The fixed set of player absence modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AwayMode {
    AutoPilot,
    OffScreen,
    NarrativeExit,
}

impl AwayMode {
    pub const ALL: [AwayMode; 3] = [
        AwayMode::AutoPilot,
        AwayMode::OffScreen,
        AwayMode::NarrativeExit,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto-pilot" => Some(AwayMode::AutoPilot),
            "off-screen" => Some(AwayMode::OffScreen),
            "narrative-exit" => Some(AwayMode::NarrativeExit),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AwayMode::AutoPilot => "auto-pilot",
            AwayMode::OffScreen => "off-screen",
            AwayMode::NarrativeExit => "narrative-exit",
        }
    }
}

/// Absence record for a single user. A user is away exactly when a record
/// exists for them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AwayRecord {
    pub mode: AwayMode,
    pub last_seen_message_id: i64,
    pub timestamp: DateTime<Utc>,
}

/// Session-wide phase indicator. All transitions are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableState {
    #[default]
    Idle,
    SessionZero,
    Active,
    Paused,
    Debrief,
}

impl TableState {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "IDLE" => Some(TableState::Idle),
            "SESSION_ZERO" => Some(TableState::SessionZero),
            "ACTIVE" => Some(TableState::Active),
            "PAUSED" => Some(TableState::Paused),
            "DEBRIEF" => Some(TableState::Debrief),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TableState::Idle => "IDLE",
            TableState::SessionZero => "SESSION_ZERO",
            TableState::Active => "ACTIVE",
            TableState::Paused => "PAUSED",
            TableState::Debrief => "DEBRIEF",
        }
    }
}

/// A roll the model has requested from a named player, waiting for them to
/// execute it with `/roll`. In-process only, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRoll {
    pub notation: String,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

/// A single piece of player feedback detected inside a model response.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackItem {
    /// "star" or "wish"
    pub kind: String,
    pub user: String,
    pub content: String,
}

/// Session phase change requested by the model via a TABLE_STATE block.
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    pub state: TableState,
    pub reason: String,
}

/// Everything the protocol parser extracts from a raw model response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedResponse {
    /// Cleaned narrative text with all protocol blocks consumed
    pub text: String,
    /// MEMORY_UPDATE content, if any
    pub facts: Option<String>,
    /// VISUAL_PROMPT content, if any
    pub visual_prompt: Option<String>,
    /// FEEDBACK_DETECTED items
    pub feedback: Vec<FeedbackItem>,
    /// TABLE_STATE directive, if any
    pub state_change: Option<StateChange>,
}

/// Role of one turn in the model conversation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Model,
}

/// One ordered entry of the conversation history sent to the model.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            content: content.into(),
        }
    }
}
