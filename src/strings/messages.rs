//! # Messages
//!
//! Constant strings and format functions for user-facing messages.

use crate::domain::types::TableState;

pub const UNKNOWN_COMMAND: &str = "❓ Unknown command. Try `/help`.";

// Dice

pub fn roll_announcement(name: &str, notation: &str, formatted: &str) -> String {
    format!("🎲 **{name}** rolls {notation}: {formatted}")
}

pub fn roll_announcement_with_reason(
    name: &str,
    notation: &str,
    reason: &str,
    formatted: &str,
) -> String {
    format!("🎲 **{name}** rolls {notation} for {reason}: {formatted}")
}

pub fn invalid_notation(err: &str) -> String {
    format!("❌ Invalid dice notation: {err}")
}

pub fn invalid_pending_roll(err: &str) -> String {
    format!("❌ Invalid pending roll: {err}")
}

pub const NO_PENDING_ROLL: &str = "❌ No pending roll found.";

// Presence

pub fn away_set(name: &str, mode: &str) -> String {
    format!("💤 **{name}** is now Away ({mode}).")
}

pub fn away_failed(valid_modes: &str) -> String {
    format!("❌ Unknown away mode. Valid modes: {valid_modes}.")
}

pub fn welcome_back(name: &str) -> String {
    format!("👋 Welcome back **{name}**!")
}

pub fn user_returned(name: &str) -> String {
    format!("🟢 **{name}** has returned.")
}

pub const NOT_AWAY: &str = "You are not away.";

// Ledger

pub const LEDGER_EMPTY: &str = "The campaign ledger is currently empty.";

pub fn sheet_block(sheet: &str) -> String {
    format!("```markdown\n{sheet}\n```")
}

pub const CHARACTER_NOT_FOUND: &str = "Character not found in ledger.";

pub fn sheet_not_found(name: &str) -> String {
    format!("Sheet for {name} not found.")
}

pub fn memory_rebuilt(count: usize) -> String {
    format!("✅ Memory Rebuilt ({count} files).")
}

pub const NOTHING_TO_REWIND: &str = "No recent memory update found to rewind.";

// System events (visible to the model on its next turn)

pub fn ooc(name: &str, message: &str) -> String {
    format!("[OOC] {name}: {message}")
}

pub fn visual_requested(name: &str, prompt: Option<&str>) -> String {
    match prompt {
        Some(p) => format!("[System Event: Player {name} requested visual of \"{p}\".]"),
        None => format!("[System Event: Player {name} requested scene visual.]"),
    }
}

pub fn visual_triggered(prompt: &str) -> String {
    format!("[System Event: Visual Prompt triggered: {prompt}]")
}

pub fn visual_saved(path: &str) -> String {
    format!("🖼️ Scene visual rendered: `{path}`")
}

pub fn rewind_event(name: &str, new_direction: &str) -> String {
    format!("[System Event: Rewind requested by {name}. New direction: \"{new_direction}\"]")
}

pub const REWOUND: &str = "↩️ Rewound.";

pub const X_CARD_PIVOT: &str = "Let's pause here and shift focus.";

pub fn x_card_event(name: &str, reason: Option<&str>) -> String {
    match reason {
        Some(r) => format!("[System Event: X-Card used by {name}. Reason: {r}]"),
        None => format!("[System Event: X-Card used by {name}.]"),
    }
}

// Feedback

pub fn feedback_interpretation(kind: &str, interpretation: &str) -> String {
    let icon = if kind == "star" { "⭐" } else { "🙏" };
    format!("### {icon} Interpretation:\n> {interpretation}")
}

pub fn implicit_feedback(name: &str, kind: &str, content: &str, interpretation: &str) -> String {
    format!(
        "💡 **{name}**, I detected a possible **{kind}** from you:\n> \"{content}\"\n\n**Interpretation:**\n{interpretation}"
    )
}

pub const FEEDBACK_RECORDED: &str =
    "✅ Got it. Your feedback has been recorded and shared with the party.";

// Session phases

pub fn session_status(state: TableState, narrative_active: bool, last_updated: Option<&str>) -> String {
    let engine = if narrative_active { "running" } else { "suspended" };
    match last_updated {
        Some(ts) => format!(
            "🎛️ Table state: **{}** (narrative engine {engine}, last change {ts}).",
            state.as_str()
        ),
        None => format!(
            "🎛️ Table state: **{}** (narrative engine {engine}).",
            state.as_str()
        ),
    }
}

pub fn table_state_directive(state: TableState, reason: &str) -> String {
    format!(
        "📣 Table state is now **{}** ({}).",
        state.as_str(),
        reason
    )
}

pub const INVALID_SESSION_STATE: &str =
    "❌ Invalid session state. Use start, zero, pause, resume, end, or close.";

// Errors

pub fn llm_error(err: &str) -> String {
    format!("⚠️ The GM lost their train of thought: {err}")
}

pub const NOT_ADMIN: &str = "🚫 This command requires admin rights.";
