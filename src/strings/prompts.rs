//! # Prompts
//!
//! Templates for the Architect ledger round-trip, feedback interpretation,
//! and context assembly.

/// Prompt sent to the Architect to fold new facts into the ledgers.
pub fn architect_update_prompt(current_memory: &str, new_facts: &str) -> String {
    format!(
        "# CURRENT LEDGER STATE\n{}\n\n# NEW FACTS TO INCORPORATE\n{}",
        if current_memory.is_empty() { "[Empty]" } else { current_memory },
        new_facts
    )
}

/// Prompt sent to the Architect to undo facts after a rewind.
pub fn architect_reverse_prompt(current_memory: &str, facts_to_reverse: &str) -> String {
    format!(
        "# CURRENT LEDGER STATE\n{}\n\n# REWIND EVENT: The following facts are now INCORRECT and must be REVERSED or REMOVED from the ledgers:\n{}",
        if current_memory.is_empty() { "[Empty]" } else { current_memory },
        facts_to_reverse
    )
}

/// Prompt sent to the Architect to rebuild all ledgers from a transcript.
pub fn architect_rebuild_prompt(history_text: &str) -> String {
    format!("# HISTORY\n{history_text}\n\nBuild fresh ledgers.")
}

/// Prompt asking the GM persona to interpret a piece of player feedback.
pub fn feedback_interpretation(kind: &str, message: &str) -> String {
    let meaning = if kind == "star" {
        "liked something and want more of it"
    } else {
        "want to see something in the future"
    };
    format!(
        "A player has provided feedback. As the GM, your task is to understand their input and explain what you will do with it.\n\n\
        The feedback is a '{}'. This means they {}.\n\n\
        **Player's Feedback:** \"{}\"\n\n\
        **Your Interpretation:** Briefly explain your understanding of this feedback and how it might influence future sessions. Start with 'I understand...'. Then, create a ```FEEDBACK_UPDATE``` block containing a concise, structured fact for your long-term memory.",
        kind.to_uppercase(),
        meaning,
        message
    )
}

/// Correction turn appended when the model blows past the transport limit.
pub fn length_correction(actual: usize, limit: usize) -> String {
    format!(
        "SYSTEM ERROR: Your last response was {actual} characters long, exceeding the {limit} limit. \
        REWRITE the response to be under {limit} characters immediately. Do not lose narrative progress, just summarize."
    )
}

/// Read-only campaign state section appended to the system instruction.
pub fn campaign_state_section(ledger_content: &str) -> String {
    format!("# CURRENT CAMPAIGN STATE (READ-ONLY)\n{ledger_content}")
}

/// Away roster section appended to the system instruction so the model
/// narrates around absent players instead of addressing them.
pub fn away_roster_section(entries: &[(String, String)]) -> String {
    let mut lines = vec![
        "# ABSENT PLAYERS".to_string(),
        "The following players are away. Do NOT mention, ping, or address them directly; handle their characters per the listed mode.".to_string(),
    ];
    for (user, mode) in entries {
        lines.push(format!("- {user} ({mode})"));
    }
    lines.join("\n")
}
