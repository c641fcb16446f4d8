//! # Protocol Parser
//!
//! Extracts the private text protocol out of raw model responses. The
//! model embeds tagged fenced blocks (DATA_TABLE, MEMORY_UPDATE,
//! VISUAL_PROMPT, DICE_ROLL, ROLL_CALL, FEEDBACK_DETECTED, TABLE_STATE);
//! each pass below consumes its block kind and rewrites the display text.
//! Order matters: later passes operate on the output of earlier ones.
//! Malformed blocks fail open (logged, text passed through).

use crate::application::dice;
use crate::application::rolls::PendingRollStore;
use crate::domain::types::{
    AwayRecord, FeedbackItem, ParsedResponse, StateChange, TableState,
};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::Arc;

pub struct ResponseParser {
    rolls: Arc<PendingRollStore>,
}

impl ResponseParser {
    pub fn new(rolls: Arc<PendingRollStore>) -> Self {
        Self { rolls }
    }

    /// Run the full extraction pipeline over a raw model response.
    ///
    /// `away` is a snapshot of currently absent users, keyed by user ID;
    /// their mentions are neutralized before anything else runs.
    pub fn process(&self, raw: &str, away: &HashMap<String, AwayRecord>) -> ParsedResponse {
        let mut text = filter_away_mentions(raw, away);

        text = render_data_tables(&text);

        let facts = extract_memory_update(&mut text);
        let visual_prompt = extract_visual_prompt(&mut text);

        text = execute_dice_rolls(&text);
        text = self.process_roll_calls(&text);

        let feedback = extract_feedback(&mut text);
        let state_change = extract_table_state(&mut text);

        ParsedResponse {
            text: text.trim().to_string(),
            facts,
            visual_prompt,
            feedback,
            state_change,
        }
    }

    /// ROLL_CALL blocks queue one pending roll per line and are replaced
    /// with a per-line acknowledgment.
    fn process_roll_calls(&self, text: &str) -> String {
        let block = Regex::new(r"(?is)```ROLL_CALL\s*(.*?)\s*```").unwrap();
        let line_pattern = Regex::new(r"^@?(\w+):\s*(\S+)(?:\s+for\s+(.+))?").unwrap();

        let replaced = block.replace_all(text, |caps: &Captures| {
            let mut acks: Vec<String> = Vec::new();

            for line in caps[1].lines() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let Some(call) = line_pattern.captures(line) else {
                    tracing::warn!("Unparseable ROLL_CALL line: {}", line);
                    continue;
                };

                let username = call[1].to_string();
                let notation = call[2].to_string();
                let reason = call
                    .get(3)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_else(|| "unknown".to_string());

                self.rolls.upsert(&username, &notation, &reason);
                acks.push(format!("📋 **{username}**, roll {notation} for {reason}"));
            }

            acks.join("\n")
        });

        replaced.trim().to_string()
    }
}

/// Rewrites mention tokens of currently absent users to a neutral
/// placeholder. Mentions are replaced, never deleted, to keep the
/// surrounding sentence readable.
fn filter_away_mentions(text: &str, away: &HashMap<String, AwayRecord>) -> String {
    if away.is_empty() {
        return text.to_string();
    }

    let mut processed = text.to_string();
    for user_id in away.keys() {
        let pattern = Regex::new(&format!(r"<@!?{}>", regex::escape(user_id))).unwrap();
        if pattern.is_match(&processed) {
            tracing::info!("Suppressed mention for away user {}", user_id);
            processed = pattern.replace_all(&processed, "**(Away)**").to_string();
        }
    }
    processed
}

/// DATA_TABLE blocks become fixed-width text tables with a bold title.
/// A block with no parseable header row passes through unchanged.
fn render_data_tables(text: &str) -> String {
    let pattern = Regex::new(r"(?is)```DATA_TABLE\s*(.*?)```").unwrap();

    let replaced = pattern.replace_all(text, |caps: &Captures| {
        match render_table(&caps[1]) {
            Some(rendered) => rendered,
            None => caps[0].to_string(),
        }
    });

    replaced.trim().to_string()
}

fn render_table(block: &str) -> Option<String> {
    let mut title = "Data Table".to_string();
    let mut headers: Vec<String> = Vec::new();
    let mut rows: Vec<Vec<String>> = Vec::new();

    for line in block.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix("Title:") {
            title = rest.trim().to_string();
        } else if line.contains('|') {
            let cols: Vec<String> = line.split('|').map(|c| c.trim().to_string()).collect();
            if headers.is_empty() {
                headers = cols;
            } else {
                rows.push(cols);
            }
        }
    }

    if headers.is_empty() {
        tracing::warn!("DATA_TABLE block without a header row, passing through");
        return None;
    }

    Some(format!(
        "**{title}**\n```text\n{}\n```",
        ascii_table(&headers, &rows)
    ))
}

/// Left-aligned bordered table. Rows shorter than the header are padded
/// with empty cells; longer rows are truncated to header width.
fn ascii_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let width = headers.len();

    let normalized: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            let mut row = row.clone();
            row.resize(width, String::new());
            row.truncate(width);
            row
        })
        .collect();

    let mut col_widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &normalized {
        for (i, cell) in row.iter().enumerate() {
            col_widths[i] = col_widths[i].max(cell.chars().count());
        }
    }

    let border = format!(
        "+{}+",
        col_widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+")
    );
    let format_row = |cells: &[String]| {
        format!(
            "|{}|",
            cells
                .iter()
                .zip(col_widths.iter().copied())
                .map(|(cell, w)| format!(" {cell:<w$} "))
                .collect::<Vec<_>>()
                .join("|")
        )
    };

    let mut lines = vec![border.clone(), format_row(headers), border.clone()];
    for row in &normalized {
        lines.push(format_row(row));
    }
    lines.push(border);
    lines.join("\n")
}

/// MEMORY_UPDATE content is lifted into the facts channel; all such
/// blocks are removed from the display text.
fn extract_memory_update(text: &mut String) -> Option<String> {
    let pattern = Regex::new(r"(?is)```MEMORY_UPDATE\s*(.*?)```").unwrap();

    let facts = pattern.captures(text).map(|caps| caps[1].trim().to_string())?;
    *text = pattern.replace_all(text, "").trim().to_string();
    Some(facts)
}

/// VISUAL_PROMPT extraction: an ordered list of matcher strategies tried
/// in sequence, first success wins. The looser bracket form handles model
/// formatting drift when the fence is forgotten.
fn extract_visual_prompt(text: &mut String) -> Option<String> {
    let strategies: [(&str, Regex); 2] = [
        (
            "fenced",
            Regex::new(r"(?is)```VISUAL_PROMPT\s*(.*?)```").unwrap(),
        ),
        (
            "bracketed",
            Regex::new(r"(?is)(?:\*+|#+)?[ \t]*VISUAL_PROMPT[ \t]*(?:\*+|#+)?[:\-]?\s*((?:\[.*?\]\s*)+)").unwrap(),
        ),
    ];

    for (name, pattern) in &strategies {
        if let Some(caps) = pattern.captures(text) {
            let prompt = caps[1].trim().to_string();
            tracing::debug!("Matched VISUAL_PROMPT via {} pattern", name);
            *text = pattern.replace_all(text, "").trim().to_string();
            return Some(prompt);
        }
    }

    if text.to_uppercase().contains("VISUAL_PROMPT") {
        tracing::warn!("Found 'VISUAL_PROMPT' keyword but failed to parse the structure");
    }
    None
}

/// DICE_ROLL blocks are executed, not just extracted: the block is
/// replaced with the roll announcement (or a failure notice).
fn execute_dice_rolls(text: &str) -> String {
    let pattern =
        Regex::new(r"(?is)```DICE_ROLL\s*(.+?)\s+rolls?\s+(\S+)(?:\s+for\s+(.+?))?\s*```").unwrap();

    let replaced = pattern.replace_all(text, |caps: &Captures| {
        let character = caps[1].trim().to_string();
        let notation = caps[2].trim().to_string();
        let reason = caps
            .get(3)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_else(|| "unknown reason".to_string());

        let result = dice::roll(&notation);
        match &result.error {
            Some(err) => {
                format!("❌ **{character}** attempted to roll {notation} but: {err}")
            }
            None => {
                tracing::debug!(
                    "Executed {}: rolls {:?}, modifier {}, total {}",
                    notation,
                    result.rolls,
                    result.modifier,
                    result.total
                );
                format!(
                    "🎲 **{character}** rolls {notation} for {reason}: {}",
                    result.formatted
                )
            }
        }
    });

    replaced.trim().to_string()
}

/// FEEDBACK_DETECTED blocks carry `type` / `user` / `content` lines.
fn extract_feedback(text: &mut String) -> Vec<FeedbackItem> {
    let pattern = Regex::new(r"(?is)```FEEDBACK_DETECTED\s*(.*?)```").unwrap();
    let mut items = Vec::new();

    for caps in pattern.captures_iter(text) {
        let mut kind = "star".to_string();
        let mut user = "Unknown".to_string();
        let mut content = String::new();

        for line in caps[1].lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim().to_lowercase().as_str() {
                "type" => kind = value.to_lowercase(),
                "user" => user = value.to_string(),
                "content" => content = value.to_string(),
                _ => {}
            }
        }

        items.push(FeedbackItem {
            kind,
            user,
            content,
        });
    }

    if !items.is_empty() {
        *text = pattern.replace_all(text, "").trim().to_string();
    }
    items
}

/// TABLE_STATE blocks carry `state` / `reason` lines; an unknown state
/// value drops the directive with a warning.
fn extract_table_state(text: &mut String) -> Option<StateChange> {
    let pattern = Regex::new(r"(?is)```TABLE_STATE\s*(.*?)```").unwrap();

    let caps = pattern.captures(text)?;
    let mut state: Option<TableState> = None;
    let mut reason = String::new();

    for line in caps[1].lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key.trim().to_lowercase().as_str() {
            "state" => {
                state = TableState::parse(value);
                if state.is_none() {
                    tracing::warn!("Unknown table state in directive: {}", value.trim());
                }
            }
            "reason" => reason = value.trim().to_string(),
            _ => {}
        }
    }

    *text = pattern.replace_all(text, "").trim().to_string();
    state.map(|state| StateChange { state, reason })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::AwayMode;
    use chrono::Utc;

    fn parser() -> (ResponseParser, Arc<PendingRollStore>) {
        let rolls = Arc::new(PendingRollStore::new());
        (ResponseParser::new(rolls.clone()), rolls)
    }

    fn no_away() -> HashMap<String, AwayRecord> {
        HashMap::new()
    }

    #[test]
    fn test_plain_text_unchanged() {
        let (parser, _) = parser();
        let parsed = parser.process("The tavern falls silent.", &no_away());

        assert_eq!(parsed.text, "The tavern falls silent.");
        assert!(parsed.facts.is_none());
        assert!(parsed.visual_prompt.is_none());
        assert!(parsed.feedback.is_empty());
        assert!(parsed.state_change.is_none());
    }

    #[test]
    fn test_memory_update_round_trip() {
        let (parser, _) = parser();
        let raw = "The dragon falls!\n```MEMORY_UPDATE\n- Dragon is dead\n```";
        let parsed = parser.process(raw, &no_away());

        assert_eq!(parsed.facts.as_deref(), Some("- Dragon is dead"));
        assert!(parsed.text.contains("The dragon falls!"));
        assert!(!parsed.text.contains("MEMORY_UPDATE"));
        assert!(!parsed.text.contains("Dragon is dead"));
    }

    #[test]
    fn test_data_table_rendered() {
        let (parser, _) = parser();
        let raw = "```DATA_TABLE\nTitle: Stats\nStat | Value\nHP | 10\n```";
        let parsed = parser.process(raw, &no_away());

        assert!(parsed.text.contains("**Stats**"));
        assert!(parsed.text.contains("10"));
        assert!(parsed.text.contains("HP"));
        assert!(!parsed.text.contains("DATA_TABLE"));
    }

    #[test]
    fn test_data_table_pads_and_truncates_rows() {
        let raw = "Title: T\nA | B | C\n1 | 2\n9 | 8 | 7 | 6";
        let rendered = render_table(raw).unwrap();
        // short row padded to header width, long row truncated
        assert!(rendered.contains("| 1 | 2 |   |"));
        assert!(rendered.contains("| 9 | 8 | 7 |"));
        assert!(!rendered.contains('6'));
    }

    #[test]
    fn test_malformed_table_passes_through() {
        let (parser, _) = parser();
        let raw = "```DATA_TABLE\nno pipes anywhere here\n```";
        let parsed = parser.process(raw, &no_away());
        assert_eq!(parsed.text, raw);
    }

    #[test]
    fn test_dice_roll_executed() {
        let (parser, _) = parser();
        let raw = "```DICE_ROLL\nKorra rolls 2d6+3 for Defy Danger\n```";
        let parsed = parser.process(raw, &no_away());

        assert!(parsed.text.contains("🎲 **Korra** rolls 2d6+3 for Defy Danger"));
        assert!(!parsed.text.contains("DICE_ROLL"));
    }

    #[test]
    fn test_dice_roll_default_reason() {
        let (parser, _) = parser();
        let parsed = parser.process("```DICE_ROLL\nBren rolls 1d20\n```", &no_away());
        assert!(parsed.text.contains("for unknown reason"));
    }

    #[test]
    fn test_dice_roll_invalid_notation() {
        let (parser, _) = parser();
        let parsed = parser.process("```DICE_ROLL\nBren rolls 999d999999 for luck\n```", &no_away());
        assert!(parsed.text.contains("❌ **Bren** attempted to roll"));
    }

    #[test]
    fn test_roll_call_stores_pending() {
        let (parser, rolls) = parser();
        let raw = "```ROLL_CALL\n@Alice: 2d6+3 for Defy Danger\nBob: 1d20\n```";
        let parsed = parser.process(raw, &no_away());

        let alice = rolls.get("Alice").expect("pending stored");
        assert_eq!(alice.notation, "2d6+3");
        assert_eq!(alice.reason, "Defy Danger");

        let bob = rolls.get("Bob").expect("pending stored");
        assert_eq!(bob.reason, "unknown");

        assert!(parsed.text.contains("**Alice**, roll 2d6+3 for Defy Danger"));
        assert!(parsed.text.contains("**Bob**, roll 1d20 for unknown"));
    }

    #[test]
    fn test_feedback_detected() {
        let (parser, _) = parser();
        let raw = "Great scene.\n```FEEDBACK_DETECTED\ntype: wish\nuser: Alice\ncontent: more exploration\n```";
        let parsed = parser.process(raw, &no_away());

        assert_eq!(parsed.feedback.len(), 1);
        let item = &parsed.feedback[0];
        assert_eq!(item.kind, "wish");
        assert_eq!(item.user, "Alice");
        assert_eq!(item.content, "more exploration");
        assert!(!parsed.text.contains("FEEDBACK_DETECTED"));
    }

    #[test]
    fn test_table_state_extracted() {
        let (parser, _) = parser();
        let raw = "We have reached the end.\n```TABLE_STATE\nstate: DEBRIEF\nreason: Cliffhanger achieved.\n```";
        let parsed = parser.process(raw, &no_away());

        let change = parsed.state_change.expect("state change detected");
        assert_eq!(change.state, TableState::Debrief);
        assert_eq!(change.reason, "Cliffhanger achieved.");
        assert!(parsed.text.contains("We have reached the end."));
        assert!(!parsed.text.contains("TABLE_STATE"));
    }

    #[test]
    fn test_table_state_case_insensitive() {
        let (parser, _) = parser();
        let raw = "```table_state\nState: Paused\nREASON: Bio break\n```";
        let parsed = parser.process(raw, &no_away());

        let change = parsed.state_change.expect("state change detected");
        assert_eq!(change.state, TableState::Paused);
        assert_eq!(change.reason, "Bio break");
    }

    #[test]
    fn test_visual_prompt_fenced() {
        let (parser, _) = parser();
        let raw = "A vista opens.\n```VISUAL_PROMPT\n[wide shot] [misty valley at dawn]\n```";
        let parsed = parser.process(raw, &no_away());

        assert_eq!(
            parsed.visual_prompt.as_deref(),
            Some("[wide shot] [misty valley at dawn]")
        );
        assert_eq!(parsed.text, "A vista opens.");
    }

    #[test]
    fn test_visual_prompt_bracket_fallback() {
        let (parser, _) = parser();
        let raw = "Behold.\nVISUAL_PROMPT: [a ruined keep] [storm light]";
        let parsed = parser.process(raw, &no_away());

        let prompt = parsed.visual_prompt.expect("fallback matched");
        assert!(prompt.contains("[a ruined keep]"));
        assert!(!parsed.text.contains("VISUAL_PROMPT"));
    }

    #[test]
    fn test_visual_prompt_miss_keeps_text() {
        let (parser, _) = parser();
        let raw = "The VISUAL_PROMPT of this scene is indescribable.";
        let parsed = parser.process(raw, &no_away());

        assert!(parsed.visual_prompt.is_none());
        assert_eq!(parsed.text, raw);
    }

    #[test]
    fn test_away_mentions_neutralized() {
        let (parser, _) = parser();
        let mut away = HashMap::new();
        away.insert(
            "12345".to_string(),
            AwayRecord {
                mode: AwayMode::AutoPilot,
                last_seen_message_id: 1,
                timestamp: Utc::now(),
            },
        );

        let parsed = parser.process("Suddenly <@12345> awakens, and <@!12345> too.", &away);
        assert!(!parsed.text.contains("<@12345>"));
        assert!(!parsed.text.contains("<@!12345>"));
        assert!(parsed.text.contains("**(Away)**"));
    }

    #[test]
    fn test_full_pipeline_integration() {
        let (parser, _) = parser();
        let raw = "The dragon falls!\n```MEMORY_UPDATE\n- Dragon is dead\n```\n```TABLE_STATE\nstate: DEBRIEF\nreason: Boss defeated\n```";
        let parsed = parser.process(raw, &no_away());

        assert!(parsed.text.contains("The dragon falls!"));
        assert_eq!(parsed.facts.as_deref(), Some("- Dragon is dead"));
        assert_eq!(parsed.state_change.unwrap().state, TableState::Debrief);
    }
}
