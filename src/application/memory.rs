//! # Ledger Store
//!
//! Campaign memory as a directory of named `.ledger` text fragments. The
//! aggregate of all ledgers is "memory". Updates are never patched in
//! place: the Architect model re-derives the full content of any ledger it
//! touches from {current memory, new facts}, and the reply overwrites
//! whole files. The read-modify-write is serialized behind one async lock
//! per store.

use crate::application::loader;
use crate::domain::traits::LlmProvider;
use crate::domain::types::ChatTurn;
use crate::strings::prompts;
use regex::Regex;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

const LEDGER_SUFFIX: &str = ".ledger";

pub struct LedgerStore {
    dir: PathBuf,
    persona_dir: PathBuf,
    llm: Arc<dyn LlmProvider>,
    architect_agent: String,
    update_lock: Mutex<()>,
}

impl LedgerStore {
    pub fn new(
        dir: impl Into<PathBuf>,
        persona_dir: impl Into<PathBuf>,
        llm: Arc<dyn LlmProvider>,
        architect_agent: impl Into<String>,
    ) -> Self {
        Self {
            dir: dir.into(),
            persona_dir: persona_dir.into(),
            llm,
            architect_agent: architect_agent.into(),
            update_lock: Mutex::new(()),
        }
    }

    /// Concatenate every ledger, each prefixed with a header naming it, in
    /// filename order. A missing store directory yields an empty string.
    pub fn load_all(&self) -> String {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return String::new();
        };

        let mut ledgers: Vec<(String, String)> = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.ends_with(LEDGER_SUFFIX) {
                continue;
            }
            match fs::read_to_string(entry.path()) {
                Ok(content) => ledgers.push((name, content)),
                Err(e) => tracing::error!("Failed to load ledger {}: {}", name, e),
            }
        }
        ledgers.sort_by(|a, b| a.0.cmp(&b.0));

        ledgers
            .iter()
            .map(|(name, content)| format!("\n--- CAMPAIGN LEDGER: {name} ---\n{content}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Parse `FILE:` directives out of an Architect reply and overwrite the
    /// named ledgers. Fenced blocks are tried first; the unfenced form is a
    /// fallback only when no fenced block matched. Returns the number of
    /// ledgers written; per-file failures are logged and skipped.
    pub fn save_from_directives(&self, ai_text: &str) -> usize {
        let fenced = Regex::new(r"(?s)```FILE: (.*?)\n(.*?)```").unwrap();
        let mut updates: Vec<(String, String)> = fenced
            .captures_iter(ai_text)
            .map(|caps| (caps[1].trim().to_string(), caps[2].to_string()))
            .collect();

        if updates.is_empty() {
            updates = parse_unfenced_directives(ai_text);
        }

        let mut count = 0;
        for (name, content) in updates {
            let mut name = name;
            if !name.ends_with(LEDGER_SUFFIX) {
                name.push_str(LEDGER_SUFFIX);
            }
            if name.contains('/') || name.contains('\\') {
                tracing::warn!("Refusing ledger name with path separator: {}", name);
                continue;
            }

            if let Err(e) = fs::create_dir_all(&self.dir) {
                tracing::error!("Failed to create memory dir: {}", e);
                continue;
            }
            match fs::write(self.dir.join(&name), content.trim()) {
                Ok(()) => {
                    tracing::info!("Ledger saved: {}", name);
                    count += 1;
                }
                Err(e) => tracing::error!("Failed to save ledger {}: {}", name, e),
            }
        }
        count
    }

    /// Incorporate new facts through the Architect round-trip. Failures are
    /// logged, never propagated; call sites fire-and-forget.
    pub async fn update(&self, new_facts: &str) {
        let _guard = self.update_lock.lock().await;

        let Some(instruction) = loader::load_architect_instruction(&self.persona_dir) else {
            tracing::warn!("Memory Architect persona missing, skipping ledger update");
            return;
        };
        let current = self.load_all();
        let prompt = prompts::architect_update_prompt(&current, new_facts);

        match self
            .llm
            .generate(&self.architect_agent, &instruction, &[ChatTurn::user(prompt)], 0.1)
            .await
        {
            Ok(reply) if !reply.trim().is_empty() => {
                let count = self.save_from_directives(&reply);
                tracing::info!("Ledger update applied ({} files)", count);
            }
            Ok(_) => tracing::warn!("Architect returned an empty ledger update"),
            Err(e) => tracing::error!("Ledger update error: {}", e),
        }
    }

    /// Undo previously recorded facts through the Architect round-trip.
    pub async fn reverse(&self, facts_to_reverse: &str) {
        let _guard = self.update_lock.lock().await;

        let Some(instruction) = loader::load_architect_instruction(&self.persona_dir) else {
            tracing::warn!("Memory Architect persona missing, skipping ledger reversal");
            return;
        };
        let current = self.load_all();
        let prompt = prompts::architect_reverse_prompt(&current, facts_to_reverse);

        match self
            .llm
            .generate(&self.architect_agent, &instruction, &[ChatTurn::user(prompt)], 0.1)
            .await
        {
            Ok(reply) if !reply.trim().is_empty() => {
                self.save_from_directives(&reply);
                tracing::info!("Ledgers reversed");
            }
            Ok(_) => tracing::warn!("Architect returned an empty reversal"),
            Err(e) => tracing::error!("Ledger reversal error: {}", e),
        }
    }

    /// Wipe-and-rebuild all ledgers from a chat history transcript.
    /// Returns the number of ledger files written.
    pub async fn rebuild_from_history(&self, history_text: &str) -> usize {
        let _guard = self.update_lock.lock().await;

        let Some(instruction) = loader::load_architect_instruction(&self.persona_dir) else {
            tracing::warn!("Memory Architect persona missing, cannot rebuild");
            return 0;
        };
        let prompt = prompts::architect_rebuild_prompt(history_text);

        match self
            .llm
            .generate(&self.architect_agent, &instruction, &[ChatTurn::user(prompt)], 0.1)
            .await
        {
            Ok(reply) if !reply.trim().is_empty() => self.save_from_directives(&reply),
            Ok(_) => 0,
            Err(e) => {
                tracing::error!("Memory rebuild error: {}", e);
                0
            }
        }
    }

    /// Find a character's name in the party ledger by user ID or username.
    /// The party table keeps the name in the first column and the player
    /// handle in the second.
    pub fn character_name(&self, user_id: &str, user_name: &str) -> Option<String> {
        let content = fs::read_to_string(self.dir.join("party.ledger")).ok()?;

        for line in content.lines() {
            if !line.trim_start().starts_with('|') {
                continue;
            }
            let cols: Vec<&str> = line.split('|').map(str::trim).collect();
            if cols.len() > 2 {
                let name = cols[1].replace("**", "").trim().to_string();
                let user_col = cols[2];
                if user_col.contains(&format!("<@{user_id}>"))
                    || user_col.contains(&format!("@{user_name}"))
                {
                    return Some(name);
                }
            }
        }
        None
    }

    /// Extract a character's sheet block from the party ledger.
    pub fn character_sheet(&self, character_name: &str) -> Option<String> {
        let content = fs::read_to_string(self.dir.join("party.ledger")).ok()?;

        let pattern = Regex::new(&format!(
            r"(?s)```character_sheet\[char_name={}\].*?\n(.*?)```",
            regex::escape(character_name)
        ))
        .unwrap();

        pattern
            .captures(&content)
            .map(|caps| caps[1].trim().to_string())
    }

    /// Append a confirmed feedback entry to the feedback ledger. The
    /// structured FEEDBACK_UPDATE block is preferred; the raw
    /// interpretation text is the fallback.
    pub fn record_feedback(&self, user: &str, interpretation: &str) {
        let pattern = Regex::new(r"(?is)```FEEDBACK_UPDATE\s*(.*?)```").unwrap();
        let content = match pattern.captures(interpretation) {
            Some(caps) => caps[1].trim().to_string(),
            None => {
                let raw = interpretation.split("```").next().unwrap_or("").trim();
                format!("- [Raw Interpretation] {raw}")
            }
        };

        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        let entry = format!("# Entry added on {timestamp} from user {user}\n{content}\n\n");

        if let Err(e) = fs::create_dir_all(&self.dir) {
            tracing::error!("Failed to create memory dir: {}", e);
            return;
        }
        let result = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join("feedback.ledger"))
            .and_then(|mut f| f.write_all(entry.as_bytes()));
        if let Err(e) = result {
            tracing::error!("Failed to write to feedback.ledger: {}", e);
        }
    }
}

/// Unfenced `FILE: name.ledger` headers at line starts; each header's
/// content runs to the next header or end of text.
fn parse_unfenced_directives(text: &str) -> Vec<(String, String)> {
    let header = Regex::new(r"(?m)^FILE: (.*\.ledger)[ \t]*$").unwrap();

    let headers: Vec<(usize, usize, String)> = header
        .captures_iter(text)
        .map(|caps| {
            let whole = caps.get(0).unwrap();
            (whole.start(), whole.end(), caps[1].trim().to_string())
        })
        .collect();

    headers
        .iter()
        .enumerate()
        .map(|(i, (_, end, name))| {
            let content_end = headers.get(i + 1).map(|next| next.0).unwrap_or(text.len());
            (name.clone(), text[*end..content_end].trim().to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tempfile::tempdir;

    struct StubLlm {
        reply: String,
    }

    #[async_trait]
    impl LlmProvider for StubLlm {
        async fn generate(
            &self,
            _agent: &str,
            _system_instruction: &str,
            _history: &[ChatTurn],
            _temperature: f32,
        ) -> Result<String, String> {
            Ok(self.reply.clone())
        }
    }

    fn store_with_reply(dir: &std::path::Path, persona: &std::path::Path, reply: &str) -> LedgerStore {
        LedgerStore::new(
            dir,
            persona,
            Arc::new(StubLlm {
                reply: reply.to_string(),
            }),
            "architect",
        )
    }

    #[test]
    fn test_load_all_missing_dir_is_empty() {
        let dir = tempdir().unwrap();
        let store = store_with_reply(&dir.path().join("nope"), dir.path(), "");
        assert_eq!(store.load_all(), "");
    }

    #[test]
    fn test_load_all_ordered_with_headers() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("world.ledger"), "The world is flat.").unwrap();
        fs::write(dir.path().join("party.ledger"), "Three heroes.").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let store = store_with_reply(dir.path(), dir.path(), "");
        let memory = store.load_all();

        let party_pos = memory.find("CAMPAIGN LEDGER: party.ledger").unwrap();
        let world_pos = memory.find("CAMPAIGN LEDGER: world.ledger").unwrap();
        assert!(party_pos < world_pos);
        assert!(memory.contains("Three heroes."));
        assert!(!memory.contains("ignored"));
    }

    #[test]
    fn test_save_fenced_directives() {
        let dir = tempdir().unwrap();
        let store = store_with_reply(dir.path(), dir.path(), "");

        let reply = "Here you go.\n```FILE: world.ledger\nThe kingdom endures.\n```\n```FILE: party\nKorra joined.\n```";
        assert_eq!(store.save_from_directives(reply), 2);

        assert_eq!(
            fs::read_to_string(dir.path().join("world.ledger")).unwrap(),
            "The kingdom endures."
        );
        // suffix is normalized
        assert_eq!(
            fs::read_to_string(dir.path().join("party.ledger")).unwrap(),
            "Korra joined."
        );
    }

    #[test]
    fn test_save_unfenced_fallback() {
        let dir = tempdir().unwrap();
        let store = store_with_reply(dir.path(), dir.path(), "");

        let reply = "FILE: world.ledger\nLine one.\nLine two.\nFILE: party.ledger\nBren fell.";
        assert_eq!(store.save_from_directives(reply), 2);

        assert_eq!(
            fs::read_to_string(dir.path().join("world.ledger")).unwrap(),
            "Line one.\nLine two."
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("party.ledger")).unwrap(),
            "Bren fell."
        );
    }

    #[test]
    fn test_fenced_wins_over_unfenced() {
        let dir = tempdir().unwrap();
        let store = store_with_reply(dir.path(), dir.path(), "");

        // The fenced block must not also be counted by the fallback scan
        let reply = "```FILE: world.ledger\nFenced content.\n```";
        assert_eq!(store.save_from_directives(reply), 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("world.ledger")).unwrap(),
            "Fenced content."
        );
    }

    #[test]
    fn test_path_separators_rejected() {
        let dir = tempdir().unwrap();
        let store = store_with_reply(dir.path(), dir.path(), "");

        let reply = "```FILE: ../escape.ledger\nnope\n```";
        assert_eq!(store.save_from_directives(reply), 0);
    }

    #[tokio::test]
    async fn test_update_round_trip() {
        let dir = tempdir().unwrap();
        let persona = tempdir().unwrap();
        fs::write(persona.path().join("architect_persona.md"), "You are the Architect.").unwrap();

        let store = store_with_reply(
            dir.path(),
            persona.path(),
            "```FILE: world.ledger\nThe dam broke.\n```",
        );
        store.update("- The dam broke").await;

        assert_eq!(
            fs::read_to_string(dir.path().join("world.ledger")).unwrap(),
            "The dam broke."
        );
    }

    #[tokio::test]
    async fn test_update_without_persona_is_noop() {
        let dir = tempdir().unwrap();
        let store = store_with_reply(dir.path(), &dir.path().join("nope"), "unused");
        store.update("- something").await;
        assert_eq!(store.load_all(), "");
    }

    #[test]
    fn test_character_name_lookup() {
        let dir = tempdir().unwrap();
        let party = "\
| Name | Player | Class |\n\
| **Korra** | <@12345> | Ranger |\n\
| Bren | @brenplayer | Cleric |\n";
        fs::write(dir.path().join("party.ledger"), party).unwrap();

        let store = store_with_reply(dir.path(), dir.path(), "");
        assert_eq!(store.character_name("12345", "whoever").as_deref(), Some("Korra"));
        assert_eq!(store.character_name("999", "brenplayer").as_deref(), Some("Bren"));
        assert!(store.character_name("999", "stranger").is_none());
    }

    #[test]
    fn test_character_sheet_extraction() {
        let dir = tempdir().unwrap();
        let party = "Party notes.\n```character_sheet[char_name=Korra]\nHP: 12\nClass: Ranger\n```";
        fs::write(dir.path().join("party.ledger"), party).unwrap();

        let store = store_with_reply(dir.path(), dir.path(), "");
        let sheet = store.character_sheet("Korra").expect("sheet found");
        assert!(sheet.contains("HP: 12"));
        assert!(store.character_sheet("Nobody").is_none());
    }

    #[test]
    fn test_record_feedback_parses_block() {
        let dir = tempdir().unwrap();
        let store = store_with_reply(dir.path(), dir.path(), "");

        let interpretation =
            "I understand.\n```FEEDBACK_UPDATE\n- Player enjoyed the dragon fight.\n```";
        store.record_feedback("TestUser", interpretation);

        let content = fs::read_to_string(dir.path().join("feedback.ledger")).unwrap();
        assert!(content.contains("from user TestUser"));
        assert!(content.contains("- Player enjoyed the dragon fight."));
        assert!(!content.contains("I understand."));
    }

    #[test]
    fn test_record_feedback_raw_fallback() {
        let dir = tempdir().unwrap();
        let store = store_with_reply(dir.path(), dir.path(), "");

        store.record_feedback("TestUser", "Just some words.");
        let content = fs::read_to_string(dir.path().join("feedback.ledger")).unwrap();
        assert!(content.contains("- [Raw Interpretation] Just some words."));
    }
}
