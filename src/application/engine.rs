//! # Narrative Engine
//!
//! Orchestrates one inbound chat message: assemble model context (persona,
//! knowledge, ledger aggregate, away roster), call the model, run the
//! protocol parser, dispatch side effects, chunk, and send. The ledger
//! update is fire-and-forget relative to message delivery but is always
//! initiated before the handler returns.

use anyhow::Result;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::application::chunker::smart_chunk_text;
use crate::application::loader;
use crate::application::memory::LedgerStore;
use crate::application::parser::ResponseParser;
use crate::application::presence::AwayManager;
use crate::application::rolls::PendingRollStore;
use crate::application::table::TableManager;
use crate::domain::config::AppConfig;
use crate::domain::traits::{ChatProvider, LlmProvider, MediaProvider};
use crate::domain::types::ChatTurn;
use crate::strings::{messages, prompts};

pub struct NarrativeEngine {
    config: AppConfig,
    llm: Arc<dyn LlmProvider>,
    ledger: Arc<LedgerStore>,
    presence: Arc<Mutex<AwayManager>>,
    table: Arc<Mutex<TableManager>>,
    parser: ResponseParser,
    media: Option<Arc<dyn MediaProvider>>,
    history: Mutex<VecDeque<ChatTurn>>,
    last_facts: Mutex<Option<String>>,
}

impl NarrativeEngine {
    pub fn new(
        config: AppConfig,
        llm: Arc<dyn LlmProvider>,
        ledger: Arc<LedgerStore>,
        presence: Arc<Mutex<AwayManager>>,
        table: Arc<Mutex<TableManager>>,
        rolls: Arc<PendingRollStore>,
        media: Option<Arc<dyn MediaProvider>>,
    ) -> Self {
        Self {
            config,
            llm,
            ledger,
            presence,
            table,
            parser: ResponseParser::new(rolls),
            media,
            history: Mutex::new(VecDeque::new()),
            last_facts: Mutex::new(None),
        }
    }

    /// Record a system event (OOC traffic, rewinds, safety tools) so the
    /// model sees it on its next turn without triggering narration now.
    pub async fn note_event(&self, text: &str) {
        self.push_history(ChatTurn::user(text)).await;
    }

    /// Flattened conversation history, for the memory rebuild command.
    pub async fn history_text(&self) -> String {
        let history = self.history.lock().await;
        history
            .iter()
            .map(|turn| turn.content.clone())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Take the facts extracted from the most recent response, for rewind.
    pub async fn take_last_facts(&self) -> Option<String> {
        self.last_facts.lock().await.take()
    }

    async fn push_history(&self, turn: ChatTurn) {
        let mut history = self.history.lock().await;
        history.push_back(turn);
        let limit = self.config.system.history_limit.max(2);
        while history.len() > limit {
            history.pop_front();
        }
    }

    /// Handle one inbound narrative message end to end.
    pub async fn handle_message(
        &self,
        chat: &impl ChatProvider,
        author_name: &str,
        content: &str,
    ) -> Result<()> {
        if self.table.lock().await.is_paused() {
            tracing::debug!("Session paused, ignoring narrative input from {}", author_name);
            return Ok(());
        }

        self.push_history(ChatTurn::user(format!("{author_name}: {content}")))
            .await;

        let _ = chat.typing(true).await;

        let system_instruction = self.build_system_instruction().await;
        let history: Vec<ChatTurn> = self.history.lock().await.iter().cloned().collect();
        let gm = self.config.system.gm_agent.clone();
        let temperature = self
            .config
            .agents
            .get(&gm)
            .and_then(|a| a.temperature)
            .unwrap_or(0.7);

        let response = match self
            .llm
            .generate(&gm, &system_instruction, &history, temperature)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                let _ = chat.typing(false).await;
                tracing::error!("Model call failed: {}", e);
                let _ = chat.send_notification(&messages::llm_error(&e)).await;
                return Ok(());
            }
        };

        let away = self.presence.lock().await.all_away();
        let mut parsed = self.parser.process(&response, &away);

        // One condensed retry when the narrative alone exceeds the
        // transport limit; chunking remains the fallback.
        let limit = self.config.system.message_limit;
        let text_len = parsed.text.chars().count();
        if text_len > limit {
            tracing::warn!("Output too long ({} chars). Attempting condensed retry...", text_len);
            let mut retry_history = history.clone();
            retry_history.push(ChatTurn::model(response.clone()));
            retry_history.push(ChatTurn::user(prompts::length_correction(text_len, limit)));

            match self
                .llm
                .generate(&gm, &system_instruction, &retry_history, temperature)
                .await
            {
                Ok(retry) if !retry.trim().is_empty() => {
                    parsed = self.parser.process(&retry, &away);
                }
                Ok(_) => {}
                Err(e) => tracing::error!("Condensed retry failed: {}", e),
            }
        }

        self.push_history(ChatTurn::model(parsed.text.clone())).await;

        if let Some(change) = &parsed.state_change {
            self.table.lock().await.set_state(change.state);
            let _ = chat
                .send_notification(&messages::table_state_directive(change.state, &change.reason))
                .await;
        }

        for chunk in smart_chunk_text(&parsed.text, limit) {
            if !chunk.trim().is_empty() {
                chat.send_message(&chunk)
                    .await
                    .map_err(|e| anyhow::anyhow!(e))?;
            }
        }

        if let Some(facts) = &parsed.facts {
            *self.last_facts.lock().await = Some(facts.clone());
            let ledger = self.ledger.clone();
            let facts = facts.clone();
            tokio::spawn(async move {
                ledger.update(&facts).await;
            });
        }

        if let Some(prompt) = &parsed.visual_prompt {
            self.handle_visual(chat, prompt).await;
        }

        for item in &parsed.feedback {
            let interpretation = self.interpret_feedback(&item.kind, &item.content).await;
            let _ = chat
                .send_message(&messages::implicit_feedback(
                    &item.user,
                    &item.kind,
                    &item.content,
                    &interpretation,
                ))
                .await;
            self.ledger.record_feedback(&item.user, &interpretation);
        }

        let _ = chat.typing(false).await;
        Ok(())
    }

    /// Ask the GM persona to interpret a piece of player feedback. Used for
    /// both explicit `/stars`/`/wishes` and implicit detection.
    pub async fn interpret_feedback(&self, kind: &str, message: &str) -> String {
        let system_instruction = loader::load_system_instruction(
            Path::new(&self.config.system.persona_dir),
            Path::new(&self.config.system.knowledge_dir),
        );
        let prompt = prompts::feedback_interpretation(kind, message);

        match self
            .llm
            .generate(
                &self.config.system.gm_agent,
                &system_instruction,
                &[ChatTurn::user(prompt)],
                0.7,
            )
            .await
        {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::error!("Feedback interpretation error: {}", e);
                "Sorry, I had trouble understanding that. Please try again.".to_string()
            }
        }
    }

    async fn build_system_instruction(&self) -> String {
        let base = loader::load_system_instruction(
            Path::new(&self.config.system.persona_dir),
            Path::new(&self.config.system.knowledge_dir),
        );

        let mut sections = vec![base, prompts::campaign_state_section(&self.ledger.load_all())];

        let away = self.presence.lock().await.all_away();
        if !away.is_empty() {
            let mut entries: Vec<(String, String)> = away
                .iter()
                .map(|(user, record)| (user.clone(), record.mode.as_str().to_string()))
                .collect();
            entries.sort();
            sections.push(prompts::away_roster_section(&entries));
        }

        sections.join("\n\n")
    }

    /// Render the visual prompt through the media adapter, degrading to a
    /// text-only system event on any failure.
    async fn handle_visual(&self, chat: &impl ChatProvider, prompt: &str) {
        let Some(media) = &self.media else {
            let _ = chat.send_notification(&messages::visual_triggered(prompt)).await;
            return;
        };

        match media.generate_image(prompt).await {
            Ok(bytes) => {
                let dir = Path::new(&self.config.system.media_dir);
                let filename = format!("visual_{}.png", chrono::Utc::now().timestamp());
                let path = dir.join(&filename);
                let saved = std::fs::create_dir_all(dir)
                    .and_then(|_| std::fs::write(&path, &bytes));
                match saved {
                    Ok(()) => {
                        let _ = chat
                            .send_notification(&messages::visual_saved(&path.display().to_string()))
                            .await;
                    }
                    Err(e) => {
                        tracing::error!("Failed to store rendered visual: {}", e);
                        let _ = chat.send_notification(&messages::visual_triggered(prompt)).await;
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Image generation failed: {}", e);
                let _ = chat.send_notification(&messages::visual_triggered(prompt)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::{AppConfig, MatrixConfig, ServicesConfig, SystemConfig};
    use crate::domain::types::{TableState, TurnRole};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct StubLlm {
        reply: String,
        calls: AtomicUsize,
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
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
    }

    #[derive(Default)]
    struct StubChat {
        sent: std::sync::Mutex<Vec<String>>,
        notices: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatProvider for StubChat {
        async fn send_message(&self, content: &str) -> Result<String, String> {
            self.sent.lock().unwrap().push(content.to_string());
            Ok("event-id".to_string())
        }
        async fn send_notification(&self, content: &str) -> Result<(), String> {
            self.notices.lock().unwrap().push(content.to_string());
            Ok(())
        }
        async fn typing(&self, _active: bool) -> Result<(), String> {
            Ok(())
        }
        fn room_id(&self) -> String {
            "test-room".to_string()
        }
    }

    struct Fixture {
        engine: NarrativeEngine,
        llm: Arc<StubLlm>,
        table: Arc<Mutex<TableManager>>,
        _dir: TempDir,
    }

    fn fixture(reply: &str) -> Fixture {
        let dir = TempDir::new().unwrap();
        let base = dir.path();

        let config = AppConfig {
            services: ServicesConfig {
                matrix: MatrixConfig {
                    username: "gm".into(),
                    password: "secret".into(),
                    homeserver: "https://example.org".into(),
                    room: None,
                },
            },
            agents: Default::default(),
            system: SystemConfig {
                memory_dir: base.join("memory").display().to_string(),
                knowledge_dir: base.join("knowledge").display().to_string(),
                persona_dir: base.join("persona").display().to_string(),
                away_file: base.join("away.json").display().to_string(),
                table_file: base.join("table.json").display().to_string(),
                media_dir: base.join("media").display().to_string(),
                ..Default::default()
            },
            media: None,
        };

        let llm = Arc::new(StubLlm {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        });
        let ledger = Arc::new(LedgerStore::new(
            &config.system.memory_dir,
            &config.system.persona_dir,
            llm.clone(),
            "architect",
        ));
        let presence = Arc::new(Mutex::new(AwayManager::new(&config.system.away_file)));
        let table = Arc::new(Mutex::new(TableManager::new(&config.system.table_file)));
        let rolls = Arc::new(PendingRollStore::new());

        let engine = NarrativeEngine::new(
            config,
            llm.clone(),
            ledger,
            presence,
            table.clone(),
            rolls,
            None,
        );

        Fixture {
            engine,
            llm,
            table,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_narrative_flow_sends_cleaned_text() {
        let fx = fixture("The wind howls over the pass.");
        let chat = StubChat::default();

        fx.engine.handle_message(&chat, "Alice", "We march north.").await.unwrap();

        let sent = chat.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], "The wind howls over the pass.");
    }

    #[tokio::test]
    async fn test_paused_session_suppresses_narration() {
        let fx = fixture("Should never be narrated.");
        fx.table.lock().await.set_state(TableState::Paused);
        let chat = StubChat::default();

        fx.engine.handle_message(&chat, "Alice", "hello?").await.unwrap();

        assert!(chat.sent.lock().unwrap().is_empty());
        assert_eq!(fx.llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_state_directive_applied_and_announced() {
        let fx = fixture(
            "The chapter closes.\n```TABLE_STATE\nstate: DEBRIEF\nreason: Cliffhanger\n```",
        );
        let chat = StubChat::default();

        fx.engine.handle_message(&chat, "Alice", "and then?").await.unwrap();

        assert_eq!(fx.table.lock().await.get_state(), TableState::Debrief);
        let notices = chat.notices.lock().unwrap();
        assert!(notices.iter().any(|n| n.contains("DEBRIEF")));
    }

    #[tokio::test]
    async fn test_memory_update_initiated() {
        let fx = fixture("Done.\n```MEMORY_UPDATE\n- The bridge is out\n```");
        let chat = StubChat::default();

        fx.engine.handle_message(&chat, "Alice", "cross it").await.unwrap();

        assert_eq!(
            fx.engine.take_last_facts().await.as_deref(),
            Some("- The bridge is out")
        );
        let sent = chat.sent.lock().unwrap();
        assert!(sent.iter().all(|m| !m.contains("MEMORY_UPDATE")));
    }

    #[tokio::test]
    async fn test_visual_prompt_degrades_to_text() {
        let fx = fixture("Behold.\n```VISUAL_PROMPT\n[a ruined keep]\n```");
        let chat = StubChat::default();

        fx.engine.handle_message(&chat, "Alice", "look").await.unwrap();

        let notices = chat.notices.lock().unwrap();
        assert!(notices.iter().any(|n| n.contains("Visual Prompt triggered")));
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let fx = fixture("Noted.");
        let chat = StubChat::default();

        for i in 0..40 {
            fx.engine
                .handle_message(&chat, "Alice", &format!("turn {i}"))
                .await
                .unwrap();
        }

        let history = fx.engine.history.lock().await;
        assert!(history.len() <= 15);
        assert!(matches!(history.back().unwrap().role, TurnRole::Model));
    }
}
