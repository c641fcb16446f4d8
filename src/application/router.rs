//! # Command Router
//!
//! Routes incoming messages: slash commands go to the handlers in
//! `interface/commands`, table talk (OOC) is recorded but not narrated,
//! and everything else drives the narrative engine.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::application::engine::NarrativeEngine;
use crate::application::memory::LedgerStore;
use crate::application::presence::AwayManager;
use crate::application::rolls::PendingRollStore;
use crate::application::table::TableManager;
use crate::domain::config::AppConfig;
use crate::domain::traits::ChatProvider;
use crate::interface::commands;
use crate::strings::messages;

pub struct CommandRouter {
    config: AppConfig,
    engine: Arc<NarrativeEngine>,
    ledger: Arc<LedgerStore>,
    presence: Arc<Mutex<AwayManager>>,
    table: Arc<Mutex<TableManager>>,
    rolls: Arc<PendingRollStore>,
}

impl CommandRouter {
    pub fn new(
        config: AppConfig,
        engine: Arc<NarrativeEngine>,
        ledger: Arc<LedgerStore>,
        presence: Arc<Mutex<AwayManager>>,
        table: Arc<Mutex<TableManager>>,
        rolls: Arc<PendingRollStore>,
    ) -> Self {
        Self {
            config,
            engine,
            ledger,
            presence,
            table,
            rolls,
        }
    }

    /// Dispatch one inbound message. `cursor` is the transport's message
    /// position, recorded when a player goes away.
    pub async fn route<C>(
        &self,
        chat: &C,
        sender_id: &str,
        sender_name: &str,
        message: &str,
        cursor: i64,
    ) -> Result<()>
    where
        C: ChatProvider + Send + Sync,
    {
        let msg = message.trim();
        if msg.is_empty() {
            return Ok(());
        }

        if let Some(rest) = msg.strip_prefix('/') {
            let (cmd, args) = match rest.find(' ') {
                Some(idx) => (&rest[..idx], rest[idx + 1..].trim()),
                None => (rest, ""),
            };
            tracing::info!("Dispatching cmd='/{}' sender='{}'", cmd, sender_id);

            match cmd {
                "roll" => {
                    commands::roll::handle_roll(&self.rolls, chat, sender_name, args).await?;
                }
                "away" => {
                    commands::presence::handle_away(
                        &self.presence,
                        chat,
                        sender_id,
                        sender_name,
                        args,
                        cursor,
                    )
                    .await?;
                }
                "back" => {
                    commands::presence::handle_back(&self.presence, chat, sender_id, sender_name)
                        .await?;
                }
                "sheet" => {
                    commands::memory::handle_sheet(
                        &self.ledger,
                        chat,
                        sender_id,
                        sender_name,
                        self.config.system.message_limit,
                    )
                    .await?;
                }
                "ledger" => {
                    commands::memory::handle_ledger(
                        &self.ledger,
                        chat,
                        self.config.system.message_limit,
                    )
                    .await?;
                }
                "rewind" => {
                    commands::memory::handle_rewind(
                        &self.engine,
                        &self.ledger,
                        chat,
                        sender_name,
                        args,
                    )
                    .await?;
                }
                "reset_memory" => {
                    commands::memory::handle_reset_memory(
                        &self.config,
                        &self.engine,
                        &self.ledger,
                        chat,
                        sender_id,
                    )
                    .await?;
                }
                "session" => {
                    commands::session::handle_session(&self.table, chat, args).await?;
                }
                "ooc" => {
                    commands::misc::handle_ooc(&self.engine, chat, sender_name, args).await?;
                }
                "visual" => {
                    commands::misc::handle_visual(&self.engine, chat, sender_name, args).await?;
                }
                "x" => {
                    commands::misc::handle_x(&self.engine, chat, sender_name, args).await?;
                }
                "stars" => {
                    commands::feedback::handle_feedback(
                        &self.engine,
                        &self.ledger,
                        chat,
                        sender_name,
                        "star",
                        args,
                    )
                    .await?;
                }
                "wishes" => {
                    commands::feedback::handle_feedback(
                        &self.engine,
                        &self.ledger,
                        chat,
                        sender_name,
                        "wish",
                        args,
                    )
                    .await?;
                }
                "help" => {
                    commands::misc::handle_help(chat).await?;
                }
                _ => {
                    let _ = chat.send_notification(messages::UNKNOWN_COMMAND).await;
                }
            }
            return Ok(());
        }

        // Table talk stays out of the narrative but the GM still sees it
        if msg.starts_with('(') || msg.starts_with("[OOC]") {
            self.engine.note_event(&format!("{sender_name}: {msg}")).await;
            return Ok(());
        }

        self.engine.handle_message(chat, sender_name, msg).await
    }
}
