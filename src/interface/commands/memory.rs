//! # Memory Commands
//!
//! `/sheet`, `/ledger`, `/rewind`, and the admin-only `/reset_memory`.

use crate::application::chunker::smart_chunk_text;
use crate::application::engine::NarrativeEngine;
use crate::application::memory::LedgerStore;
use crate::domain::config::AppConfig;
use crate::domain::traits::ChatProvider;
use crate::strings::messages;
use anyhow::Result;
use std::sync::Arc;

pub async fn handle_sheet(
    ledger: &Arc<LedgerStore>,
    chat: &impl ChatProvider,
    sender_id: &str,
    sender_name: &str,
    limit: usize,
) -> Result<()> {
    let Some(name) = ledger.character_name(sender_id, sender_name) else {
        chat.send_notification(messages::CHARACTER_NOT_FOUND)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        return Ok(());
    };

    match ledger.character_sheet(&name) {
        Some(sheet) => {
            let clipped: String = sheet.chars().take(limit).collect();
            chat.send_message(&messages::sheet_block(&clipped))
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
        }
        None => {
            chat.send_notification(&messages::sheet_not_found(&name))
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
        }
    }
    Ok(())
}

pub async fn handle_ledger(
    ledger: &Arc<LedgerStore>,
    chat: &impl ChatProvider,
    limit: usize,
) -> Result<()> {
    let content = ledger.load_all();
    if content.trim().is_empty() {
        chat.send_notification(messages::LEDGER_EMPTY)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        return Ok(());
    }

    for chunk in smart_chunk_text(&content, limit) {
        if !chunk.trim().is_empty() {
            chat.send_message(&chunk)
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
        }
    }
    Ok(())
}

/// Reverse the facts recorded by the most recent model response, then post
/// a system event redirecting the narrative.
pub async fn handle_rewind(
    engine: &Arc<NarrativeEngine>,
    ledger: &Arc<LedgerStore>,
    chat: &impl ChatProvider,
    sender_name: &str,
    args: &str,
) -> Result<()> {
    match engine.take_last_facts().await {
        Some(facts) => ledger.reverse(&facts).await,
        None => {
            chat.send_notification(messages::NOTHING_TO_REWIND)
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
        }
    }

    let event = messages::rewind_event(sender_name, args.trim());
    engine.note_event(&event).await;
    chat.send_message(&event)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    chat.send_notification(messages::REWOUND)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}

pub async fn handle_reset_memory(
    config: &AppConfig,
    engine: &Arc<NarrativeEngine>,
    ledger: &Arc<LedgerStore>,
    chat: &impl ChatProvider,
    sender_id: &str,
) -> Result<()> {
    if !config.system.admin.iter().any(|a| a == sender_id) {
        chat.send_notification(messages::NOT_ADMIN)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        return Ok(());
    }

    let history = engine.history_text().await;
    let count = ledger.rebuild_from_history(&history).await;
    chat.send_message(&messages::memory_rebuilt(count))
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}
