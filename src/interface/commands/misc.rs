//! # Miscellaneous Commands
//!
//! `/ooc`, `/visual`, `/x`, and `/help`. The system-event commands post a
//! bracketed event the model sees on its next turn.

use crate::application::engine::NarrativeEngine;
use crate::domain::traits::ChatProvider;
use crate::strings::{help, messages};
use anyhow::Result;
use std::sync::Arc;

pub async fn handle_ooc(
    engine: &Arc<NarrativeEngine>,
    chat: &impl ChatProvider,
    sender_name: &str,
    args: &str,
) -> Result<()> {
    let msg = messages::ooc(sender_name, args.trim());
    engine.note_event(&msg).await;
    chat.send_message(&msg).await.map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}

pub async fn handle_visual(
    engine: &Arc<NarrativeEngine>,
    chat: &impl ChatProvider,
    sender_name: &str,
    args: &str,
) -> Result<()> {
    let prompt = args.trim();
    let event = messages::visual_requested(sender_name, (!prompt.is_empty()).then_some(prompt));
    engine.note_event(&event).await;
    chat.send_message(&event)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}

pub async fn handle_x(
    engine: &Arc<NarrativeEngine>,
    chat: &impl ChatProvider,
    sender_name: &str,
    args: &str,
) -> Result<()> {
    let reason = args.trim();
    chat.send_message(messages::X_CARD_PIVOT)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    let event = messages::x_card_event(sender_name, (!reason.is_empty()).then_some(reason));
    engine.note_event(&event).await;
    chat.send_message(&event)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}

pub async fn handle_help(chat: &impl ChatProvider) -> Result<()> {
    chat.send_message(help::HELP_TEXT)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}
