//! # Feedback Commands
//!
//! `/stars` (something you liked) and `/wishes` (something you want to
//! see). The GM persona interprets the feedback, which is then recorded to
//! the feedback ledger.

use crate::application::engine::NarrativeEngine;
use crate::application::memory::LedgerStore;
use crate::domain::traits::ChatProvider;
use crate::strings::messages;
use anyhow::Result;
use std::sync::Arc;

pub async fn handle_feedback(
    engine: &Arc<NarrativeEngine>,
    ledger: &Arc<LedgerStore>,
    chat: &impl ChatProvider,
    sender_name: &str,
    kind: &str,
    args: &str,
) -> Result<()> {
    let message = args.trim();
    if message.is_empty() {
        chat.send_notification(&format!("Usage: `/{kind}s <message>`"))
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        return Ok(());
    }

    let _ = chat.typing(true).await;
    let interpretation = engine.interpret_feedback(kind, message).await;
    let _ = chat.typing(false).await;

    chat.send_message(&messages::feedback_interpretation(kind, &interpretation))
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    ledger.record_feedback(sender_name, &interpretation);
    chat.send_notification(messages::FEEDBACK_RECORDED)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}
