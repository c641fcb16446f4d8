//! # Session Command
//!
//! `/session <start|zero|pause|resume|end|close>` - operator control over
//! the high-level session phase.

use crate::application::table::TableManager;
use crate::domain::traits::ChatProvider;
use crate::domain::types::TableState;
use crate::strings::messages;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;

pub async fn handle_session(
    table: &Arc<Mutex<TableManager>>,
    chat: &impl ChatProvider,
    args: &str,
) -> Result<()> {
    // Bare /session reports the current phase
    if args.trim().is_empty() {
        let status = {
            let table = table.lock().await;
            messages::session_status(
                table.get_state(),
                table.is_narrative_active(),
                table.last_updated(),
            )
        };
        chat.send_message(&status)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        return Ok(());
    }

    let (target, msg): (TableState, &str) = match args.trim().to_lowercase().as_str() {
        "start" => (
            TableState::Active,
            "⚔️ **The Session Begins!** Narrative engine is now ACTIVE.",
        ),
        "zero" => (
            TableState::SessionZero,
            "🗺️ **Session Zero Started.** Focus shifted to world-building and character creation.",
        ),
        "pause" => (
            TableState::Paused,
            "⏸️ **Session Paused.** The world is frozen in place. (Narrative engine suspended)",
        ),
        "resume" => (
            TableState::Active,
            "▶️ **Session Resumed.** Welcome back to the story!",
        ),
        "end" => (
            TableState::Debrief,
            "🕯️ **Session Ended.** Entering Debrief phase. Please share your `/stars` and `/wishes`!",
        ),
        "close" => (
            TableState::Idle,
            "💤 **Table Closed.** The bot is now idle. See you next time!",
        ),
        _ => {
            chat.send_notification(messages::INVALID_SESSION_STATE)
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            return Ok(());
        }
    };

    table.lock().await.set_state(target);
    chat.send_message(msg).await.map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}
