//! # Presence Commands
//!
//! `/away <mode>` and `/back`.

use crate::application::presence::AwayManager;
use crate::domain::traits::ChatProvider;
use crate::domain::types::AwayMode;
use crate::strings::messages;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;

pub async fn handle_away(
    presence: &Arc<Mutex<AwayManager>>,
    chat: &impl ChatProvider,
    sender_id: &str,
    sender_name: &str,
    args: &str,
    cursor: i64,
) -> Result<()> {
    let mode = args.trim();
    let success = presence.lock().await.set_away(sender_id, mode, cursor);

    if success {
        chat.send_message(&messages::away_set(sender_name, mode))
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
    } else {
        let valid = AwayMode::ALL
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        chat.send_notification(&messages::away_failed(&valid))
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
    }
    Ok(())
}

pub async fn handle_back(
    presence: &Arc<Mutex<AwayManager>>,
    chat: &impl ChatProvider,
    sender_id: &str,
    sender_name: &str,
) -> Result<()> {
    let record = presence.lock().await.return_user(sender_id);

    match record {
        Some(_) => {
            chat.send_notification(&messages::welcome_back(sender_name))
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            chat.send_message(&messages::user_returned(sender_name))
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
        }
        None => {
            chat.send_notification(messages::NOT_AWAY)
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
        }
    }
    Ok(())
}
