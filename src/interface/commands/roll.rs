//! # Roll Command
//!
//! `/roll <notation>` executes dice directly; bare `/roll` executes the
//! caller's pending roll call, if one is queued.

use crate::application::dice;
use crate::application::rolls::PendingRollStore;
use crate::domain::traits::ChatProvider;
use crate::strings::messages;
use anyhow::Result;
use std::sync::Arc;

pub async fn handle_roll(
    rolls: &Arc<PendingRollStore>,
    chat: &impl ChatProvider,
    sender_name: &str,
    args: &str,
) -> Result<()> {
    let args = args.trim();

    if args.is_empty() {
        let Some(pending) = rolls.get(sender_name) else {
            chat.send_notification(messages::NO_PENDING_ROLL)
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            return Ok(());
        };

        tracing::debug!(
            "Executing pending roll for {} queued at {}",
            sender_name,
            pending.timestamp
        );
        let result = dice::roll(&pending.notation);
        if let Some(err) = result.error {
            // Keep the pending entry so a fixed roll call can replace it
            chat.send_notification(&messages::invalid_pending_roll(&err))
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            return Ok(());
        }

        rolls.take(sender_name);
        chat.send_message(&messages::roll_announcement_with_reason(
            sender_name,
            &pending.notation,
            &pending.reason,
            &result.formatted,
        ))
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
        return Ok(());
    }

    let result = dice::roll(args);
    match &result.error {
        Some(err) => {
            chat.send_notification(&messages::invalid_notation(err))
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
        }
        None => {
            chat.send_message(&messages::roll_announcement(
                sender_name,
                &result.notation,
                &result.formatted,
            ))
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        }
    }
    Ok(())
}
