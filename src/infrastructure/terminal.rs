//! # Terminal Mode
//!
//! Interactive console loop for manual testing of the model-call path
//! without a Matrix connection. Implements `ChatProvider` over stdout.

use crate::application::engine::NarrativeEngine;
use crate::domain::traits::ChatProvider;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

pub struct ConsoleService;

#[async_trait]
impl ChatProvider for ConsoleService {
    fn room_id(&self) -> String {
        "terminal".to_string()
    }

    async fn send_message(&self, content: &str) -> Result<String, String> {
        println!("\n{content}");
        Ok("console".to_string())
    }

    async fn send_notification(&self, content: &str) -> Result<(), String> {
        println!("\n[{content}]");
        Ok(())
    }

    async fn typing(&self, active: bool) -> Result<(), String> {
        if active {
            println!("🤖 GM is typing...");
        }
        Ok(())
    }
}

/// Run the interactive terminal loop until EOF or an exit command.
pub async fn run(engine: Arc<NarrativeEngine>) -> Result<()> {
    println!("🎮 Terminal Mode");
    println!("--------------------------------------------------");
    println!("Type your message to interact. Type 'exit' to quit.");
    println!("--------------------------------------------------");

    use std::io::Write as _;

    let chat = ConsoleService;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("\nUser [@Terminal]: ");
        let _ = std::io::stdout().flush();

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();

        if input.is_empty() {
            continue;
        }
        if matches!(input.to_lowercase().as_str(), "exit" | "quit") {
            println!("👋 Session ended.");
            break;
        }

        if let Err(e) = engine.handle_message(&chat, "Terminal", input).await {
            tracing::error!("Terminal turn failed: {}", e);
            println!("❌ Error: {e}");
        }
    }

    Ok(())
}
