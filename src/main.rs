#![recursion_limit = "256"]
//! # Main Entry Point
//!
//! Initializes the game master:
//! - Domain: Configuration and Types
//! - Infrastructure: Matrix, LLM, Media, Terminal
//! - Application: Engine, Router, Parser, Stores
//! - Interface: Command Handlers

mod application;
mod domain;
mod infrastructure;
mod interface;
mod strings;

use anyhow::{Context as _, Result};
use clap::Parser;
use matrix_sdk::{
    config::SyncSettings,
    room::Room,
    ruma::events::room::{
        member::{MembershipState, StrippedRoomMemberEvent},
        message::{MessageType, SyncRoomMessageEvent},
    },
    Client,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::application::engine::NarrativeEngine;
use crate::application::memory::LedgerStore;
use crate::application::presence::AwayManager;
use crate::application::rolls::PendingRollStore;
use crate::application::router::CommandRouter;
use crate::application::table::TableManager;
use crate::domain::config::AppConfig;
use crate::domain::traits::LlmProvider;
use crate::infrastructure::llm::Client as LlmClient;
use crate::infrastructure::matrix::MatrixService;
use crate::infrastructure::{media, terminal};

#[derive(Parser)]
#[command(name = "loremaster", about = "Chat-driven narrative game master")]
struct Cli {
    /// Run the interactive terminal loop instead of connecting to Matrix
    #[arg(long)]
    terminal: bool,

    /// Path to the configuration file
    #[arg(long)]
    config: Option<String>,
}

fn resolve_config_path(explicit: Option<&str>) -> PathBuf {
    if let Some(path) = explicit {
        return PathBuf::from(path);
    }
    let local = PathBuf::from("data/config.yaml");
    if local.exists() {
        return local;
    }
    if let Some(config_dir) = dirs::config_dir() {
        let user = config_dir.join("loremaster").join("config.yaml");
        if user.exists() {
            return user;
        }
    }
    local
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load Configuration
    let config_path = resolve_config_path(cli.config.as_deref());
    let config_content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;
    let config: AppConfig =
        serde_yaml::from_str(&config_content).context("Failed to parse config.yaml")?;

    // 2. Logging Setup
    if !std::path::Path::new("data").exists() {
        fs::create_dir("data").context("Failed to create data directory")?;
    }

    // Clear previous session log
    let log_path = std::path::Path::new("data/session.log");
    if log_path.exists() {
        let _ = fs::remove_file(log_path);
    }

    let file_appender = tracing_appender::rolling::never("data", "session.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(
            "info,matrix_sdk=warn,matrix_sdk_base=warn,matrix_sdk_crypto=error,ruma=warn,hyper=warn",
        )
    });

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);
    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);

    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    tracing::info!("Starting Loremaster...");

    // 3. Initialize Components
    let rolls = Arc::new(PendingRollStore::new());
    let presence = Arc::new(Mutex::new(AwayManager::new(&config.system.away_file)));
    let table = Arc::new(Mutex::new(TableManager::new(&config.system.table_file)));
    let llm: Arc<dyn LlmProvider> = Arc::new(LlmClient::new(config.clone()));
    let ledger = Arc::new(LedgerStore::new(
        &config.system.memory_dir,
        &config.system.persona_dir,
        llm.clone(),
        config.system.architect_agent.clone(),
    ));
    let media = media::from_config(&config.media);

    let engine = Arc::new(NarrativeEngine::new(
        config.clone(),
        llm.clone(),
        ledger.clone(),
        presence.clone(),
        table.clone(),
        rolls.clone(),
        media,
    ));

    // 4. Terminal Mode (manual testing of the model-call path)
    if cli.terminal {
        return terminal::run(engine).await;
    }

    let router = Arc::new(CommandRouter::new(
        config.clone(),
        engine,
        ledger,
        presence,
        table,
        rolls,
    ));

    // 5. Matrix Setup
    let client = Client::builder()
        .homeserver_url(&config.services.matrix.homeserver)
        .build()
        .await?;

    client
        .matrix_auth()
        .login_username(
            &config.services.matrix.username,
            &config.services.matrix.password,
        )
        .send()
        .await?;

    tracing::info!("Logged in as {}", config.services.matrix.username);

    // 6. Event Loop
    let start_time = std::time::SystemTime::now();
    let loop_router = router.clone();
    let allowed_room = config.services.matrix.room.clone();

    client.add_event_handler(move |ev: SyncRoomMessageEvent, room: Room| {
        let router = loop_router.clone();
        let allowed_room = allowed_room.clone();

        async move {
            let Some(original_msg) = ev.as_original() else {
                return;
            };

            // Ignore events older than start_time
            let ts = ev.origin_server_ts();
            let event_time =
                std::time::UNIX_EPOCH + std::time::Duration::from_millis(ts.get().into());
            if event_time < start_time {
                return;
            }

            if let Some(allowed) = &allowed_room {
                if room.room_id().as_str() != allowed {
                    return;
                }
            }

            if original_msg.sender == room.own_user_id() {
                return;
            }

            let MessageType::Text(text_content) = &original_msg.content.msgtype else {
                return;
            };
            let body = text_content.body.clone();
            let sender_id = original_msg.sender.to_string();
            let sender_name = original_msg.sender.localpart().to_string();
            let cursor = u64::from(ts.get()) as i64;

            tracing::info!("Received message from {}: {}", sender_id, body);

            let chat = MatrixService::new(room);
            if let Err(e) = router
                .route(&chat, &sender_id, &sender_name, &body, cursor)
                .await
            {
                tracing::error!("Failed to route message: {}", e);
            }
        }
    });

    // Handle Invites
    client.add_event_handler(|ev: StrippedRoomMemberEvent, room: Room| async move {
        if ev.content.membership == MembershipState::Invite {
            let _ = room.join().await;
        }
    });

    // 7. Sync Loop
    client.sync(SyncSettings::default()).await?;

    Ok(())
}
