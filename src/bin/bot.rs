use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info};
use std::sync::Arc;

use vmbot::commands::{CommandContext, CommandHandler};
use vmbot::connection::{RetryPolicy, Supervisor};
use vmbot::core::Config;
use vmbot::database::{Database, EmojiStore};
use vmbot::features::analytics::UsageTracker;
use vmbot::features::emojis::{EmojiDirectory, REFRESH_INTERVAL};
use vmbot::features::get_bot_version;
use vmbot::ipc::{get_socket_path, IpcServer};
use vmbot::rate_limiter::RateLimiter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting vmbot {} as {}...", get_bot_version(), config.username);
    info!(
        "Auth scheme: {} | Prefix: {} | Shorthand: {} | Endpoints: {}",
        config.auth.scheme_name(),
        config.command_prefix,
        config.emoji_shorthand,
        config.endpoints.len()
    );

    let database = Database::new(&config.database_path).await?;
    let store: Arc<dyn EmojiStore> = Arc::new(database.clone());

    // Load every node's emojis before any connection can ask for them
    let nodes = config.endpoints.iter().map(|e| e.node.clone()).collect();
    let directory = EmojiDirectory::new(store.clone(), nodes);
    directory.refresh().await;
    tokio::spawn(directory.clone().run_refresh_loop(REFRESH_INTERVAL));

    let usage_tracker = UsageTracker::new(store);
    let context = CommandContext::new(
        directory.clone(),
        usage_tracker,
        config.command_prefix.clone(),
        config.emoji_shorthand,
    );
    let command_handler = CommandHandler::new(context, RateLimiter::default())?;

    let supervisor = Supervisor::new(&config, command_handler, RetryPolicy::default());

    let ipc_server = Arc::new(IpcServer::new(
        get_socket_path(),
        supervisor.clone(),
        directory,
        database,
    ));
    if let Err(e) = ipc_server.start().await {
        error!("Failed to start IPC server: {e:#}. vmbot-ctl will be unavailable.");
    } else {
        info!("📡 IPC server started");
    }

    let starter = supervisor.clone();
    tokio::spawn(async move {
        starter.start().await;
    });

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, shutting down...");
    supervisor.shutdown().await;
    info!("All connections closed");

    Ok(())
}
