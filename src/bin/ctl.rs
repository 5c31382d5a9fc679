use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::time::Duration;

use vmbot::features::get_bot_version;
use vmbot::ipc::{connect_with_retry, get_socket_path, BotEvent};

#[derive(Parser)]
#[command(name = "vmbot-ctl")]
#[command(version = get_bot_version())]
#[command(about = "Control a running vmbot over its IPC socket")]
struct Cli {
    /// Control socket path (defaults to VMBOT_IPC_SOCKET or /tmp/vmbot.sock)
    #[arg(long)]
    socket: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which endpoints are connected
    Status,
    /// Reload emojis from the database now
    Refresh,
    /// Connect an endpoint that is not currently connected
    Connect { node: String },
    /// Add an emoji and enable it on one or more nodes
    AddEmoji {
        name: String,
        url: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Node to enable the emoji on (repeatable)
        #[arg(long = "node", required = true)]
        nodes: Vec<String>,
    },
    /// Delete an emoji from every node
    DeleteEmoji { name: String },
    /// Register a chat user so their emoji usage is recorded
    AddUser { username: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let socket = cli.socket.unwrap_or_else(get_socket_path);
    let mut client = connect_with_retry(&socket, 3, Duration::from_millis(500)).await?;

    let reply = match cli.command {
        Commands::Status => client.status().await?,
        Commands::Refresh => client.refresh_emojis().await?,
        Commands::Connect { node } => client.connect_node(node).await?,
        Commands::AddEmoji {
            name,
            url,
            description,
            nodes,
        } => client.create_emoji(name, url, description, nodes).await?,
        Commands::DeleteEmoji { name } => client.delete_emoji(name).await?,
        Commands::AddUser { username } => client.add_user(username).await?,
    };

    match reply {
        BotEvent::StatusUpdate {
            endpoints,
            uptime_seconds,
        } => {
            println!("Uptime: {}", format_uptime(uptime_seconds));
            for (node, connected) in endpoints {
                let state = if connected { "connected" } else { "disconnected" };
                println!("  {node}: {state}");
            }
            Ok(())
        }
        BotEvent::CommandResponse {
            success, message, ..
        } => {
            let message = message.unwrap_or_default();
            if success {
                println!("{message}");
                Ok(())
            } else {
                Err(anyhow!("{message}"))
            }
        }
    }
}

fn format_uptime(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    format!("{hours}h {minutes}m {}s", seconds % 60)
}
