//! # IPC Server
//!
//! Unix socket server through which operators manage the running bot.
//!
//! - **Version**: 2.0.0
//! - **Since**: 1.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Request/response control commands for emojis and connections
//! - 1.0.0: Initial IPC implementation with Unix socket protocol

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::RwLock;

use crate::connection::Supervisor;
use crate::database::Database;
use crate::features::emojis::EmojiDirectory;
use crate::ipc::protocol::{encode_message, read_message, BotEvent, ControlCommand};

/// Maximum number of connected control clients
const MAX_CLIENTS: usize = 10;

/// IPC Server handle for the bot
pub struct IpcServer {
    socket_path: String,
    supervisor: Supervisor,
    directory: EmojiDirectory,
    database: Database,
    /// Connected client count
    client_count: Arc<RwLock<usize>>,
}

impl IpcServer {
    /// Create a new IPC server (does not start listening yet)
    pub fn new(
        socket_path: impl Into<String>,
        supervisor: Supervisor,
        directory: EmojiDirectory,
        database: Database,
    ) -> Self {
        IpcServer {
            socket_path: socket_path.into(),
            supervisor,
            directory,
            database,
            client_count: Arc::new(RwLock::new(0)),
        }
    }

    /// Bind the socket and serve clients in a background task
    pub async fn start(self: Arc<Self>) -> Result<()> {
        // Remove existing socket file if it exists
        if std::path::Path::new(&self.socket_path).exists() {
            std::fs::remove_file(&self.socket_path)
                .with_context(|| format!("Failed to remove stale socket {}", self.socket_path))?;
        }

        let listener = UnixListener::bind(&self.socket_path)
            .with_context(|| format!("Failed to bind {}", self.socket_path))?;
        info!("IPC server listening on {}", self.socket_path);

        let server = self.clone();
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _addr)) => {
                        let client_count = *server.client_count.read().await;
                        if client_count >= MAX_CLIENTS {
                            warn!("Maximum IPC clients reached ({MAX_CLIENTS}), rejecting connection");
                            continue;
                        }

                        *server.client_count.write().await += 1;
                        debug!("Control client connected (total: {})", client_count + 1);

                        let server_clone = server.clone();
                        tokio::spawn(async move {
                            if let Err(e) = server_clone.clone().handle_client(stream).await {
                                debug!("Client handler ended: {e}");
                            }
                            *server_clone.client_count.write().await -= 1;
                            debug!("Control client disconnected");
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept IPC connection: {e}");
                    }
                }
            }
        });

        Ok(())
    }

    /// Answer commands from one client until it disconnects
    async fn handle_client(self: Arc<Self>, stream: UnixStream) -> Result<()> {
        let (mut reader, mut writer) = stream.into_split();

        while let Some(cmd) = read_message::<ControlCommand, _>(&mut reader).await? {
            debug!("Processing control command: {cmd:?}");
            let reply = self.process_command(cmd).await;
            writer.write_all(&encode_message(&reply)?).await?;
            writer.flush().await?;
        }
        Ok(())
    }

    /// Process a single control command and build its reply
    pub async fn process_command(&self, cmd: ControlCommand) -> BotEvent {
        match cmd {
            ControlCommand::GetStatus => BotEvent::StatusUpdate {
                endpoints: self.supervisor.status(),
                uptime_seconds: self.supervisor.uptime().as_secs(),
            },
            ControlCommand::RefreshEmojis { request_id } => {
                self.directory.refresh().await;
                info!("Emoji directory refreshed on request");
                BotEvent::ok(request_id, "Emojis refreshed")
            }
            ControlCommand::Connect { request_id, node } => match self.supervisor.connect(&node) {
                Ok(true) => {
                    info!("[{node}] Connect requested by operator");
                    BotEvent::ok(request_id, format!("Connecting to {node}"))
                }
                Ok(false) => BotEvent::ok(request_id, format!("{node} already has an active connection")),
                Err(e) => BotEvent::failed(request_id, e.to_string()),
            },
            ControlCommand::CreateEmoji {
                request_id,
                name,
                url,
                description,
                nodes,
            } => match self
                .database
                .create_emoji(&name, &url, &description, &nodes)
                .await
            {
                Ok(id) => {
                    info!("Created emoji {name} (id {id})");
                    self.directory.request_refresh();
                    BotEvent::ok(request_id, format!("Created emoji {name} (id {id})"))
                }
                Err(e) => {
                    warn!("Failed to create emoji {name}: {e:#}");
                    BotEvent::failed(request_id, format!("{e:#}"))
                }
            },
            ControlCommand::DeleteEmoji { request_id, name } => {
                match self.database.delete_emoji(&name).await {
                    Ok(true) => {
                        info!("Deleted emoji {name}");
                        self.directory.request_refresh();
                        BotEvent::ok(request_id, format!("Deleted emoji {name}"))
                    }
                    Ok(false) => BotEvent::failed(request_id, format!("No emoji named {name}")),
                    Err(e) => {
                        warn!("Failed to delete emoji {name}: {e:#}");
                        BotEvent::failed(request_id, format!("{e:#}"))
                    }
                }
            }
            ControlCommand::AddUser {
                request_id,
                username,
            } => match self.database.add_user(&username).await {
                Ok(id) => BotEvent::ok(request_id, format!("User {username} has id {id}")),
                Err(e) => BotEvent::failed(request_id, format!("{e:#}")),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_handler::CommandHandler;
    use crate::commands::context::test_support::context_with;
    use crate::connection::RetryPolicy;
    use crate::core::{AuthConfig, Config, EndpointConfig};
    use crate::database::mock::MemoryStore;
    use crate::database::EmojiStore;
    use crate::ipc::client::IpcClient;
    use crate::rate_limiter::RateLimiter;
    use std::time::Duration;

    async fn server(dir: &tempfile::TempDir) -> (Arc<IpcServer>, EmojiDirectory) {
        let database = Database::new(dir.path().join("bot.db").to_str().unwrap())
            .await
            .unwrap();
        let store: Arc<dyn EmojiStore> = Arc::new(database.clone());
        let directory = EmojiDirectory::new(store, vec!["vm1".to_string()]);

        let config = Config {
            username: "emojibot".to_string(),
            command_prefix: "!".to_string(),
            emoji_shorthand: false,
            auth: AuthConfig::Password {
                password: None,
                elevate: false,
            },
            endpoints: vec![EndpointConfig {
                // Nothing listens here; connects fail and are retried
                url: "ws://127.0.0.1:9".to_string(),
                node: "vm1".to_string(),
                origin: None,
            }],
            database_path: String::new(),
            log_level: "debug".to_string(),
        };
        let ctx = context_with(Arc::new(MemoryStore::default()), false).await;
        let commands = CommandHandler::new(ctx, RateLimiter::default()).unwrap();
        let policy = RetryPolicy {
            delay: Duration::from_secs(60),
            max_retries: 1,
            stagger: Duration::ZERO,
        };
        let supervisor = Supervisor::new(&config, commands, policy);

        let socket = dir.path().join("ctl.sock");
        let server = Arc::new(IpcServer::new(
            socket.to_str().unwrap(),
            supervisor,
            directory.clone(),
            database,
        ));
        (server, directory)
    }

    fn is_success(event: &BotEvent) -> bool {
        matches!(event, BotEvent::CommandResponse { success: true, .. })
    }

    #[tokio::test]
    async fn test_status_over_socket() {
        let dir = tempfile::tempdir().unwrap();
        let (server, _) = server(&dir).await;
        server.clone().start().await.unwrap();

        let mut client = IpcClient::connect(&server.socket_path).await.unwrap();
        match client.status().await.unwrap() {
            BotEvent::StatusUpdate { endpoints, .. } => {
                assert_eq!(endpoints.get("vm1"), Some(&false));
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_emoji_refreshes_directory() {
        let dir = tempfile::tempdir().unwrap();
        let (server, directory) = server(&dir).await;
        tokio::spawn(directory.clone().run_refresh_loop(Duration::from_secs(3600)));

        let reply = server
            .process_command(ControlCommand::CreateEmoji {
                request_id: "1".to_string(),
                name: "wave".to_string(),
                url: "https://cdn.example.com/wave.png".to_string(),
                description: "a wave".to_string(),
                nodes: vec!["vm1".to_string()],
            })
            .await;
        assert!(is_success(&reply));

        let loaded = tokio::time::timeout(Duration::from_secs(2), async {
            while directory.lookup("vm1", "wave").is_none() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(loaded.is_ok());

        // Duplicate names are rejected by storage
        let duplicate = server
            .process_command(ControlCommand::CreateEmoji {
                request_id: "2".to_string(),
                name: "wave".to_string(),
                url: "https://cdn.example.com/other.png".to_string(),
                description: String::new(),
                nodes: Vec::new(),
            })
            .await;
        assert!(!is_success(&duplicate));
    }

    #[tokio::test]
    async fn test_delete_and_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let (server, directory) = server(&dir).await;

        server
            .database
            .create_emoji("cat", "https://cdn.example.com/cat.png", "", &["vm1".to_string()])
            .await
            .unwrap();
        let refreshed = server
            .process_command(ControlCommand::RefreshEmojis {
                request_id: "1".to_string(),
            })
            .await;
        assert!(is_success(&refreshed));
        assert!(directory.lookup("vm1", "cat").is_some());

        let deleted = server
            .process_command(ControlCommand::DeleteEmoji {
                request_id: "2".to_string(),
                name: "cat".to_string(),
            })
            .await;
        assert!(is_success(&deleted));

        let missing = server
            .process_command(ControlCommand::DeleteEmoji {
                request_id: "3".to_string(),
                name: "cat".to_string(),
            })
            .await;
        assert!(!is_success(&missing));
    }

    #[tokio::test]
    async fn test_connect_unknown_node_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (server, _) = server(&dir).await;

        let reply = server
            .process_command(ControlCommand::Connect {
                request_id: "1".to_string(),
                node: "nowhere".to_string(),
            })
            .await;
        assert!(!is_success(&reply));

        let first = server
            .process_command(ControlCommand::Connect {
                request_id: "2".to_string(),
                node: "vm1".to_string(),
            })
            .await;
        assert_eq!(first, BotEvent::ok("2".to_string(), "Connecting to vm1"));

        // Waiting out the reconnect delay still counts as active
        let second = server
            .process_command(ControlCommand::Connect {
                request_id: "3".to_string(),
                node: "vm1".to_string(),
            })
            .await;
        assert_eq!(
            second,
            BotEvent::ok("3".to_string(), "vm1 already has an active connection")
        );
    }

    #[tokio::test]
    async fn test_add_user() {
        let dir = tempfile::tempdir().unwrap();
        let (server, _) = server(&dir).await;

        let reply = server
            .process_command(ControlCommand::AddUser {
                request_id: "1".to_string(),
                username: "alice".to_string(),
            })
            .await;
        assert!(is_success(&reply));
        assert!(server.database.find_user_id("alice").await.unwrap().is_some());
    }
}
