//! # IPC Client
//!
//! Unix socket client used by `vmbot-ctl` to talk to the running bot.

use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tokio::time::{timeout, Duration};

use crate::ipc::protocol::{encode_message, read_message, BotEvent, ControlCommand};

/// Connection timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Time allowed for the bot to answer one command
const REPLY_TIMEOUT: Duration = Duration::from_secs(30);

/// Control socket client
pub struct IpcClient {
    stream: UnixStream,
}

impl IpcClient {
    /// Connect to the bot's control socket
    pub async fn connect(socket_path: &str) -> Result<Self> {
        info!("Connecting to IPC server at {socket_path}");

        let stream = timeout(CONNECT_TIMEOUT, UnixStream::connect(socket_path))
            .await
            .map_err(|_| anyhow!("Connection timeout"))?
            .with_context(|| format!("Failed to connect to {socket_path}"))?;

        Ok(IpcClient { stream })
    }

    /// Send a command and wait for its reply
    pub async fn request(&mut self, cmd: ControlCommand) -> Result<BotEvent> {
        self.stream.write_all(&encode_message(&cmd)?).await?;
        self.stream.flush().await?;

        timeout(REPLY_TIMEOUT, read_message::<BotEvent, _>(&mut self.stream))
            .await
            .map_err(|_| anyhow!("Timed out waiting for reply"))??
            .ok_or_else(|| anyhow!("Bot closed the connection"))
    }

    /// Request bot status
    pub async fn status(&mut self) -> Result<BotEvent> {
        self.request(ControlCommand::GetStatus).await
    }

    /// Refresh every node's emojis now
    pub async fn refresh_emojis(&mut self) -> Result<BotEvent> {
        self.request(ControlCommand::RefreshEmojis {
            request_id: new_request_id(),
        })
        .await
    }

    /// Connect a node
    pub async fn connect_node(&mut self, node: String) -> Result<BotEvent> {
        self.request(ControlCommand::Connect {
            request_id: new_request_id(),
            node,
        })
        .await
    }

    /// Create an emoji enabled on `nodes`
    pub async fn create_emoji(
        &mut self,
        name: String,
        url: String,
        description: String,
        nodes: Vec<String>,
    ) -> Result<BotEvent> {
        self.request(ControlCommand::CreateEmoji {
            request_id: new_request_id(),
            name,
            url,
            description,
            nodes,
        })
        .await
    }

    /// Delete an emoji
    pub async fn delete_emoji(&mut self, name: String) -> Result<BotEvent> {
        self.request(ControlCommand::DeleteEmoji {
            request_id: new_request_id(),
            name,
        })
        .await
    }

    /// Register a chat user
    pub async fn add_user(&mut self, username: String) -> Result<BotEvent> {
        self.request(ControlCommand::AddUser {
            request_id: new_request_id(),
            username,
        })
        .await
    }
}

fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Try to connect with retries
pub async fn connect_with_retry(
    socket_path: &str,
    max_attempts: u32,
    delay: Duration,
) -> Result<IpcClient> {
    let mut attempt = 1;
    loop {
        match IpcClient::connect(socket_path).await {
            Ok(client) => return Ok(client),
            Err(e) if attempt < max_attempts => {
                warn!("Connection attempt {attempt} failed: {e}. Retrying in {delay:?}...");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(anyhow!(
                    "Failed to connect after {max_attempts} attempts: {e}"
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_with_retry_gives_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.sock");
        let result = connect_with_retry(path.to_str().unwrap(), 2, Duration::from_millis(10)).await;
        let message = result.err().unwrap().to_string();
        assert!(message.contains("after 2 attempts"));
    }

    #[tokio::test]
    async fn test_request_reads_reply() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("echo.sock");
        let listener = tokio::net::UnixListener::bind(&path).unwrap();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let cmd: ControlCommand = read_message(&mut stream).await.unwrap().unwrap();
            let ControlCommand::DeleteEmoji { request_id, name } = cmd else {
                panic!("unexpected command");
            };
            let reply = BotEvent::ok(request_id, format!("Deleted emoji {name}"));
            stream.write_all(&encode_message(&reply).unwrap()).await.unwrap();
        });

        let mut client = IpcClient::connect(path.to_str().unwrap()).await.unwrap();
        match client.delete_emoji("wave".to_string()).await.unwrap() {
            BotEvent::CommandResponse {
                success, message, ..
            } => {
                assert!(success);
                assert_eq!(message.as_deref(), Some("Deleted emoji wave"));
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }
}
