//! # IPC Protocol
//!
//! Message types for operator <-> bot communication over the control socket.
//!
//! Uses length-prefixed JSON framing:
//! - 4 bytes: message length (big-endian u32)
//! - N bytes: JSON payload

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Largest accepted message body
pub const MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

// ============================================================================
// Bot -> Operator Events
// ============================================================================

/// Replies sent from the bot to control clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BotEvent {
    /// Response to a command
    CommandResponse {
        request_id: String,
        success: bool,
        message: Option<String>,
    },
    /// Status update (response to GetStatus)
    StatusUpdate {
        /// Node id -> transport open
        endpoints: BTreeMap<String, bool>,
        uptime_seconds: u64,
    },
}

impl BotEvent {
    pub fn ok(request_id: String, message: impl Into<String>) -> Self {
        BotEvent::CommandResponse {
            request_id,
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn failed(request_id: String, message: impl Into<String>) -> Self {
        BotEvent::CommandResponse {
            request_id,
            success: false,
            message: Some(message.into()),
        }
    }
}

// ============================================================================
// Operator -> Bot Commands
// ============================================================================

/// Commands sent from control clients to the bot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlCommand {
    /// Reload every node's emojis from storage now
    RefreshEmojis { request_id: String },
    /// Request connection status
    GetStatus,
    /// Connect a node that is not currently connected
    Connect { request_id: String, node: String },
    /// Store a new emoji and enable it on the given nodes
    CreateEmoji {
        request_id: String,
        name: String,
        url: String,
        description: String,
        nodes: Vec<String>,
    },
    /// Remove an emoji everywhere
    DeleteEmoji { request_id: String, name: String },
    /// Register a chat user so their emoji usage is recorded
    AddUser { request_id: String, username: String },
}

// ============================================================================
// Framing - Length-prefixed JSON messages
// ============================================================================

/// Encode a message with length prefix
pub fn encode_message<T: Serialize>(msg: &T) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(msg)?;
    let len = u32::try_from(json.len()).map_err(|_| anyhow!("Message too large"))?;
    let mut buf = Vec::with_capacity(4 + json.len());
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(&json);
    Ok(buf)
}

/// Read one length-prefixed message
///
/// Returns `Ok(None)` when the peer closed the stream between messages.
pub async fn read_message<T, R>(reader: &mut R) -> Result<Option<T>>
where
    T: for<'de> Deserialize<'de>,
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(len_buf) as usize;

    if len > MAX_MESSAGE_SIZE {
        return Err(anyhow!("Message too large: {} bytes", len));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;

    Ok(Some(serde_json::from_slice(&buf)?))
}
