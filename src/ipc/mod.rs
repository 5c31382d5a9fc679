//! # IPC Module
//!
//! Control socket between the running bot and operator tooling.
//!
//! - **Version**: 2.0.0
//! - **Since**: 1.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Control commands for emojis, users and endpoint connections
//! - 1.0.0: Initial IPC implementation with Unix socket protocol

pub mod client;
pub mod protocol;
pub mod server;

pub use client::{connect_with_retry, IpcClient};
pub use protocol::{BotEvent, ControlCommand};
pub use server::IpcServer;

/// Default socket path for IPC communication
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/vmbot.sock";

/// Get the socket path from environment or use default
pub fn get_socket_path() -> String {
    std::env::var("VMBOT_IPC_SOCKET").unwrap_or_else(|_| DEFAULT_SOCKET_PATH.to_string())
}
