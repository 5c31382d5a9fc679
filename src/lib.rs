// Core layer - shared types and configuration
pub mod core;

// Wire layer - frame codec, opcodes and WebSocket transport
pub mod wire;

// Connection layer - per-endpoint sessions and supervision
pub mod connection;

// Features layer - emoji directory and usage analytics
pub mod features;

// IPC layer - control socket between the bot and vmbot-ctl
pub mod ipc;

// Infrastructure
pub mod database;
pub mod rate_limiter;

// Application layer
pub mod command_handler;
pub mod commands;

// Re-export core config
pub use core::Config;

pub use commands::CommandHandler;
pub use connection::{RetryPolicy, Supervisor};
pub use database::{Database, EmojiRecord, EmojiStore};
pub use features::{EmojiDirectory, UsageTracker};
pub use rate_limiter::RateLimiter;

// Re-export IPC items
pub use ipc::{BotEvent, ControlCommand, IpcClient, IpcServer};
