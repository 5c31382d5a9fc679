//! # Command System
//!
//! Chat command handling for VM chat.
//!
//! - **Version**: 3.0.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 3.0.0: Prefix and shorthand chat commands replace slash commands
//! - 2.1.0: Add modular handler infrastructure (handler trait, context, registry)
//! - 1.0.0: Initial reorganization with modular command structure

pub mod context;
pub mod handler;
pub mod handlers;
pub mod parser;
pub mod registry;

// Re-export the CommandHandler from the handler module
pub use crate::command_handler::CommandHandler;

// Re-export handler infrastructure
pub use context::CommandContext;
pub use handler::{ChatCommandHandler, Invocation, Reply};
pub use parser::{ChatInput, CommandParser, ParsedCommand};
pub use registry::CommandRegistry;
