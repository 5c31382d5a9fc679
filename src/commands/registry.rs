//! Command handler registry
//!
//! - **Version**: 2.0.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 2.0.0: Chat command handlers, `:token:` shorthand routing
//! - 1.0.0: Initial implementation for handler dispatch

use log::warn;
use std::collections::HashMap;
use std::sync::Arc;

use super::handler::ChatCommandHandler;
use super::parser::{ChatInput, ParsedCommand};

/// Registry mapping command names to handlers
///
/// Multiple command names can map to the same handler if they share logic.
/// At most one handler owns the `:token:` shorthand; the last one registered wins.
///
/// # Example
///
/// ```ignore
/// let registry = CommandRegistry::new(create_all_handlers());
///
/// if let Some((handler, command)) = registry.resolve(input) {
///     let replies = handler.handle(&ctx, &invocation);
/// }
/// ```
#[derive(Clone)]
pub struct CommandRegistry {
    handlers: HashMap<&'static str, Arc<dyn ChatCommandHandler>>,
    shorthand: Option<&'static str>,
}

impl CommandRegistry {
    /// Build a registry from handlers, registered in order
    pub fn new(handlers: Vec<Arc<dyn ChatCommandHandler>>) -> Self {
        let mut registry = Self {
            handlers: HashMap::new(),
            shorthand: None,
        };
        for handler in handlers {
            registry.register(handler);
        }
        registry
    }

    /// Register a handler for its declared command names
    fn register(&mut self, handler: Arc<dyn ChatCommandHandler>) {
        if let Some(command) = handler.shorthand_command() {
            if let Some(previous) = self.shorthand.replace(command) {
                warn!("Shorthand moved from '{previous}' to '{command}'");
            }
        }
        for name in handler.command_names() {
            self.handlers.insert(name, Arc::clone(&handler));
        }
    }

    /// Get handler for a command name
    pub fn get(&self, name: &str) -> Option<Arc<dyn ChatCommandHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Find the handler for a parsed chat line and the command it stands for
    ///
    /// A shorthand token becomes the owning command with the token as its only
    /// argument. `None` for unknown commands, or a shorthand nobody owns.
    pub fn resolve(
        &self,
        input: ChatInput,
    ) -> Option<(Arc<dyn ChatCommandHandler>, ParsedCommand)> {
        let command = match input {
            ChatInput::Command(command) => command,
            ChatInput::Shorthand(token) => ParsedCommand {
                name: self.shorthand?.to_string(),
                args: vec![token],
            },
        };
        let handler = self.get(&command.name)?;
        Some((handler, command))
    }

    /// Registered command names, sorted
    pub fn command_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
