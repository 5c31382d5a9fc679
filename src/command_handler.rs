//! Chat command interpreter
//!
//! Turns chat lines from a connection into replies: parse, check the sender's
//! rate limit, then dispatch to the registered handler.

use anyhow::Result;
use log::{debug, info, warn};
use std::sync::Arc;
use uuid::Uuid;

use crate::commands::context::CommandContext;
use crate::commands::handler::{Invocation, Reply};
use crate::commands::handlers::create_all_handlers;
use crate::commands::parser::CommandParser;
use crate::commands::registry::CommandRegistry;
use crate::rate_limiter::RateLimiter;

#[derive(Clone)]
pub struct CommandHandler {
    parser: CommandParser,
    registry: Arc<CommandRegistry>,
    context: Arc<CommandContext>,
    rate_limiter: RateLimiter,
}

impl CommandHandler {
    pub fn new(context: CommandContext, rate_limiter: RateLimiter) -> Result<Self> {
        let parser = CommandParser::new(&context.prefix, context.shorthand)?;

        let registry = CommandRegistry::new(create_all_handlers());
        debug!("Registered chat commands: {:?}", registry.command_names());

        Ok(CommandHandler {
            parser,
            registry: Arc::new(registry),
            context: Arc::new(context),
            rate_limiter,
        })
    }

    /// Interpret one chat message received on `node`
    ///
    /// Returns the replies to write back on the same connection. Messages that
    /// are not commands, unknown commands and rate-limited senders yield nothing.
    pub fn handle_message(
        &self,
        node: &str,
        sender: &str,
        elevated: bool,
        message: &str,
    ) -> Vec<Reply> {
        let Some(input) = self.parser.parse(message) else {
            return Vec::new();
        };

        let Some((handler, command)) = self.registry.resolve(input) else {
            debug!("[{node}] Ignoring unknown command from {sender}: {message}");
            return Vec::new();
        };

        let request_id = Uuid::new_v4();
        info!(
            "[{node}] [{request_id}] 📥 Command '{}' from {sender} | Args: {:?}",
            command.name, command.args
        );

        if !self.rate_limiter.check_rate_limit(node, sender) {
            warn!("[{node}] [{request_id}] 🚫 Rate limit exceeded for {sender}, dropping command");
            return Vec::new();
        }

        let invocation = Invocation {
            node: node.to_string(),
            sender: sender.to_string(),
            elevated,
            command,
        };
        let replies = handler.handle(&self.context, &invocation);
        debug!("[{node}] [{request_id}] ✅ Produced {} reply(ies)", replies.len());
        replies
    }
}
