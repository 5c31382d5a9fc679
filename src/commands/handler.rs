//! Chat command handler trait and replies
//!
//! - **Version**: 2.0.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 2.0.0: Chat commands return replies instead of writing to the transport
//! - 1.0.0: Initial implementation for modular command handling

use crate::wire::opcode;

use super::context::CommandContext;
use super::parser::ParsedCommand;

/// One command received on one connection
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Node of the connection the command arrived on
    pub node: String,
    /// Username that sent the command
    pub sender: String,
    /// Whether the bot holds staff privileges on this connection
    pub elevated: bool,
    pub command: ParsedCommand,
}

impl Invocation {
    /// Argument at `index`, if present
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.command.args.get(index).map(String::as_str)
    }
}

/// A reply to be written back on the originating connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Plain chat text
    Text(String),
    /// HTML fragment, needs staff privileges
    Markup(String),
}

impl Reply {
    /// Frame fields for this reply
    pub fn into_fields(self) -> Vec<String> {
        match self {
            Reply::Text(text) => vec![opcode::CHAT.to_string(), text],
            Reply::Markup(html) => vec![
                opcode::ADMIN.to_string(),
                opcode::admin::MARKUP_CHAT.to_string(),
                html,
            ],
        }
    }
}

/// Trait for chat command handlers
///
/// Each command handler implements this trait to process one or more commands.
/// Handlers are registered with a CommandRegistry and dispatched by command name.
/// Handlers never touch the transport; the session writes the replies they return.
///
/// # Example
///
/// ```ignore
/// pub struct PingHandler;
///
/// impl ChatCommandHandler for PingHandler {
///     fn command_names(&self) -> &'static [&'static str] {
///         &["ping"]
///     }
///
///     fn handle(&self, _ctx: &CommandContext, _invocation: &Invocation) -> Vec<Reply> {
///         vec![Reply::Text("Pong!".to_string())]
///     }
/// }
/// ```
pub trait ChatCommandHandler: Send + Sync {
    /// Command name(s) this handler processes
    ///
    /// A handler can process multiple commands if they share logic.
    fn command_names(&self) -> &'static [&'static str];

    /// Command that the `:token:` shorthand expands to, if this handler takes it
    fn shorthand_command(&self) -> Option<&'static str> {
        None
    }

    /// Handle the command, returning the replies to send
    fn handle(&self, ctx: &CommandContext, invocation: &Invocation) -> Vec<Reply>;
}
