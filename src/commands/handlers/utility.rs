//! Utility command handlers
//!
//! Handles: help
//!
//! - **Version**: 2.0.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 2.0.0: Help rendered as a markup card for chat
//! - 1.0.0: Extracted from command_handler.rs

use log::info;

use crate::commands::context::CommandContext;
use crate::commands::handler::{ChatCommandHandler, Invocation, Reply};
use crate::core::markup;

/// Handler for utility commands: help
pub struct UtilityHandler;

impl ChatCommandHandler for UtilityHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["help"]
    }

    fn handle(&self, ctx: &CommandContext, invocation: &Invocation) -> Vec<Reply> {
        match invocation.command.name.as_str() {
            "help" => {
                info!("[{}] Help requested by {}", invocation.node, invocation.sender);
                vec![Reply::Markup(markup::help_card(&ctx.prefix, ctx.shorthand))]
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::context::test_support::context_with;
    use crate::commands::parser::ParsedCommand;
    use crate::database::mock::MemoryStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_help_is_one_markup_reply() {
        let ctx = context_with(Arc::new(MemoryStore::default()), true).await;
        let invocation = Invocation {
            node: "vm1".to_string(),
            sender: "alice".to_string(),
            elevated: false,
            command: ParsedCommand {
                name: "help".to_string(),
                args: Vec::new(),
            },
        };

        let replies = UtilityHandler.handle(&ctx, &invocation);
        assert_eq!(replies, vec![Reply::Markup(markup::help_card("!", true))]);
    }
}
