//! Emoji command handlers
//!
//! Handles: emojilist, emoji
//!
//! - **Version**: 1.2.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.2.0: Claims the `:name:` shorthand
//! - 1.1.0: Record emoji usage through the usage tracker
//! - 1.0.0: Initial release

use log::{debug, info};

use crate::commands::context::CommandContext;
use crate::commands::handler::{ChatCommandHandler, Invocation, Reply};
use crate::core::markup;
use crate::database::EmojiRecord;

/// Handler for emoji commands: emojilist, emoji
pub struct EmojiHandler;

impl ChatCommandHandler for EmojiHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["emojilist", "emoji"]
    }

    fn shorthand_command(&self) -> Option<&'static str> {
        Some("emoji")
    }

    fn handle(&self, ctx: &CommandContext, invocation: &Invocation) -> Vec<Reply> {
        match invocation.command.name.as_str() {
            "emojilist" => self.handle_list(ctx, invocation),
            "emoji" => self.handle_emoji(ctx, invocation),
            _ => Vec::new(),
        }
    }
}

impl EmojiHandler {
    fn handle_list(&self, ctx: &CommandContext, invocation: &Invocation) -> Vec<Reply> {
        let set = ctx.directory.snapshot(&invocation.node);
        if set.is_empty() {
            return vec![Reply::Text("No emojis are available on this VM.".to_string())];
        }

        let records: Vec<EmojiRecord> = set.sorted().into_iter().cloned().collect();
        debug!(
            "[{}] Listing {} emoji(s) for {}",
            invocation.node,
            records.len(),
            invocation.sender
        );
        vec![Reply::Markup(markup::emoji_list(&records))]
    }

    fn handle_emoji(&self, ctx: &CommandContext, invocation: &Invocation) -> Vec<Reply> {
        if !invocation.elevated {
            return vec![Reply::Text(
                "I need staff privileges on this VM to send emojis.".to_string(),
            )];
        }

        let Some(name) = invocation.arg(0) else {
            return vec![Reply::Text(format!("Usage: {}emoji <name>", ctx.prefix))];
        };

        let Some(record) = ctx.directory.lookup(&invocation.node, name) else {
            return vec![Reply::Text(format!(
                "Unknown emoji \"{name}\". Use {}emojilist to see the available emojis.",
                ctx.prefix
            ))];
        };

        info!(
            "[{}] Sending emoji {} for {}",
            invocation.node, record.name, invocation.sender
        );
        ctx.usage_tracker
            .log_emoji(&invocation.sender, record.id, &invocation.node);
        vec![Reply::Markup(markup::emoji_image(&record))]
    }
}
