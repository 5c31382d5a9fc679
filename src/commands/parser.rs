//! Chat command parsing
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.1.0: Shorthand tokens are resolved by the registry
//! - 1.0.0: Prefix commands and `:name:` emoji shorthand

use anyhow::Result;
use regex::Regex;

/// Shorthand form of `emoji <name>`
const SHORTHAND_PATTERN: &str = r"^:([A-Za-z0-9_\-]+):$";

/// A command token and its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    pub args: Vec<String>,
}

/// A chat line recognised as addressed to the bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    /// `<prefix><name> [args...]`
    Command(ParsedCommand),
    /// `:token:`, routed by the registry
    Shorthand(String),
}

/// Recognises command messages in chat
#[derive(Debug, Clone)]
pub struct CommandParser {
    prefix: String,
    shorthand: Option<Regex>,
}

impl CommandParser {
    pub fn new(prefix: &str, shorthand: bool) -> Result<Self> {
        let shorthand = if shorthand {
            Some(Regex::new(SHORTHAND_PATTERN)?)
        } else {
            None
        };
        Ok(CommandParser {
            prefix: prefix.to_string(),
            shorthand,
        })
    }

    /// Parse a chat message, `None` if it is not a command
    pub fn parse(&self, message: &str) -> Option<ChatInput> {
        let message = message.trim();

        if let Some(rest) = message.strip_prefix(self.prefix.as_str()) {
            let mut tokens = rest.split_whitespace();
            let name = tokens.next()?.to_lowercase();
            return Some(ChatInput::Command(ParsedCommand {
                name,
                args: tokens.map(str::to_string).collect(),
            }));
        }

        let captures = self.shorthand.as_ref()?.captures(message)?;
        Some(ChatInput::Shorthand(captures[1].to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command_name(parser: &CommandParser, message: &str) -> String {
        match parser.parse(message) {
            Some(ChatInput::Command(command)) => command.name,
            other => panic!("expected a command, got {other:?}"),
        }
    }

    #[test]
    fn test_prefix_command() {
        let parser = CommandParser::new("!", false).unwrap();
        assert_eq!(
            parser.parse("!emoji wave"),
            Some(ChatInput::Command(ParsedCommand {
                name: "emoji".to_string(),
                args: vec!["wave".to_string()],
            }))
        );
        assert_eq!(command_name(&parser, "  !HELP  "), "help");
    }

    #[test]
    fn test_non_commands() {
        let parser = CommandParser::new("!", false).unwrap();
        assert!(parser.parse("hello there").is_none());
        assert!(parser.parse("!").is_none());
        assert!(parser.parse("! ").is_none());
        assert!(parser.parse(":wave:").is_none());
    }

    #[test]
    fn test_multi_char_prefix() {
        let parser = CommandParser::new("eb.", false).unwrap();
        assert_eq!(command_name(&parser, "eb.emojilist"), "emojilist");
        assert!(parser.parse("!emojilist").is_none());
    }

    #[test]
    fn test_shorthand() {
        let parser = CommandParser::new("!", true).unwrap();
        assert_eq!(
            parser.parse(":party_parrot:"),
            Some(ChatInput::Shorthand("party_parrot".to_string()))
        );
        assert!(parser.parse("look :wave: here").is_none());
        assert!(parser.parse("::").is_none());
    }
}
