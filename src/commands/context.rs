//! Shared context for command handlers
//!
//! - **Version**: 2.0.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 2.0.0: Emoji directory and usage tracking replace the chat backends
//! - 1.0.0: Initial implementation with core shared state

use crate::features::analytics::UsageTracker;
use crate::features::emojis::EmojiDirectory;

/// Shared context for all command handlers
///
/// Contains the services handlers need:
/// - EmojiDirectory for per-node emoji lookups
/// - UsageTracker for recording emoji usage
/// - The configured command prefix and shorthand flag, for help text
#[derive(Clone)]
pub struct CommandContext {
    pub directory: EmojiDirectory,
    pub usage_tracker: UsageTracker,
    pub prefix: String,
    pub shorthand: bool,
}

impl CommandContext {
    pub fn new(
        directory: EmojiDirectory,
        usage_tracker: UsageTracker,
        prefix: impl Into<String>,
        shorthand: bool,
    ) -> Self {
        Self {
            directory,
            usage_tracker,
            prefix: prefix.into(),
            shorthand,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_context_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<CommandContext>();
    }
}
