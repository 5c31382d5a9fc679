//! Per-command handler implementations
//!
//! - **Version**: 3.0.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 3.0.0: Emoji and help handlers for VM chat
//! - 1.0.0: Initial extraction from monolithic command_handler.rs

pub mod emoji;
pub mod utility;

use std::sync::Arc;

use super::handler::ChatCommandHandler;

/// Create all registered command handlers
///
/// Returns a vector of handlers ready to be registered with CommandRegistry.
pub fn create_all_handlers() -> Vec<Arc<dyn ChatCommandHandler>> {
    vec![
        Arc::new(utility::UtilityHandler),
        Arc::new(emoji::EmojiHandler),
    ]
}
