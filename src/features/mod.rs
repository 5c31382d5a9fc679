//! # Features Layer
//!
//! Feature modules layered on top of the connection core.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.7.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Emoji directory and emoji usage analytics
//! - 1.0.0: Initial feature layout

pub mod analytics;
pub mod emojis;

pub use analytics::{UsageEvent, UsageTracker};
pub use emojis::{EmojiDirectory, EmojiSet};

/// Crate version, for startup logs and `vmbot-ctl --version`
pub fn get_bot_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
