//! # Emojis Feature
//!
//! Cached per-node emoji catalogue consulted by chat commands.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod directory;

pub use directory::{EmojiDirectory, EmojiSet, REFRESH_INTERVAL};
