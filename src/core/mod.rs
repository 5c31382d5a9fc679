//! # Core Module
//!
//! Configuration and reply rendering shared by the bot.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.7.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Markup module for rich replies, endpoint configuration
//! - 1.0.0: Initial creation with config module

pub mod config;
pub mod markup;

pub use config::{AuthConfig, Config, EndpointConfig, EndpointsFile};
