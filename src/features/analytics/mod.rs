//! # Analytics Feature
//!
//! Usage tracking for privileged commands.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.5.0
//! - **Toggleable**: false

pub mod usage_tracker;

pub use usage_tracker::{UsageEvent, UsageTracker};
