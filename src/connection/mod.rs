//! # Connection Module
//!
//! Per-endpoint protocol sessions, reconnect policy and supervision.
//!
//! - **Version**: 1.2.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Staggered startup and at-most-one connection per endpoint
//! - 1.1.0: Deferred attach while account authentication is pending
//! - 1.0.0: Initial release with bounded fixed-delay reconnects

pub mod retry;
pub mod session;
pub mod state;
pub mod supervisor;

pub use retry::{RetryPolicy, SessionEnd};
pub use state::{Action, Phase, Privilege, ServerEvent, Session};
pub use supervisor::Supervisor;
