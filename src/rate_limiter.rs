//! # Feature: Rate Limiting
//!
//! Keeps chat participants from flooding a VM with bot replies. Sliding window
//! per (node, sender) pair using DashMap, so the same user is limited
//! independently on each node.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Keyed by (node, sender) for chat commands
//! - 1.1.0: Multi-bot support with (bot_id, user_id) composite keys
//! - 1.0.0: Initial release with per-user sliding window rate limiting

use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Default number of commands allowed per window
pub const DEFAULT_MAX_COMMANDS: usize = 5;
/// Default window length
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(10);

/// Composite key for rate limiting: (node, sender)
type RateLimitKey = (String, String);

#[derive(Clone)]
pub struct RateLimiter {
    requests: std::sync::Arc<DashMap<RateLimitKey, Vec<Instant>>>,
    max_requests: usize,
    time_window: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_COMMANDS, DEFAULT_WINDOW)
    }
}

impl RateLimiter {
    pub fn new(max_requests: usize, time_window: Duration) -> Self {
        RateLimiter {
            requests: std::sync::Arc::new(DashMap::new()),
            max_requests,
            time_window,
        }
    }

    fn make_key(node: &str, sender: &str) -> RateLimitKey {
        (node.to_string(), sender.to_string())
    }

    /// Record a command attempt, returning false when over the limit
    pub fn check_rate_limit(&self, node: &str, sender: &str) -> bool {
        let key = Self::make_key(node, sender);
        let now = Instant::now();
        let mut entry = self.requests.entry(key).or_default();

        entry.retain(|&time| now.duration_since(time) < self.time_window);

        if entry.len() >= self.max_requests {
            false
        } else {
            entry.push(now);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::sleep;

    const NODE: &str = "vm1";

    #[test]
    fn test_rate_limiter_allows_under_limit() {
        let limiter = RateLimiter::new(3, Duration::from_secs(1));

        assert!(limiter.check_rate_limit(NODE, "alice"));
        assert!(limiter.check_rate_limit(NODE, "alice"));
        assert!(limiter.check_rate_limit(NODE, "alice"));
    }

    #[test]
    fn test_rate_limiter_blocks_over_limit() {
        let limiter = RateLimiter::new(2, Duration::from_secs(1));

        assert!(limiter.check_rate_limit(NODE, "alice"));
        assert!(limiter.check_rate_limit(NODE, "alice"));
        assert!(!limiter.check_rate_limit(NODE, "alice"));
    }

    #[tokio::test]
    async fn test_rate_limiter_resets_after_window() {
        let limiter = RateLimiter::new(1, Duration::from_millis(100));

        assert!(limiter.check_rate_limit(NODE, "alice"));
        assert!(!limiter.check_rate_limit(NODE, "alice"));

        sleep(Duration::from_millis(150)).await;
        assert!(limiter.check_rate_limit(NODE, "alice"));
    }

    #[test]
    fn test_rate_limiter_per_sender_and_node() {
        let limiter = RateLimiter::new(1, Duration::from_secs(1));

        assert!(limiter.check_rate_limit("vm1", "alice"));
        assert!(limiter.check_rate_limit("vm1", "bob"));
        assert!(limiter.check_rate_limit("vm2", "alice"));
        assert!(!limiter.check_rate_limit("vm1", "alice"));
        assert!(!limiter.check_rate_limit("vm2", "alice"));
    }

    #[test]
    fn test_clones_share_state() {
        let limiter = RateLimiter::new(1, Duration::from_secs(1));
        let other = limiter.clone();

        assert!(limiter.check_rate_limit(NODE, "alice"));
        assert!(!other.check_rate_limit(NODE, "alice"));
    }
}
