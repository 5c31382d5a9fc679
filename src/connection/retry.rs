//! Reconnect policy
//!
//! Only a normal close (code 1000) or a process shutdown ends a connection for
//! good. Everything else, including failed handshakes, goes through a bounded
//! number of fixed-delay retries.

use std::time::Duration;

use crate::wire::NORMAL_CLOSE;

/// Delay before each reconnect attempt
pub const RETRY_DELAY: Duration = Duration::from_secs(5);
/// Reconnect attempts before giving up on an endpoint
pub const MAX_RETRIES: u32 = 5;
/// Gap between initial connects at startup
pub const STARTUP_STAGGER: Duration = Duration::from_secs(2);

/// How a connection ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The process is shutting down
    Shutdown,
    /// The peer closed, or the stream ended (reported as 1006)
    Closed { code: u16, reason: String },
    /// Connect failed, or the session gave up during the handshake
    Failed(String),
}

impl SessionEnd {
    /// Whether this end is deliberate and must not be retried
    pub fn is_normal(&self) -> bool {
        matches!(
            self,
            SessionEnd::Shutdown | SessionEnd::Closed { code: NORMAL_CLOSE, .. }
        )
    }
}

impl std::fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEnd::Shutdown => write!(f, "shutdown"),
            SessionEnd::Closed { code, reason } if reason.is_empty() => {
                write!(f, "closed with code {code}")
            }
            SessionEnd::Closed { code, reason } => write!(f, "closed with code {code}: {reason}"),
            SessionEnd::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delay: Duration,
    pub max_retries: u32,
    pub stagger: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            delay: RETRY_DELAY,
            max_retries: MAX_RETRIES,
            stagger: STARTUP_STAGGER,
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt, or `None` to stop
    ///
    /// `retries` is the number of reconnects already made since the last
    /// intentional connect.
    pub fn next_delay(&self, end: &SessionEnd, retries: u32) -> Option<Duration> {
        if end.is_normal() || retries >= self.max_retries {
            None
        } else {
            Some(self.delay)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::ABNORMAL_CLOSE;

    fn closed(code: u16) -> SessionEnd {
        SessionEnd::Closed {
            code,
            reason: String::new(),
        }
    }

    #[test]
    fn test_normal_close_is_not_retried() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.next_delay(&closed(NORMAL_CLOSE), 0), None);
        assert_eq!(policy.next_delay(&SessionEnd::Shutdown, 0), None);
    }

    #[test]
    fn test_abnormal_ends_are_retried() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.next_delay(&closed(ABNORMAL_CLOSE), 0), Some(RETRY_DELAY));
        assert_eq!(policy.next_delay(&closed(1001), 2), Some(RETRY_DELAY));
        assert_eq!(
            policy.next_delay(&SessionEnd::Failed("login failed".to_string()), 4),
            Some(RETRY_DELAY)
        );
    }

    #[test]
    fn test_retries_are_bounded() {
        let policy = RetryPolicy::default();
        let end = closed(ABNORMAL_CLOSE);
        let attempts = (0..)
            .take_while(|&retries| policy.next_delay(&end, retries).is_some())
            .count();
        assert_eq!(attempts, MAX_RETRIES as usize);
    }

    #[test]
    fn test_display() {
        assert_eq!(closed(1006).to_string(), "closed with code 1006");
        assert_eq!(
            SessionEnd::Failed("boom".to_string()).to_string(),
            "failed: boom"
        );
    }
}
