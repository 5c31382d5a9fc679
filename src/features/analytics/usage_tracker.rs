//! # Feature: Emoji Usage Tracking
//!
//! Records who sent which emoji on which node without blocking the chat reply.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.5.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Track emoji usage events against the emoji store
//! - 1.0.0: Initial release with async background logging

use log::{debug, error, warn};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::database::EmojiStore;

/// Usage events recorded in the background
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageEvent {
    /// A privileged emoji command was answered
    Emoji {
        sender: String,
        emoji_id: i64,
        node: String,
    },
}

/// Handles async logging of usage without blocking replies
#[derive(Clone)]
pub struct UsageTracker {
    sender: mpsc::UnboundedSender<UsageEvent>,
}

impl UsageTracker {
    /// Create a new UsageTracker with a background logging task
    pub fn new(store: Arc<dyn EmojiStore>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();

        tokio::spawn(Self::background_logger(store, receiver));

        UsageTracker { sender }
    }

    /// Queue an emoji usage event (non-blocking)
    pub fn log_emoji(&self, sender: &str, emoji_id: i64, node: &str) {
        let event = UsageEvent::Emoji {
            sender: sender.to_string(),
            emoji_id,
            node: node.to_string(),
        };

        if let Err(e) = self.sender.send(event) {
            warn!("Failed to queue emoji usage event: {e}");
        }
    }

    async fn background_logger(
        store: Arc<dyn EmojiStore>,
        mut receiver: mpsc::UnboundedReceiver<UsageEvent>,
    ) {
        while let Some(event) = receiver.recv().await {
            if let Err(e) = Self::store_event(store.as_ref(), &event).await {
                error!("Failed to store usage event {event:?}: {e}");
            }
        }
    }

    async fn store_event(store: &dyn EmojiStore, event: &UsageEvent) -> anyhow::Result<()> {
        match event {
            UsageEvent::Emoji {
                sender,
                emoji_id,
                node,
            } => {
                let Some(user_id) = store.find_user_id(sender).await? else {
                    warn!("[{node}] No user named {sender}, emoji usage not recorded");
                    return Ok(());
                };

                store.append_usage(user_id, *emoji_id, node).await?;
                debug!("[{node}] Logged emoji {emoji_id} usage by {sender} (user {user_id})");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::mock::MemoryStore;
    use std::time::Duration;

    async fn wait_for_usage(store: &MemoryStore) -> bool {
        tokio::time::timeout(Duration::from_secs(2), async {
            while store.usage().is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .is_ok()
    }

    #[tokio::test]
    async fn test_known_sender_is_recorded() {
        let store = Arc::new(MemoryStore::default());
        store.add_user("alice", 7);
        let tracker = UsageTracker::new(store.clone());

        tracker.log_emoji("alice", 3, "vm1");

        assert!(wait_for_usage(&store).await);
        assert_eq!(store.usage(), vec![(7, 3, "vm1".to_string())]);
    }

    #[tokio::test]
    async fn test_unknown_sender_is_dropped() {
        let store = Arc::new(MemoryStore::default());
        store.add_user("alice", 7);
        let tracker = UsageTracker::new(store.clone());

        // Events are processed in order, so once alice's lands mallory's was skipped
        tracker.log_emoji("mallory", 3, "vm1");
        tracker.log_emoji("alice", 4, "vm1");

        assert!(wait_for_usage(&store).await);
        assert_eq!(store.usage(), vec![(7, 4, "vm1".to_string())]);
    }

    #[tokio::test]
    async fn test_store_failure_does_not_stop_logger() {
        let store = Arc::new(MemoryStore::default());
        store.add_user("alice", 7);
        store.fail("vm1", true);
        let tracker = UsageTracker::new(store.clone());

        tracker.log_emoji("alice", 3, "vm1");
        tracker.log_emoji("alice", 5, "vm2");

        assert!(wait_for_usage(&store).await);
        assert_eq!(store.usage(), vec![(7, 5, "vm2".to_string())]);
    }
}
