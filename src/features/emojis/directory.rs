//! Per-node emoji cache
//!
//! Each node maps to an immutable `EmojiSet` behind an `Arc`. A refresh builds
//! a complete new set and swaps the `Arc` in one insert, so readers only ever
//! see the previous or the new snapshot. Refreshes run one at a time, so a
//! slow refresh can never overwrite the result of one that started later.

use dashmap::DashMap;
use log::{debug, error, info};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

use crate::database::{EmojiRecord, EmojiStore};

/// Interval between scheduled refreshes
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Immutable snapshot of the emojis enabled on one node
#[derive(Debug, Default)]
pub struct EmojiSet {
    by_name: HashMap<String, EmojiRecord>,
}

impl EmojiSet {
    pub fn new(records: Vec<EmojiRecord>) -> Self {
        let by_name = records
            .into_iter()
            .map(|record| (record.name.clone(), record))
            .collect();
        EmojiSet { by_name }
    }

    pub fn get(&self, name: &str) -> Option<&EmojiRecord> {
        self.by_name.get(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Records sorted by name
    pub fn sorted(&self) -> Vec<&EmojiRecord> {
        let mut records: Vec<_> = self.by_name.values().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }
}

/// Shared emoji directory keyed by node id
#[derive(Clone)]
pub struct EmojiDirectory {
    store: Arc<dyn EmojiStore>,
    nodes: Arc<Vec<String>>,
    sets: Arc<DashMap<String, Arc<EmojiSet>>>,
    refresh_requested: Arc<Notify>,
    refresh_lock: Arc<Mutex<()>>,
}

impl EmojiDirectory {
    pub fn new(store: Arc<dyn EmojiStore>, nodes: Vec<String>) -> Self {
        EmojiDirectory {
            store,
            nodes: Arc::new(nodes),
            sets: Arc::new(DashMap::new()),
            refresh_requested: Arc::new(Notify::new()),
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Refresh every configured node
    pub async fn refresh(&self) {
        let nodes = Arc::clone(&self.nodes);
        self.refresh_nodes(&nodes).await;
    }

    /// Refresh the given nodes, replacing each cached set wholesale
    ///
    /// A failing node is cleared and logged; the remaining nodes still refresh.
    pub async fn refresh_nodes(&self, nodes: &[String]) {
        let _guard = self.refresh_lock.lock().await;
        for node in nodes {
            let set = match self.store.fetch_enabled_emojis(node).await {
                Ok(records) => {
                    debug!("[{node}] Loaded {} emoji(s)", records.len());
                    EmojiSet::new(records)
                }
                Err(e) => {
                    error!("[{node}] Failed to refresh emojis, clearing cache: {e}");
                    EmojiSet::default()
                }
            };
            self.sets.insert(node.clone(), Arc::new(set));
        }
    }

    /// Current snapshot for a node (empty before the first load)
    pub fn snapshot(&self, node: &str) -> Arc<EmojiSet> {
        self.sets
            .get(node)
            .map(|entry| Arc::clone(entry.value()))
            .unwrap_or_default()
    }

    /// Look up an emoji by name on a node
    pub fn lookup(&self, node: &str, name: &str) -> Option<EmojiRecord> {
        self.snapshot(node).get(name).cloned()
    }

    /// Ask the refresh loop to refresh now
    ///
    /// Non-blocking. Requests made while a refresh is pending coalesce.
    pub fn request_refresh(&self) {
        self.refresh_requested.notify_one();
    }

    /// Refresh on a fixed interval and whenever a refresh is requested
    pub async fn run_refresh_loop(self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately; startup already loaded once
        ticker.tick().await;

        info!("Emoji refresh loop started (interval: {}s)", interval.as_secs());

        loop {
            tokio::select! {
                _ = ticker.tick() => debug!("Scheduled emoji refresh"),
                _ = self.refresh_requested.notified() => debug!("Requested emoji refresh"),
            }
            self.refresh().await;
        }
    }
}
