//! Connection supervision
//!
//! One task per endpoint owns that endpoint's connection for its whole life:
//! connect, run the session, then decide whether to reconnect. The live set
//! records which endpoints currently have an open transport.

use anyhow::{anyhow, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::command_handler::CommandHandler;
use crate::core::{AuthConfig, Config, EndpointConfig};
use crate::wire::transport;

use super::retry::{RetryPolicy, SessionEnd};
use super::session::run_message_loop;
use super::state::Session;

/// How long shutdown waits for each endpoint task to close
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

struct Inner {
    endpoints: Vec<EndpointConfig>,
    username: String,
    auth: AuthConfig,
    commands: CommandHandler,
    policy: RetryPolicy,
    /// Endpoints with an open transport
    live: DashMap<String, bool>,
    /// Endpoint tasks, one per node at most
    running: DashMap<String, JoinHandle<()>>,
    shutdown: watch::Sender<bool>,
    started: Instant,
}

/// Owns every endpoint connection
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<Inner>,
}

impl Supervisor {
    pub fn new(config: &Config, commands: CommandHandler, policy: RetryPolicy) -> Self {
        let (shutdown, _) = watch::channel(false);
        Supervisor {
            inner: Arc::new(Inner {
                endpoints: config.endpoints.clone(),
                username: config.username.clone(),
                auth: config.auth.clone(),
                commands,
                policy,
                live: DashMap::new(),
                running: DashMap::new(),
                shutdown,
                started: Instant::now(),
            }),
        }
    }

    /// Connect every endpoint, `stagger` apart
    pub async fn start(&self) {
        info!(
            "Starting {} endpoint connection(s), {}ms apart",
            self.inner.endpoints.len(),
            self.inner.policy.stagger.as_millis()
        );

        for (i, endpoint) in self.inner.endpoints.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.inner.policy.stagger).await;
            }
            if let Err(e) = self.connect(&endpoint.node) {
                error!("[{}] Failed to start connection: {e}", endpoint.node);
            }
        }
    }

    /// Start a connection to `node` with a fresh retry counter
    ///
    /// Returns false when the endpoint already has a connection (or is waiting
    /// to reconnect), or when shutdown has begun.
    pub fn connect(&self, node: &str) -> Result<bool> {
        let endpoint = self
            .inner
            .endpoints
            .iter()
            .find(|endpoint| endpoint.node == node)
            .cloned()
            .ok_or_else(|| anyhow!("Unknown node: {node}"))?;

        let shutdown = self.inner.shutdown.subscribe();
        if *shutdown.borrow() {
            debug!("[{node}] Ignoring connect during shutdown");
            return Ok(false);
        }

        match self.inner.running.entry(node.to_string()) {
            Entry::Occupied(_) => {
                debug!("[{node}] Connection already active");
                Ok(false)
            }
            Entry::Vacant(slot) => {
                let handle = tokio::spawn(run_endpoint(Arc::clone(&self.inner), endpoint, shutdown));
                slot.insert(handle);
                Ok(true)
            }
        }
    }

    /// Connected flag for every configured endpoint
    pub fn status(&self) -> BTreeMap<String, bool> {
        self.inner
            .endpoints
            .iter()
            .map(|endpoint| {
                let connected = self
                    .inner
                    .live
                    .get(&endpoint.node)
                    .map(|entry| *entry.value())
                    .unwrap_or(false);
                (endpoint.node.clone(), connected)
            })
            .collect()
    }

    /// Configured node ids, in configuration order
    pub fn nodes(&self) -> Vec<String> {
        self.inner
            .endpoints
            .iter()
            .map(|endpoint| endpoint.node.clone())
            .collect()
    }

    pub fn uptime(&self) -> Duration {
        self.inner.started.elapsed()
    }

    /// Close every connection with a normal close and wait for the tasks
    pub async fn shutdown(&self) {
        info!("Closing {} open connection(s)", self.inner.live.len());
        self.inner.shutdown.send_replace(true);

        let nodes: Vec<String> = self
            .inner
            .running
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        for node in nodes {
            if let Some((_, handle)) = self.inner.running.remove(&node) {
                if tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await.is_err() {
                    warn!("[{node}] Connection did not close within {SHUTDOWN_TIMEOUT:?}");
                }
            }
        }
    }
}

/// Connection lifecycle of one endpoint, including bounded reconnects
async fn run_endpoint(
    inner: Arc<Inner>,
    endpoint: EndpointConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let node = endpoint.node.clone();
    let mut retries = 0;

    loop {
        let end = connect_once(&inner, &endpoint, &mut shutdown).await;

        let Some(delay) = inner.policy.next_delay(&end, retries) else {
            if end.is_normal() {
                info!("[{node}] Connection {end}, not reconnecting");
            } else {
                error!("[{node}] Connection {end}, giving up after {retries} retries");
            }
            break;
        };

        retries += 1;
        warn!(
            "[{node}] Connection {end}, reconnecting in {:.1}s (attempt {retries}/{})",
            delay.as_secs_f32(),
            inner.policy.max_retries
        );

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => {
                info!("[{node}] Shutdown during reconnect delay");
                break;
            }
        }
    }

    inner.running.remove(&node);
}

/// One connection attempt, through to the end of its session
async fn connect_once(
    inner: &Inner,
    endpoint: &EndpointConfig,
    shutdown: &mut watch::Receiver<bool>,
) -> SessionEnd {
    let node = endpoint.node.as_str();
    info!("[{node}] Connecting to {}", endpoint.url);

    let origin = endpoint.origin();
    let connected = tokio::select! {
        result = transport::connect(&endpoint.url, &origin) => result,
        _ = shutdown.changed() => return SessionEnd::Shutdown,
    };
    let (mut writer, mut reader) = match connected {
        Ok(halves) => halves,
        Err(e) => return SessionEnd::Failed(format!("{e:#}")),
    };

    inner.live.insert(node.to_string(), true);
    let session = Session::new(node, inner.username.as_str(), inner.auth.clone());
    let end = run_message_loop(&mut writer, &mut reader, session, &inner.commands, shutdown).await;
    inner.live.remove(node);

    end
}
