//! # Connectivity Monitor
//!
//! Tracks online/offline state and drains the queue when the link returns.
//!
//! ## Signal Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Connectivity → Auto Sync                             │
//! │                                                                         │
//! │  Signal sources                                                        │
//! │  ├── platform adapter ── set_online(bool)                              │
//! │  └── TCP probe ───────── spawn_tcp_probe(ProbeConfig)                  │
//! │              │                                                          │
//! │              ▼                                                          │
//! │     watch::Sender<bool>  (latest state, change notifications)          │
//! │              │                                                          │
//! │              ▼                                                          │
//! │  auto-sync listener (AutoSyncGuard)                                    │
//! │     offline ──► online edge                                            │
//! │        ├── spawn drain(handler)                                        │
//! │        │     └── DrainInProgress? log and skip                         │
//! │        └── clear_expired_cache() (if a cache is attached)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Probe Backoff
//! ```text
//! online:   probe ── interval ── probe ── interval ── ...
//! offline:  probe ── 500ms ── probe ── 1s ── probe ── 2s ── ... (max 60s)
//!           (reset as soon as a probe succeeds)
//! ```

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::CacheLayer;
use crate::engine::{SyncEngine, SyncHandler};
use crate::error::SyncError;

// =============================================================================
// Connectivity Monitor
// =============================================================================

/// Shared online/offline state.
///
/// Cloning is cheap: clones observe and update the same state.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    state: Arc<watch::Sender<bool>>,
}

impl ConnectivityMonitor {
    /// Creates a monitor with a known initial state.
    pub fn new(online: bool) -> Self {
        let (state, _) = watch::channel(online);
        ConnectivityMonitor {
            state: Arc::new(state),
        }
    }

    /// Returns the last reported state.
    pub fn is_online(&self) -> bool {
        *self.state.borrow()
    }

    /// Reports the current state. Listeners only wake on an actual change.
    pub fn set_online(&self, online: bool) {
        let changed = self.state.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            *current = online;
            true
        });

        if changed {
            info!(online, "Connectivity changed");
        }
    }

    /// Returns a receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    /// Drains through `handler` on every offline→online transition.
    ///
    /// The listener runs until the returned guard is dropped or unsubscribed.
    /// A drain that is already running when the guard goes away finishes
    /// its snapshot.
    pub fn enable_auto_sync(
        &self,
        engine: SyncEngine,
        handler: Arc<dyn SyncHandler>,
    ) -> AutoSyncGuard {
        self.spawn_listener(engine, handler, None)
    }

    /// Like [`ConnectivityMonitor::enable_auto_sync`], and also sweeps
    /// expired cache entries after each reconnect drain.
    pub fn enable_auto_sync_with_cache(
        &self,
        engine: SyncEngine,
        handler: Arc<dyn SyncHandler>,
        cache: CacheLayer,
    ) -> AutoSyncGuard {
        self.spawn_listener(engine, handler, Some(cache))
    }

    fn spawn_listener(
        &self,
        engine: SyncEngine,
        handler: Arc<dyn SyncHandler>,
        cache: Option<CacheLayer>,
    ) -> AutoSyncGuard {
        let mut rx = self.state.subscribe();

        let task = tokio::spawn(async move {
            let mut was_online = *rx.borrow_and_update();
            debug!(online = was_online, "Auto sync listening");

            while rx.changed().await.is_ok() {
                let online = *rx.borrow_and_update();
                if online && !was_online {
                    tokio::spawn(reconnect_drain(
                        engine.clone(),
                        handler.clone(),
                        cache.clone(),
                    ));
                }
                was_online = online;
            }

            debug!("Connectivity source closed, auto sync stopping");
        });

        AutoSyncGuard { task: Some(task) }
    }

    /// Starts a TCP reachability probe feeding this monitor.
    pub fn spawn_tcp_probe(&self, config: ProbeConfig) -> ProbeHandle {
        let monitor = self.clone();
        let task = tokio::spawn(async move {
            info!(addr = %config.addr, "Connectivity probe starting");
            let mut backoff = config.create_backoff();

            loop {
                let online = probe_once(&config.addr, config.timeout).await;
                monitor.set_online(online);

                let wait = if online {
                    backoff.reset();
                    config.interval
                } else {
                    backoff.next_backoff().unwrap_or(config.max_backoff)
                };

                debug!(online, ?wait, "Next connectivity probe");
                tokio::time::sleep(wait).await;
            }
        });

        ProbeHandle { task }
    }
}

/// One drain triggered by a reconnect, then the optional cache sweep.
async fn reconnect_drain(
    engine: SyncEngine,
    handler: Arc<dyn SyncHandler>,
    cache: Option<CacheLayer>,
) {
    match engine.drain(handler.as_ref()).await {
        Ok(report) => {
            info!(
                succeeded = report.succeeded,
                failed = report.failed,
                "Reconnect drain finished"
            );
        }
        Err(SyncError::DrainInProgress) => {
            debug!("Drain already running, reconnect event skipped");
            return;
        }
        Err(e) => {
            error!(error = %e, "Reconnect drain failed");
        }
    }

    if let Some(cache) = cache {
        if let Err(e) = cache.clear_expired_cache().await {
            warn!(error = %e, "Cache sweep after reconnect failed");
        }
    }
}

/// Returns true if a TCP connection to `addr` opens within `timeout`.
pub async fn probe_once(addr: &str, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            debug!(addr = %addr, error = %e, "Probe connect failed");
            false
        }
        Err(_) => {
            debug!(addr = %addr, ?timeout, "Probe timed out");
            false
        }
    }
}

// =============================================================================
// Guards and Handles
// =============================================================================

/// Keeps the auto-sync listener alive. Dropping it detaches the listener.
#[derive(Debug)]
pub struct AutoSyncGuard {
    task: Option<JoinHandle<()>>,
}

impl AutoSyncGuard {
    /// Detaches the listener now.
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    /// Returns true while the listener is attached.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn detach(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Auto sync listener detached");
        }
    }
}

impl Drop for AutoSyncGuard {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Probe settings.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// `host:port` to connect to.
    pub addr: String,

    /// Time between probes while online.
    pub interval: Duration,

    /// Connect timeout per probe.
    pub timeout: Duration,

    /// First wait after a failed probe.
    pub initial_backoff: Duration,

    /// Longest wait between probes while offline.
    pub max_backoff: Duration,
}

impl ProbeConfig {
    /// Creates a probe config with default timings.
    pub fn new(addr: impl Into<String>) -> Self {
        ProbeConfig {
            addr: addr.into(),
            interval: Duration::from_secs(15),
            timeout: Duration::from_secs(5),
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(60),
        }
    }

    /// Creates the exponential backoff used while offline.
    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_backoff,
            max_interval: self.max_backoff,
            multiplier: 2.0,
            max_elapsed_time: None, // Probe forever
            ..Default::default()
        }
    }
}

/// Stops the probe when dropped.
#[derive(Debug)]
pub struct ProbeHandle {
    task: JoinHandle<()>,
}

impl ProbeHandle {
    /// Stops the probe.
    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for ProbeHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
