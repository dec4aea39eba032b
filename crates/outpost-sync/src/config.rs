//! # Sync Configuration
//!
//! Configuration management for the queue, engine, cache and connectivity probe.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     OUTPOST_DB_PATH=/var/lib/outpost/outpost.db                        │
//! │     OUTPOST_MAX_RETRIES=5                                              │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/outpost/outpost.toml (Linux)                             │
//! │     ~/Library/Application Support/com.outpost.outpost/... (macOS)      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     MAX_RETRIES = 3, 1 s retry delay, 30 s attempt timeout, 1 h TTL    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # outpost.toml
//! [store]
//! database_path = "/var/lib/outpost/outpost.db"
//! max_connections = 4
//!
//! [sync]
//! max_retries = 3
//! retry_delay_ms = 1000
//! attempt_timeout_secs = 30
//!
//! [cache]
//! default_ttl_secs = 3600
//!
//! [connectivity]
//! probe_addr = "api.example.com:443"
//! probe_interval_secs = 15
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use outpost_core::validation::validate_max_retries;
use outpost_core::{
    DEFAULT_ATTEMPT_TIMEOUT_SECS, DEFAULT_CACHE_TTL_SECS, DEFAULT_RETRY_DELAY_MS, MAX_RETRIES,
};

use crate::connectivity::ProbeConfig;
use crate::engine::RetryPolicy;
use crate::error::{SyncError, SyncResult};

const DATABASE_FILE: &str = "outpost.db";
const CONFIG_FILE: &str = "outpost.toml";

// =============================================================================
// Store Settings
// =============================================================================

/// Where and how the local store is opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Path to the SQLite file. Defaults to the platform data directory.
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    4
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            database_path: None,
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Retry policy for the sync engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Failed attempts after which an item becomes `failed`.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Pause after a retryable failure before the next item (milliseconds).
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// Upper bound on a single handler call (seconds).
    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_secs: u64,
}

fn default_max_retries() -> u32 {
    MAX_RETRIES
}
fn default_retry_delay() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}
fn default_attempt_timeout() -> u64 {
    DEFAULT_ATTEMPT_TIMEOUT_SECS
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay(),
            attempt_timeout_secs: default_attempt_timeout(),
        }
    }
}

// =============================================================================
// Cache Settings
// =============================================================================

/// Read cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// TTL used by `CacheLayer::cache_data_default` (seconds).
    #[serde(default = "default_ttl")]
    pub default_ttl_secs: u64,
}

fn default_ttl() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            default_ttl_secs: default_ttl(),
        }
    }
}

// =============================================================================
// Connectivity Settings
// =============================================================================

/// TCP reachability probe settings.
///
/// Without a `probe_addr` no probe runs, and the embedding application is
/// expected to feed `ConnectivityMonitor::set_online` itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivitySettings {
    /// `host:port` to open a TCP connection to.
    #[serde(default)]
    pub probe_addr: Option<String>,

    /// Time between probes while online (seconds).
    #[serde(default = "default_probe_interval")]
    pub probe_interval_secs: u64,

    /// Connect timeout per probe (seconds).
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// First wait after going offline (milliseconds).
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Longest wait between probes while offline (seconds).
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
}

fn default_probe_interval() -> u64 {
    15
}
fn default_probe_timeout() -> u64 {
    5
}
fn default_initial_backoff() -> u64 {
    500
}
fn default_max_backoff() -> u64 {
    60
}

impl Default for ConnectivitySettings {
    fn default() -> Self {
        ConnectivitySettings {
            probe_addr: None,
            probe_interval_secs: default_probe_interval(),
            probe_timeout_secs: default_probe_timeout(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub connectivity: ConnectivitySettings,
}

impl SyncConfig {
    /// Creates a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (outpost.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path).map_err(|e| {
                    SyncError::ConfigLoadFailed(format!("{}: {}", path.display(), e))
                })?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        validate_max_retries(self.sync.max_retries)
            .map_err(|e| SyncError::InvalidConfig(e.to_string()))?;

        if self.sync.attempt_timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "attempt_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.cache.default_ttl_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "default_ttl_secs must be greater than 0".into(),
            ));
        }

        if self.store.max_connections == 0 {
            return Err(SyncError::InvalidConfig(
                "max_connections must be greater than 0".into(),
            ));
        }

        if let Some(ref addr) = self.connectivity.probe_addr {
            let valid_port = addr
                .rsplit_once(':')
                .map(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
                .unwrap_or(false);
            if !valid_port {
                return Err(SyncError::InvalidConfig(format!(
                    "probe_addr must be host:port, got: {}",
                    addr
                )));
            }
        }

        if self.connectivity.probe_interval_secs == 0 || self.connectivity.probe_timeout_secs == 0
        {
            return Err(SyncError::InvalidConfig(
                "probe interval and timeout must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup (the process environment in
    /// production, a map in tests).
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("OUTPOST_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.store.database_path = Some(PathBuf::from(path));
        }

        if let Some(value) = lookup("OUTPOST_MAX_RETRIES") {
            match value.parse::<u32>() {
                Ok(n) => self.sync.max_retries = n,
                Err(_) => warn!(value = %value, "Ignoring invalid OUTPOST_MAX_RETRIES"),
            }
        }

        if let Some(value) = lookup("OUTPOST_RETRY_DELAY_MS") {
            match value.parse::<u64>() {
                Ok(ms) => self.sync.retry_delay_ms = ms,
                Err(_) => warn!(value = %value, "Ignoring invalid OUTPOST_RETRY_DELAY_MS"),
            }
        }

        if let Some(value) = lookup("OUTPOST_ATTEMPT_TIMEOUT_SECS") {
            match value.parse::<u64>() {
                Ok(secs) => self.sync.attempt_timeout_secs = secs,
                Err(_) => warn!(value = %value, "Ignoring invalid OUTPOST_ATTEMPT_TIMEOUT_SECS"),
            }
        }

        if let Some(value) = lookup("OUTPOST_CACHE_TTL_SECS") {
            match value.parse::<u64>() {
                Ok(secs) => self.cache.default_ttl_secs = secs,
                Err(_) => warn!(value = %value, "Ignoring invalid OUTPOST_CACHE_TTL_SECS"),
            }
        }

        if let Some(addr) = lookup("OUTPOST_PROBE_ADDR") {
            debug!(addr = %addr, "Overriding probe address from environment");
            self.connectivity.probe_addr = Some(addr);
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "outpost", "outpost")
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Returns the configured database path, or the platform default.
    pub fn database_path(&self) -> SyncResult<PathBuf> {
        if let Some(ref path) = self.store.database_path {
            return Ok(path.clone());
        }

        Self::project_dirs()
            .map(|dirs| dirs.data_dir().join(DATABASE_FILE))
            .ok_or_else(|| SyncError::InvalidConfig("No data directory available".into()))
    }

    /// Builds the store configuration, creating the parent directory.
    pub fn store_config(&self) -> SyncResult<outpost_store::StoreConfig> {
        let path = self.database_path()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    SyncError::ConfigLoadFailed(format!("{}: {}", parent.display(), e))
                })?;
            }
        }

        Ok(outpost_store::StoreConfig::new(path).max_connections(self.store.max_connections))
    }

    /// Returns the engine's retry policy.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.sync.max_retries,
            retry_delay: Duration::from_millis(self.sync.retry_delay_ms),
            attempt_timeout: Duration::from_secs(self.sync.attempt_timeout_secs),
        }
    }

    /// Returns the default cache TTL.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.default_ttl_secs)
    }

    /// Returns the probe configuration, if a probe address is set.
    pub fn probe_config(&self) -> Option<ProbeConfig> {
        let c = &self.connectivity;
        c.probe_addr.as_ref().map(|addr| ProbeConfig {
            addr: addr.clone(),
            interval: Duration::from_secs(c.probe_interval_secs),
            timeout: Duration::from_secs(c.probe_timeout_secs),
            initial_backoff: Duration::from_millis(c.initial_backoff_ms),
            max_backoff: Duration::from_secs(c.max_backoff_secs),
        })
    }
}
