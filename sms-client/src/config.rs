//! Configuration for conversation sessions.
//!
//! Loaded from a TOML file, or built in code. Every field has a default, so
//! an empty file (or an omitted section) is a valid configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration shared by every session a manager opens.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    /// History fetch configuration.
    #[serde(default)]
    pub sync: SyncConfig,
    /// Notification configuration.
    #[serde(default)]
    pub events: EventsConfig,
}

/// History fetch configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Milliseconds a caller waits for a requested page (default: 30000).
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    /// Messages requested from the device per page (default: 10).
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Let a second caller for a pending conversation wait for the
    /// in-flight fetch instead of returning at once (default: true).
    #[serde(default = "default_coalesce_waiters")]
    pub coalesce_waiters: bool,
}

/// Notification configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    /// Capacity of the broadcast channel; slow subscribers lag past it
    /// (default: 256).
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

fn default_fetch_timeout_ms() -> u64 {
    30_000 // 30 seconds
}

fn default_page_size() -> u32 {
    10
}

fn default_coalesce_waiters() -> bool {
    true
}

fn default_event_capacity() -> usize {
    256
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: default_fetch_timeout_ms(),
            page_size: default_page_size(),
            coalesce_waiters: default_coalesce_waiters(),
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

impl SyncConfig {
    /// Fetch timeout as a [`Duration`].
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Set the fetch timeout.
    ///
    /// Stored in milliseconds; a non-zero timeout below one millisecond is
    /// rounded up to one.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        let mut millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        if millis == 0 && !timeout.is_zero() {
            millis = 1;
        }
        self.sync.fetch_timeout_ms = millis;
        self
    }

    /// Set the page size.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.sync.page_size = page_size;
        self
    }

    /// Enable or disable waiter coalescing.
    pub fn with_coalesce_waiters(mut self, coalesce: bool) -> Self {
        self.sync.coalesce_waiters = coalesce;
        self
    }

    /// Set the event channel capacity.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.events.capacity = capacity;
        self
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}
