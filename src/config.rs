//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::time::Duration;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold
    pub max_entries: u64,
    /// Interval between background sync cycles in milliseconds
    pub sync_period_ms: u64,
    /// Foreground lock acquisition timeout in microseconds
    pub lock_timeout_us: u64,
    /// Path of the JSON dump backing the cache
    pub db_path: String,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `SYNC_PERIOD_MS` - Sync cycle period in milliseconds (default: 1000)
    /// - `LOCK_TIMEOUT_US` - Lock timeout in microseconds (default: 100000)
    /// - `DB_PATH` - Backing store file (default: db.json)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: env::var("MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_entries),
            sync_period_ms: env::var("SYNC_PERIOD_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.sync_period_ms),
            lock_timeout_us: env::var("LOCK_TIMEOUT_US")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.lock_timeout_us),
            db_path: env::var("DB_PATH").unwrap_or(defaults.db_path),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
        }
    }

    pub fn sync_period(&self) -> Duration {
        Duration::from_millis(self.sync_period_ms)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_micros(self.lock_timeout_us)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            sync_period_ms: 1000,
            lock_timeout_us: 100_000,
            db_path: "db.json".to_string(),
            server_port: 3000,
        }
    }
}
