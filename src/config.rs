//! Configuration Module
//!
//! Handles loading cache and server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;

/// Default namespace the snapshot is stored under.
pub const DEFAULT_PERSISTENCE_KEY: &str = "farm_cache";

// == Cache Config ==
/// Options recognized by the cache itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold
    pub max_size: usize,
    /// Default TTL in milliseconds for entries without explicit TTL
    pub ttl_ms: u64,
    /// Interval between proactive sweeps in milliseconds, 0 disables them
    pub cleanup_interval_ms: u64,
    /// Whether snapshots are written to and restored from storage
    pub enable_persistence: bool,
    /// Storage key the snapshot lives under
    pub persistence_key: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 100,
            ttl_ms: 300_000,
            cleanup_interval_ms: 60_000,
            enable_persistence: true,
            persistence_key: DEFAULT_PERSISTENCE_KEY.to_string(),
        }
    }
}

impl CacheConfig {
    /// Loads cache options from the environment.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_SIZE` - Maximum cache entries (default: 100)
    /// - `CACHE_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `CACHE_CLEANUP_INTERVAL_MS` - Sweep interval in milliseconds (default: 60000)
    /// - `CACHE_ENABLE_PERSISTENCE` - `true`/`false`/`1`/`0` (default: true)
    /// - `CACHE_PERSISTENCE_KEY` - Snapshot storage key (default: `farm_cache`)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_size: env_or("CACHE_MAX_SIZE", defaults.max_size),
            ttl_ms: env_or("CACHE_TTL_MS", defaults.ttl_ms),
            cleanup_interval_ms: env_or("CACHE_CLEANUP_INTERVAL_MS", defaults.cleanup_interval_ms),
            enable_persistence: env::var("CACHE_ENABLE_PERSISTENCE")
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.enable_persistence),
            persistence_key: env::var("CACHE_PERSISTENCE_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.persistence_key),
        }
    }
}

// == Server Config ==
/// Configuration for the inspection server binary.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache options
    pub cache: CacheConfig,
    /// HTTP server port
    pub server_port: u16,
    /// Directory snapshots are written to
    pub data_dir: PathBuf,
    /// Interval between stats log lines in milliseconds, 0 disables them
    pub stats_log_interval_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - All of [`CacheConfig::from_env`]
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_DATA_DIR` - Snapshot directory (default: `./data`)
    /// - `STATS_LOG_INTERVAL_MS` - Stats log interval (default: 30000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache: CacheConfig::from_env(),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            data_dir: env::var("CACHE_DATA_DIR")
                .ok()
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            stats_log_interval_ms: env_or("STATS_LOG_INTERVAL_MS", defaults.stats_log_interval_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            server_port: 3000,
            data_dir: PathBuf::from("./data"),
            stats_log_interval_ms: 30_000,
        }
    }
}

/// Reads and parses an environment variable, falling back on absence or parse failure.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
