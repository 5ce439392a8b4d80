//! Configuration Module
//!
//! Handles loading probe and channel settings from environment variables.

use std::env;
use std::time::Duration;

/// Runtime configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of banners kept in the cache (0 = unbounded)
    pub cache_capacity: usize,
    /// Read deadline in milliseconds (0 = no deadline)
    pub read_timeout_ms: u64,
    /// Write deadline in milliseconds (0 = no deadline)
    pub write_timeout_ms: u64,
    /// `host:port` targets to probe
    pub probe_targets: Vec<String>,
    /// Line written back to each target after its banner
    pub probe_greeting: Option<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum cached entries (default: 128)
    /// - `READ_TIMEOUT_MS` - Read deadline in milliseconds (default: 5000)
    /// - `WRITE_TIMEOUT_MS` - Write deadline in milliseconds (default: 5000)
    /// - `PROBE_TARGETS` - Comma-separated `host:port` list (default: empty)
    /// - `PROBE_GREETING` - Line sent after reading a banner (default: none)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_capacity: parse_var("CACHE_CAPACITY").unwrap_or(defaults.cache_capacity),
            read_timeout_ms: parse_var("READ_TIMEOUT_MS").unwrap_or(defaults.read_timeout_ms),
            write_timeout_ms: parse_var("WRITE_TIMEOUT_MS").unwrap_or(defaults.write_timeout_ms),
            probe_targets: env::var("PROBE_TARGETS")
                .map(|v| parse_targets(&v))
                .unwrap_or(defaults.probe_targets),
            probe_greeting: env::var("PROBE_GREETING").ok().filter(|g| !g.is_empty()),
        }
    }

    /// Read deadline as a `Duration`.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Write deadline as a `Duration`.
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_capacity: 128,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
            probe_targets: Vec::new(),
            probe_greeting: None,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn parse_targets(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}
