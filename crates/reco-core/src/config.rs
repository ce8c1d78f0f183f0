//! Request-scoped configuration.

use serde::Deserialize;
use std::time::Duration;

/// Immutable configuration for one recommendation request.
///
/// ## Usage
/// ```
/// use reco_core::Config;
/// use std::time::Duration;
///
/// let config = Config::new(20).with_max_time(Duration::from_millis(50));
/// assert_eq!(config.limit(), 20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "RawConfig")]
pub struct Config {
    limit: usize,
    max_time: Duration,
}

impl Config {
    /// Configuration asking for `limit` results with no time budget.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            max_time: Duration::MAX,
        }
    }

    /// Set the wall-clock budget engines should respect (default: unbounded)
    pub fn with_max_time(mut self, max_time: Duration) -> Self {
        self.max_time = max_time;
        self
    }

    /// Number of results the caller intends to present.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Time budget for cooperative early exit.
    pub fn max_time(&self) -> Duration {
        self.max_time
    }
}

/// Serialized form: `{"limit": 10, "max_time_ms": 250}`.
#[derive(Deserialize)]
struct RawConfig {
    limit: usize,
    #[serde(default)]
    max_time_ms: Option<u64>,
}

impl From<RawConfig> for Config {
    fn from(raw: RawConfig) -> Self {
        let config = Config::new(raw.limit);
        match raw.max_time_ms {
            Some(ms) => config.with_max_time(Duration::from_millis(ms)),
            None => config,
        }
    }
}
