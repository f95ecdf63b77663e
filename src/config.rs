//! Leak check configuration
//!
//! Every check runs against an explicit [`Config`] value. There is no
//! process-wide mutable state: per-check overrides are made on a copy.
//!
//! Environment overrides (read by [`Config::from_env`]):
//! - `LEAKCHECK_TICK_MS`: poll interval in milliseconds
//! - `LEAKCHECK_TIMEOUT_MS`: default retry window in milliseconds

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::ignore::{IgnoreRule, IgnoreRules};
use crate::source::{ProcThreads, TaskSource};

/// Interval between re-checks while leaks remain
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Retry window used by `start`
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// How a leak check enumerates, filters and polls
#[derive(Clone)]
pub struct Config {
    pub tick_interval: Duration,
    pub timeout: Duration,
    ignore: IgnoreRules,
    source: Arc<dyn TaskSource>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            ignore: IgnoreRules::default(),
            source: Arc::new(ProcThreads::current()),
        }
    }

    /// Defaults with `LEAKCHECK_*` environment overrides applied
    pub fn from_env() -> Self {
        let mut config = Self::new();
        if let Some(tick) = env_millis("LEAKCHECK_TICK_MS") {
            config.tick_interval = tick;
        }
        if let Some(timeout) = env_millis("LEAKCHECK_TIMEOUT_MS") {
            config.timeout = timeout;
        }
        config
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add an ignore rule on top of the current list
    pub fn ignore(mut self, rule: IgnoreRule) -> Self {
        self.ignore.push(rule);
        self
    }

    /// Replace the whole ignore list
    pub fn with_ignore_rules(mut self, rules: IgnoreRules) -> Self {
        self.ignore = rules;
        self
    }

    pub fn with_source<S>(mut self, source: S) -> Self
    where
        S: TaskSource + 'static,
    {
        self.source = Arc::new(source);
        self
    }

    pub fn ignore_rules(&self) -> &IgnoreRules {
        &self.ignore
    }

    pub fn source(&self) -> &dyn TaskSource {
        self.source.as_ref()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("tick_interval", &self.tick_interval)
            .field("timeout", &self.timeout)
            .field("ignore", &self.ignore)
            .finish_non_exhaustive()
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    let value = std::env::var(key).ok()?;
    match value.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Some(Duration::from_millis(ms)),
        _ => {
            tracing::warn!(key, value = %value, "ignoring invalid duration override");
            None
        }
    }
}
