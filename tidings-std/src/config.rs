//! Configuration for the dispatch loop and the admission scheduler.
//!
//! Everything is plain data deserializable with `serde`; missing fields take
//! their defaults. Reading files or the environment is left to the caller.
//!
//! ```toml
//! [dispatcher]
//! poll_interval_ms = 300
//! concurrent = true
//!
//! [scheduler]
//! poll_interval_ms = 50
//!
//! [[scheduler.clauses]]
//! quota = 30
//! release_delay_ms = 1500
//! scope = "global"
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors produced while reading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("invalid configuration syntax: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Both halves of the configuration in one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TidingsConfig {
    /// The `[dispatcher]` table.
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    /// The `[scheduler]` table.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl TidingsConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.dispatcher.validate()?;
        config.scheduler.validate()?;
        Ok(config)
    }
}

/// Settings of the poll-and-dispatch loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Minimum time between the starts of two fetches.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Server-side wait for one fetch.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Lifetime of a batch scope before it is cancelled.
    #[serde(default = "default_handler_timeout_secs")]
    pub handler_timeout_secs: u64,
    /// Handle the updates of a batch on separate tasks.
    #[serde(default = "default_true")]
    pub concurrent: bool,
}

fn default_poll_interval_ms() -> u64 {
    300
}
fn default_fetch_timeout_secs() -> u64 {
    10
}
fn default_handler_timeout_secs() -> u64 {
    60
}
fn default_true() -> bool {
    true
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            handler_timeout_secs: default_handler_timeout_secs(),
            concurrent: default_true(),
        }
    }
}

impl DispatcherConfig {
    /// Parse and validate a TOML document holding only dispatcher settings.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the loop cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.handler_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "dispatcher.handler_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    /// [`poll_interval_ms`](Self::poll_interval_ms) as a `Duration`.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// [`fetch_timeout_secs`](Self::fetch_timeout_secs) as a `Duration`.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// [`handler_timeout_secs`](Self::handler_timeout_secs) as a `Duration`.
    pub fn handler_timeout(&self) -> Duration {
        Duration::from_secs(self.handler_timeout_secs)
    }

    /// Set the poll interval, millisecond precision.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the fetch timeout, second precision.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout_secs = timeout.as_secs();
        self
    }

    /// Set the batch scope lifetime, second precision and at least one second.
    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Run handlers inline, one update after the other.
    pub fn serial(mut self) -> Self {
        self.concurrent = false;
        self
    }
}

/// Which ids a clause keeps a budget for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClauseScope {
    /// One counter shared by every call.
    Global,
    /// One counter per conversation (negative ids).
    Conversation,
    /// One counter per originator (positive ids).
    Originator,
}

/// One rate budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClauseConfig {
    /// Maximum weight committed per counter at any time.
    pub quota: u32,
    /// How long committed weight is held after the call is done.
    pub release_delay_ms: u64,
    /// Which ids get a counter.
    pub scope: ClauseScope,
}

impl ClauseConfig {
    /// [`release_delay_ms`](Self::release_delay_ms) as a `Duration`.
    pub fn release_delay(&self) -> Duration {
        Duration::from_millis(self.release_delay_ms)
    }
}

/// Settings of the admission scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Sleep between two admission attempts.
    #[serde(default = "default_admission_poll_ms")]
    pub poll_interval_ms: u64,
    /// Budgets to enforce. Empty means the default policy.
    #[serde(default)]
    pub clauses: Vec<ClauseConfig>,
}

fn default_admission_poll_ms() -> u64 {
    50
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_admission_poll_ms(),
            clauses: Vec::new(),
        }
    }
}

impl SchedulerConfig {
    /// Parse and validate a TOML document holding only scheduler settings.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject zero quotas, zero delays and a zero polling interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "scheduler.poll_interval_ms must be positive".into(),
            ));
        }
        for (index, clause) in self.clauses.iter().enumerate() {
            if clause.quota == 0 {
                return Err(ConfigError::Invalid(format!(
                    "scheduler.clauses[{index}].quota must be positive"
                )));
            }
            if clause.release_delay_ms == 0 {
                return Err(ConfigError::Invalid(format!(
                    "scheduler.clauses[{index}].release_delay_ms must be positive"
                )));
            }
        }
        Ok(())
    }

    /// [`poll_interval_ms`](Self::poll_interval_ms) as a `Duration`.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
