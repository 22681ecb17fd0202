//! Scheduler configuration structures.

use serde::{Deserialize, Serialize};

/// Environment variable overriding [`SchedulerConfig::tick_period_ms`].
pub const ENV_TICK_PERIOD_MS: &str = "SCHEDULER_TICK_PERIOD_MS";
/// Environment variable overriding [`SchedulerConfig::max_pending`].
pub const ENV_MAX_PENDING: &str = "SCHEDULER_MAX_PENDING";
/// Environment variable overriding [`SchedulerConfig::audit_capacity`].
pub const ENV_AUDIT_CAPACITY: &str = "SCHEDULER_AUDIT_CAPACITY";
/// Environment variable overriding [`SchedulerConfig::thread_name`].
pub const ENV_THREAD_NAME: &str = "SCHEDULER_THREAD_NAME";

const MAX_TICK_PERIOD_MS: u64 = 1000;

/// Root scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Period between ticks of the driver thread, in milliseconds.
    pub tick_period_ms: u64,
    /// Maximum submissions waiting for admission before `submit` fails.
    pub max_pending: usize,
    /// Capacity of the in-memory audit buffer. Zero disables recording.
    pub audit_capacity: usize,
    /// Name given to the driver thread.
    pub thread_name: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 20,
            max_pending: 256,
            audit_capacity: 1024,
            thread_name: "command-scheduler".into(),
        }
    }
}

impl SchedulerConfig {
    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_period_ms == 0 {
            return Err("tick_period_ms must be greater than 0".into());
        }
        if self.tick_period_ms > MAX_TICK_PERIOD_MS {
            return Err(format!(
                "tick_period_ms must be at most {MAX_TICK_PERIOD_MS}"
            ));
        }
        if self.max_pending == 0 {
            return Err("max_pending must be greater than 0".into());
        }
        if self.thread_name.trim().is_empty() {
            return Err("thread_name must not be empty".into());
        }
        Ok(())
    }

    /// Parse scheduler configuration from a JSON string and validate.
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns a message on parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from the process environment, reading a `.env`
    /// file first if one exists. Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns a message if a variable does not parse or validation fails.
    pub fn from_env() -> Result<Self, String> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!("failed to read .env file: {e}");
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns a message if a variable does not parse or validation fails.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(v) = lookup(ENV_TICK_PERIOD_MS) {
            cfg.tick_period_ms = parse_var(ENV_TICK_PERIOD_MS, &v)?;
        }
        if let Some(v) = lookup(ENV_MAX_PENDING) {
            cfg.max_pending = parse_var(ENV_MAX_PENDING, &v)?;
        }
        if let Some(v) = lookup(ENV_AUDIT_CAPACITY) {
            cfg.audit_capacity = parse_var(ENV_AUDIT_CAPACITY, &v)?;
        }
        if let Some(v) = lookup(ENV_THREAD_NAME) {
            cfg.thread_name = v;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| format!("{key}: invalid value `{value}`: {e}"))
}
