//! Scheduler configuration.

use std::env;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::{AppResult, Priority};

/// Environment variable overriding the concurrency limit.
pub const ENV_CONCURRENCY_LIMIT: &str = "REQUEST_GATE_CONCURRENCY_LIMIT";
/// Environment variable overriding the default priority (`normal` or `high`).
pub const ENV_DEFAULT_PRIORITY: &str = "REQUEST_GATE_DEFAULT_PRIORITY";
/// Environment variable setting the per-task execution timeout in milliseconds.
pub const ENV_TASK_TIMEOUT_MS: &str = "REQUEST_GATE_TASK_TIMEOUT_MS";

const DEFAULT_CONCURRENCY_LIMIT: usize = 5;

fn default_name() -> String {
    "default".to_string()
}

const fn default_concurrency_limit() -> usize {
    DEFAULT_CONCURRENCY_LIMIT
}

/// Configuration for one scheduler (one resource domain).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Name used in logs, stats and audit events.
    #[serde(default = "default_name")]
    pub name: String,
    /// Maximum number of simultaneously executing tasks.
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,
    /// Priority used when a submission does not specify one.
    #[serde(default)]
    pub default_priority: Priority,
    /// Optional execution timeout per task, measured from admission.
    #[serde(default)]
    pub task_timeout_ms: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            default_priority: Priority::Normal,
            task_timeout_ms: None,
        }
    }
}

impl SchedulerConfig {
    /// Create a config with the given concurrency limit and defaults elsewhere.
    #[must_use]
    pub fn new(concurrency_limit: usize) -> Self {
        Self {
            concurrency_limit,
            ..Self::default()
        }
    }

    /// Set the scheduler name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the default priority.
    #[must_use]
    pub const fn with_default_priority(mut self, priority: Priority) -> Self {
        self.default_priority = priority;
        self
    }

    /// Set the per-task execution timeout.
    #[must_use]
    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Per-task execution timeout, if configured.
    pub const fn task_timeout(&self) -> Option<Duration> {
        match self.task_timeout_ms {
            Some(ms) => Some(Duration::from_millis(ms)),
            None => None,
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency_limit == 0 {
            return Err("concurrency_limit must be greater than 0".into());
        }
        if self.task_timeout_ms == Some(0) {
            return Err("task_timeout_ms must be greater than 0 when set".into());
        }
        if self.name.trim().is_empty() {
            return Err("name must not be empty".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, parsed or validated.
    pub fn from_path(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading scheduler config {}", path.display()))?;
        Self::from_json_str(&raw)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("loading scheduler config {}", path.display()))
    }

    /// Build configuration from environment variables, loading `.env` first.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Fails when a variable is set but cannot be parsed, or validation fails.
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        let mut cfg = Self::default();
        if let Some(raw) = env_opt(ENV_CONCURRENCY_LIMIT) {
            cfg.concurrency_limit = raw
                .parse::<usize>()
                .with_context(|| format!("{ENV_CONCURRENCY_LIMIT}=`{raw}` is not a number"))?;
        }
        if let Some(raw) = env_opt(ENV_DEFAULT_PRIORITY) {
            cfg.default_priority = raw.parse::<Priority>().map_err(anyhow::Error::msg)?;
        }
        if let Some(raw) = env_opt(ENV_TASK_TIMEOUT_MS) {
            cfg.task_timeout_ms = Some(
                raw.parse::<u64>()
                    .with_context(|| format!("{ENV_TASK_TIMEOUT_MS}=`{raw}` is not a number"))?,
            );
        }
        cfg.validate().map_err(anyhow::Error::msg)?;
        Ok(cfg)
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}
