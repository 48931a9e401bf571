//! Registry and per-category configuration.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::SchedulerConfig;

/// Which failure policy a category's gate uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicyKind {
    /// Every failure trips the key.
    #[default]
    TripOnAny,
    /// Only failures the error classifies as permanent trip the key.
    Classified,
}

/// Circuit-breaker registry configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Seconds after which a failed key may be attempted again.
    /// `None` keeps failures until reset.
    #[serde(default)]
    pub cool_down_secs: Option<u64>,
    /// Failure classification policy.
    #[serde(default)]
    pub policy: FailurePolicyKind,
}

impl RegistryConfig {
    /// Cool-down as a duration.
    pub const fn cool_down(&self) -> Option<Duration> {
        match self.cool_down_secs {
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        }
    }
}

/// One data category: which scheduler it uses and how its registry behaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Name of the scheduler in [`GateConfig::schedulers`].
    pub scheduler: String,
    /// Registry settings for this category.
    #[serde(flatten)]
    pub registry: RegistryConfig,
}

/// Root configuration: shared schedulers and per-category gates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Map of scheduler name to configuration.
    pub schedulers: HashMap<String, SchedulerConfig>,
    /// Map of category name to configuration.
    #[serde(default)]
    pub categories: HashMap<String, CategoryConfig>,
}

impl GateConfig {
    /// Validate all schedulers and category references.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.schedulers.is_empty() {
            return Err("at least one scheduler must be defined".into());
        }
        for (name, scheduler) in &self.schedulers {
            scheduler
                .validate()
                .map_err(|e| format!("scheduler `{name}` invalid: {e}"))?;
        }
        for (name, category) in &self.categories {
            if !self.schedulers.contains_key(&category.scheduler) {
                return Err(format!(
                    "category `{name}` references unknown scheduler `{}`",
                    category.scheduler
                ));
            }
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
}
