//! Build shared schedulers and per-category gates from configuration.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use tracing::info;

use crate::config::{CategoryConfig, FailurePolicyKind, GateConfig};
use crate::core::{
    Classify, ClassifiedPolicy, Registry, RequestGate, Scheduler, SchedulerError, Spawn,
};

/// Build one scheduler per entry in `cfg.schedulers`.
///
/// Each scheduler takes its map key as its name. Categories that reference
/// the same name share the returned scheduler.
///
/// # Errors
///
/// Returns `SchedulerError::InvalidConfig` when the configuration is invalid.
pub fn build_schedulers<S>(
    cfg: &GateConfig,
    spawner: S,
) -> Result<HashMap<String, Scheduler<S>>, SchedulerError>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    cfg.validate().map_err(SchedulerError::InvalidConfig)?;

    let mut schedulers = HashMap::with_capacity(cfg.schedulers.len());
    for (name, scheduler_cfg) in &cfg.schedulers {
        let scheduler = Scheduler::new(scheduler_cfg.clone().with_name(name), spawner.clone())?;
        schedulers.insert(name.clone(), scheduler);
    }
    Ok(schedulers)
}

/// Build the gate for `category` on top of already-built schedulers.
///
/// # Errors
///
/// Returns `SchedulerError::UnknownCategory` when the category is not
/// configured and `SchedulerError::UnknownScheduler` when its scheduler was
/// not built.
pub fn build_gate<K, E, S>(
    cfg: &GateConfig,
    category: &str,
    schedulers: &HashMap<String, Scheduler<S>>,
) -> Result<RequestGate<K, E, S>, SchedulerError>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    E: Classify + Send + 'static,
    S: Spawn + Send + Sync + 'static,
{
    let (gate, category_cfg) = base_gate(cfg, category, schedulers)?;
    let gate = match category_cfg.registry.policy {
        FailurePolicyKind::TripOnAny => gate,
        FailurePolicyKind::Classified => gate.with_policy(ClassifiedPolicy),
    };
    log_built(category, category_cfg);
    Ok(gate)
}

/// Build the gate for a category whose error type cannot classify itself.
///
/// Such a gate always trips on any failure, so the category must be
/// configured with the `trip_on_any` policy.
///
/// # Errors
///
/// Same as [`build_gate`], plus `SchedulerError::InvalidConfig` when the
/// category asks for the `classified` policy.
pub fn build_trip_on_any_gate<K, E, S>(
    cfg: &GateConfig,
    category: &str,
    schedulers: &HashMap<String, Scheduler<S>>,
) -> Result<RequestGate<K, E, S>, SchedulerError>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    E: Send + 'static,
    S: Spawn + Send + Sync + 'static,
{
    let (gate, category_cfg) = base_gate(cfg, category, schedulers)?;
    if category_cfg.registry.policy == FailurePolicyKind::Classified {
        return Err(SchedulerError::InvalidConfig(format!(
            "category '{category}' uses the classified policy but its error type cannot be classified"
        )));
    }
    log_built(category, category_cfg);
    Ok(gate)
}

/// Gate with the default policy, plus the category's configuration.
fn base_gate<'a, K, E, S>(
    cfg: &'a GateConfig,
    category: &str,
    schedulers: &HashMap<String, Scheduler<S>>,
) -> Result<(RequestGate<K, E, S>, &'a CategoryConfig), SchedulerError>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    E: Send + 'static,
    S: Spawn + Send + Sync + 'static,
{
    let category_cfg = cfg
        .categories
        .get(category)
        .ok_or_else(|| SchedulerError::UnknownCategory(category.to_string()))?;
    let scheduler = schedulers
        .get(&category_cfg.scheduler)
        .ok_or_else(|| SchedulerError::UnknownScheduler(category_cfg.scheduler.clone()))?
        .clone();

    let mut registry = Registry::new(category);
    if let Some(cool_down) = category_cfg.registry.cool_down() {
        registry = registry.with_cool_down(cool_down);
    }

    Ok((RequestGate::new(scheduler, registry), category_cfg))
}

fn log_built(category: &str, category_cfg: &CategoryConfig) {
    info!(
        category,
        scheduler = %category_cfg.scheduler,
        policy = ?category_cfg.registry.policy,
        cool_down_secs = ?category_cfg.registry.cool_down_secs,
        "gate built"
    );
}
