//! Configuration models for schedulers, registries, and categories.

pub mod gate;
pub mod scheduler;

pub use gate::{CategoryConfig, FailurePolicyKind, GateConfig, RegistryConfig};
pub use scheduler::SchedulerConfig;
