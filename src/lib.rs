//! # Prometheus Request Gate
//!
//! Bounded, prioritised scheduling of remote-data operations with per-key
//! deduplication and a session circuit breaker.
//!
//! Screens that fan out many lookups against one slow service (per-member
//! hours, per-member costs, product catalogues) need three things:
//!
//! - **A concurrency ceiling**: at most N calls in flight per service, the rest
//!   wait in a FIFO queue with a high-priority lane.
//! - **Deduplication**: two callers asking for the same key share one attempt
//!   instead of issuing two identical calls.
//! - **A circuit breaker**: a key whose last attempt failed is not retried
//!   until it is reset, so one bad member does not hammer the backend.
//!
//! The scheduler covers the first; the registry and the gate cover the rest.
//!
//! ```rust,ignore
//! use prometheus_request_gate::config::SchedulerConfig;
//! use prometheus_request_gate::core::{Priority, Registry, RequestGate, Scheduler};
//! use prometheus_request_gate::runtime::TokioSpawner;
//!
//! let scheduler = Scheduler::new(SchedulerConfig::new(5), TokioSpawner::current())?;
//! let gate = RequestGate::new(scheduler, Registry::new("contracted_hours"));
//!
//! let submission = gate.guarded_submit(
//!     (member_id, period.clone()),
//!     move || async move { client.contracted_hours(member_id, &period).await },
//!     Priority::Normal,
//! );
//! if let Some(outcome) = submission.wait().await {
//!     // Ok(hours) or Err(TaskError::...)
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Scheduler, registry, gate and task model.
pub mod core;
/// Configuration models for schedulers and categories.
pub mod config;
/// Builders that wire schedulers and gates from configuration.
pub mod builders;
/// Queue storage.
pub mod infra;
/// Runtime adapters.
pub mod runtime;
/// Shared utilities.
pub mod util;
