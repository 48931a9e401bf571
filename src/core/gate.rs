//! Guarded submission: registry check, scheduler submit and registry update
//! as one call.
//!
//! The gate is the piece callers actually use. For a key `K` it asks the
//! registry whether an attempt is allowed, marks the key in flight, submits
//! the operation and arranges for the registry to be updated exactly once
//! when the task settles, whether it succeeded, failed, panicked, timed out
//! or was cancelled before running.

use std::fmt::{self, Debug};
use std::future::Future;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures::future;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::audit::{build_audit_event, AuditAction, AuditSink};
use super::error::{TaskError, TaskResult};
use super::policy::{FailurePolicy, TripOnAnyFailure};
use super::registry::{AttemptOutcome, AttemptState, FailureKind, Registry};
use super::scheduler::{Scheduler, Spawn};
use super::task::{Priority, SettleHook, TaskHandle};

/// Why a guarded request did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Another caller is already fetching the key.
    InFlight,
    /// The key's last attempt failed and has not been reset.
    CoolingDown,
}

/// Result of a guarded submission.
#[must_use = "a scheduled submission does nothing unless awaited"]
#[derive(Debug)]
pub enum Submission<T, E> {
    /// The operation was handed to the scheduler.
    Scheduled(TaskHandle<T, E>),
    /// The operation was not started.
    Skipped(SkipReason),
}

impl<T, E> Submission<T, E> {
    /// True when the request was skipped.
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }

    /// Skip reason, if skipped.
    pub const fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::Skipped(reason) => Some(*reason),
            Self::Scheduled(_) => None,
        }
    }

    /// The task handle, if scheduled.
    pub fn into_handle(self) -> Option<TaskHandle<T, E>> {
        match self {
            Self::Scheduled(handle) => Some(handle),
            Self::Skipped(_) => None,
        }
    }

    /// Wait for the outcome. Skipped requests yield `None` immediately.
    pub async fn wait(self) -> Option<TaskResult<T, E>> {
        match self {
            Self::Scheduled(handle) => Some(handle.await),
            Self::Skipped(_) => None,
        }
    }
}

impl From<AttemptState> for SkipReason {
    fn from(state: AttemptState) -> Self {
        match state {
            AttemptState::CoolingDown => Self::CoolingDown,
            AttemptState::InFlight | AttemptState::Ready => Self::InFlight,
        }
    }
}

/// One data category's front door onto a (possibly shared) scheduler.
pub struct RequestGate<K, E, S> {
    scheduler: Scheduler<S>,
    registry: Arc<Registry<K>>,
    policy: Arc<dyn FailurePolicy<E>>,
    audit: Option<Arc<Mutex<Box<dyn AuditSink>>>>,
}

impl<K, E, S> Clone for RequestGate<K, E, S> {
    fn clone(&self) -> Self {
        Self {
            scheduler: self.scheduler.clone(),
            registry: Arc::clone(&self.registry),
            policy: Arc::clone(&self.policy),
            audit: self.audit.clone(),
        }
    }
}

impl<K, E, S> fmt::Debug for RequestGate<K, E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestGate")
            .field("scheduler", &self.scheduler)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl<K, E, S> RequestGate<K, E, S>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    E: Send + 'static,
    S: Spawn + Send + Sync + 'static,
{
    /// Create a gate with the conservative [`TripOnAnyFailure`] policy.
    pub fn new(scheduler: Scheduler<S>, registry: Registry<K>) -> Self {
        Self {
            scheduler,
            registry: Arc::new(registry),
            policy: Arc::new(TripOnAnyFailure),
            audit: None,
        }
    }

    /// Replace the failure policy.
    #[must_use]
    pub fn with_policy(mut self, policy: impl FailurePolicy<E> + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Attach an audit sink for skip, trip and reset events.
    #[must_use]
    pub fn with_audit(mut self, audit: Box<dyn AuditSink>) -> Self {
        self.audit = Some(Arc::new(Mutex::new(audit)));
        self
    }

    /// The underlying scheduler.
    pub const fn scheduler(&self) -> &Scheduler<S> {
        &self.scheduler
    }

    /// The category's registry.
    pub fn registry(&self) -> &Registry<K> {
        &self.registry
    }

    /// Submit `operation` for `key` unless the key is in flight or cooling down.
    ///
    /// The registry is updated before the returned handle resolves.
    pub fn guarded_submit<T, F, Fut>(
        &self,
        key: K,
        operation: F,
        priority: Priority,
    ) -> Submission<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
    {
        if let Err(state) = self.registry.try_begin(&key) {
            let reason = SkipReason::from(state);
            debug!(registry = %self.registry.name(), key = ?key, reason = ?reason, "request skipped");
            self.record(AuditAction::Skip, format!("{key:?}: {reason:?}"));
            return Submission::Skipped(reason);
        }

        let hook = self.settle_hook(key);
        Submission::Scheduled(self.scheduler.submit_with_hook(operation, priority, Some(hook)))
    }

    /// [`guarded_submit`](Self::guarded_submit) with the scheduler's default priority.
    pub fn guarded_submit_default<T, F, Fut>(&self, key: K, operation: F) -> Submission<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
    {
        let priority = self.scheduler.config().default_priority;
        self.guarded_submit(key, operation, priority)
    }

    /// Guarded submission for many keys; outcomes come back in key order.
    ///
    /// Keys that are skipped yield `None`. Duplicate keys in the same batch
    /// are skipped after the first.
    pub async fn guarded_batch<T, F, Fut>(
        &self,
        keys: Vec<K>,
        priority: Priority,
        f: F,
    ) -> Vec<(K, Option<TaskResult<T, E>>)>
    where
        F: Fn(K) -> Fut + Clone + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
    {
        let submissions: Vec<_> = keys
            .into_iter()
            .map(|key| {
                let f = f.clone();
                let arg = key.clone();
                let submission = self.guarded_submit(key.clone(), move || f(arg), priority);
                (key, submission)
            })
            .collect();
        let (keys, waits): (Vec<_>, Vec<_>) = submissions
            .into_iter()
            .map(|(key, submission)| (key, submission.wait()))
            .unzip();
        keys.into_iter().zip(future::join_all(waits).await).collect()
    }

    /// Clear the failure memory for `key`.
    pub fn reset(&self, key: &K) -> bool {
        let cleared = self.registry.reset(key);
        if cleared {
            self.record(AuditAction::Reset, format!("{key:?}"));
        }
        cleared
    }

    /// Clear the failure memory for every key, e.g. after a period change.
    pub fn reset_all(&self) -> usize {
        let cleared = self.registry.reset_all();
        self.record(AuditAction::Reset, format!("all ({cleared} keys)"));
        cleared
    }

    fn settle_hook<T>(&self, key: K) -> SettleHook<T, E>
    where
        T: Send + 'static,
    {
        let registry = Arc::clone(&self.registry);
        let policy = Arc::clone(&self.policy);
        let audit = self.audit.clone();
        Box::new(move |outcome: &TaskResult<T, E>| {
            let attempt = match outcome {
                Ok(_) => AttemptOutcome::Success,
                Err(error) => {
                    AttemptOutcome::Failure(classify(policy.as_ref(), error, registry.name()))
                }
            };
            registry.end_attempt(&key, attempt);
            if attempt == AttemptOutcome::Failure(FailureKind::NonRetryable) {
                if let Some(sink) = audit.as_ref() {
                    sink.lock().record(build_audit_event(
                        None,
                        registry.name(),
                        AuditAction::Trip,
                        Some(format!("{key:?}")),
                    ));
                }
            }
        })
    }

    fn record(&self, action: AuditAction, detail: String) {
        if let Some(sink) = self.audit.as_ref() {
            sink.lock().record(build_audit_event(
                None,
                self.registry.name(),
                action,
                Some(detail),
            ));
        }
    }
}

/// Run the policy; a panicking policy counts as a non-retryable failure so
/// the key is still released.
fn classify<E>(
    policy: &dyn FailurePolicy<E>,
    error: &TaskError<E>,
    registry: &str,
) -> FailureKind {
    panic::catch_unwind(AssertUnwindSafe(|| policy.classify(error))).unwrap_or_else(|_| {
        warn!(registry = %registry, "failure policy panicked, tripping key");
        FailureKind::NonRetryable
    })
}
