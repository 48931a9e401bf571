//! Bounded task scheduler.
//!
//! At most `concurrency_limit` tasks execute at once; excess submissions wait
//! in a two-lane queue where high-priority work is serviced ahead of queued
//! normal work. Admission is event-driven: it runs after every submission,
//! every completion and every resume, never on a timer.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::channel::oneshot;
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::infra::queue::{InMemoryQueue, TaskQueue};
use crate::util::clock::now_ms;

use super::audit::{build_audit_event, AuditAction, AuditSink};
use super::error::{SchedulerError, TaskError, TaskResult};
use super::runner::OperationRunner;
use super::stats::{SchedulerCounters, SchedulerStats};
use super::task::{
    Completion, Priority, ScheduledTask, SettleHook, TaskHandle, TaskId, TaskMetadata,
};

/// Abstraction for spawning task execution on a runtime.
pub trait Spawn {
    /// Spawn a detached future.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// What a finished job reports back to the scheduler.
struct Settled {
    succeeded: bool,
    detail: Option<String>,
    /// Resolves the caller's handle. Called after the slot is released.
    deliver: Box<dyn FnOnce() + Send>,
}

type Job = Box<dyn FnOnce() -> BoxFuture<'static, Settled> + Send>;

struct SchedulerState {
    queue: InMemoryQueue<Job>,
    active: usize,
    peak_active: usize,
    paused: bool,
    closed: bool,
    /// An admission loop is running; nested `pump` calls leave the work to it.
    pumping: bool,
}

struct Inner<S> {
    config: SchedulerConfig,
    state: Mutex<SchedulerState>,
    counters: SchedulerCounters,
    next_id: AtomicU64,
    audit: Mutex<Option<Box<dyn AuditSink>>>,
    spawner: S,
}

/// Bounded-concurrency scheduler with high/normal priority lanes.
///
/// Cloning is cheap and every clone drives the same queue and active set,
/// so several data categories can share one pool.
pub struct Scheduler<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for Scheduler<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> fmt::Debug for Scheduler<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("name", &self.inner.config.name)
            .field("concurrency_limit", &self.inner.config.concurrency_limit)
            .finish_non_exhaustive()
    }
}

impl<S> Scheduler<S>
where
    S: Spawn + Send + Sync + 'static,
{
    /// Create a scheduler from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidConfig` if the configuration is invalid.
    pub fn new(config: SchedulerConfig, spawner: S) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::InvalidConfig)?;

        info!(
            scheduler = %config.name,
            concurrency_limit = config.concurrency_limit,
            default_priority = %config.default_priority,
            "scheduler initialized"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(SchedulerState {
                    queue: InMemoryQueue::new(),
                    active: 0,
                    peak_active: 0,
                    paused: false,
                    closed: false,
                    pumping: false,
                }),
                counters: SchedulerCounters::default(),
                next_id: AtomicU64::new(0),
                audit: Mutex::new(None),
                spawner,
            }),
        })
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(self, audit: Box<dyn AuditSink>) -> Self {
        *self.inner.audit.lock() = Some(audit);
        self
    }

    /// Scheduler name.
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// Configured concurrency ceiling.
    pub fn concurrency_limit(&self) -> usize {
        self.inner.config.concurrency_limit
    }

    /// Configuration this scheduler was built from.
    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    /// Submit an operation with an explicit priority.
    ///
    /// Never fails synchronously: operation errors, panics, timeouts and
    /// cancellation are all delivered through the returned handle.
    pub fn submit<T, E, F, Fut>(&self, operation: F, priority: Priority) -> TaskHandle<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.submit_with_hook(operation, priority, None)
    }

    /// Submit an operation with the configured default priority.
    pub fn submit_default<T, E, F, Fut>(&self, operation: F) -> TaskHandle<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.submit(operation, self.inner.config.default_priority)
    }

    /// Submit a request to an [`OperationRunner`].
    pub fn submit_request<R, T, E, X>(
        &self,
        runner: &X,
        request: R,
        priority: Priority,
    ) -> TaskHandle<T, E>
    where
        X: OperationRunner<R, T, E>,
        R: Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let runner = runner.clone();
        self.submit(move || async move { runner.run(request).await }, priority)
    }

    /// Run one task per item and collect results in item order.
    ///
    /// `f` receives each item and its index. Admission still follows the
    /// scheduler's ceiling, so at most `concurrency_limit` items (minus
    /// whatever else is running) execute at once.
    pub async fn run_batch<I, T, E, F, Fut>(
        &self,
        items: I,
        priority: Priority,
        f: F,
    ) -> Vec<TaskResult<T, E>>
    where
        I: IntoIterator,
        I::Item: Send + 'static,
        F: Fn(I::Item, usize) -> Fut + Clone + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let handles: Vec<_> = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let f = f.clone();
                self.submit(move || f(item, index), priority)
            })
            .collect();
        debug!(scheduler = %self.name(), items = handles.len(), "batch submitted");
        future::join_all(handles).await
    }

    /// Submit with a hook that runs exactly once when the task settles,
    /// before the handle resolves. The hook also runs when the task is
    /// cancelled or dropped without running.
    pub(crate) fn submit_with_hook<T, E, F, Fut>(
        &self,
        operation: F,
        priority: Priority,
        hook: Option<SettleHook<T, E>>,
    ) -> TaskHandle<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();
        let completion = Completion::new(sender, hook);
        let timeout = self.inner.config.task_timeout();
        let job: Job = Box::new(move || run_operation(operation, completion, timeout).boxed());
        let task = ScheduledTask {
            meta: TaskMetadata {
                id,
                priority,
                submitted_at_ms: now_ms(),
            },
            payload: job,
        };

        let rejected = {
            let mut state = self.inner.state.lock();
            if state.closed {
                Some(task)
            } else {
                state.queue.enqueue(task);
                None
            }
        };
        if let Some(task) = rejected {
            debug!(scheduler = %self.name(), task_id = id, "scheduler closed, task cancelled");
            SchedulerCounters::bump(&self.inner.counters.cancelled);
            drop(task);
            return TaskHandle::new(id, receiver);
        }

        SchedulerCounters::bump(&self.inner.counters.submitted);
        self.inner.record(Some(id), AuditAction::Submit, None);
        debug!(scheduler = %self.name(), task_id = id, priority = %priority, "task submitted");

        self.inner.pump();
        TaskHandle::new(id, receiver)
    }

    /// Remove a queued task. Its handle resolves to [`TaskError::Cancelled`].
    ///
    /// Returns `false` if the task is running, finished or unknown; running
    /// work is never interrupted.
    pub fn cancel(&self, id: TaskId) -> bool {
        let removed = self.inner.state.lock().queue.remove(id);
        let Some(task) = removed else {
            return false;
        };
        drop(task);
        SchedulerCounters::bump(&self.inner.counters.cancelled);
        self.inner.record(Some(id), AuditAction::Cancel, None);
        debug!(scheduler = %self.name(), task_id = id, "queued task cancelled");
        true
    }

    /// Stop admitting queued tasks. Running tasks are unaffected.
    pub fn pause(&self) {
        let changed = {
            let mut state = self.inner.state.lock();
            !std::mem::replace(&mut state.paused, true)
        };
        if changed {
            info!(scheduler = %self.name(), "admission paused");
        }
    }

    /// Resume admission and immediately fill free slots.
    pub fn resume(&self) {
        let changed = {
            let mut state = self.inner.state.lock();
            std::mem::replace(&mut state.paused, false)
        };
        if changed {
            info!(scheduler = %self.name(), "admission resumed");
        }
        self.inner.pump();
    }

    /// Whether admission is paused.
    pub fn is_paused(&self) -> bool {
        self.inner.state.lock().paused
    }

    /// Close the scheduler and cancel every queued task.
    ///
    /// Running tasks finish normally. Later submissions resolve to
    /// [`TaskError::Cancelled`].
    pub fn shutdown(&self) {
        let drained = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            state.queue.drain()
        };
        let cancelled = drained.len();
        drop(drained);
        SchedulerCounters::add(&self.inner.counters.cancelled, cancelled);
        info!(scheduler = %self.name(), cancelled, "scheduler shut down");
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Number of tasks executing right now.
    pub fn active_count(&self) -> usize {
        self.inner.state.lock().active
    }

    /// Number of tasks waiting to start.
    pub fn queued_count(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// Snapshot of current statistics.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        let mut stats = {
            let state = self.inner.state.lock();
            SchedulerStats {
                name: self.inner.config.name.clone(),
                concurrency_limit: self.inner.config.concurrency_limit,
                active: state.active,
                queued: state.queue.len(),
                paused: state.paused,
                peak_active: state.peak_active,
                ..SchedulerStats::default()
            }
        };
        self.inner.counters.fill(&mut stats);
        stats
    }
}

impl<S> Inner<S>
where
    S: Spawn + Send + Sync + 'static,
{
    /// Admission loop: start queued tasks while slots are free.
    ///
    /// Only one loop runs at a time. `start` can re-enter `pump` (a spawner
    /// that drops the future at once, e.g. a runtime shutting down, runs
    /// `ActiveSlot::drop` inside `spawn`); such calls return immediately and
    /// the running loop picks up the freed slot on its next pass. The exit
    /// check and clearing `pumping` share one lock, so no wakeup is lost.
    fn pump(self: &Arc<Self>) {
        {
            let mut state = self.state.lock();
            if state.pumping {
                return;
            }
            state.pumping = true;
        }
        loop {
            let task = {
                let mut state = self.state.lock();
                let next = if state.paused || state.active >= self.config.concurrency_limit {
                    None
                } else {
                    state.queue.dequeue()
                };
                let Some(task) = next else {
                    state.pumping = false;
                    return;
                };
                state.active += 1;
                state.peak_active = state.peak_active.max(state.active);
                task
            };
            self.start(task);
        }
    }

    fn start(self: &Arc<Self>, task: ScheduledTask<Job>) {
        let ScheduledTask { meta, payload: job } = task;
        SchedulerCounters::bump(&self.counters.started);
        self.record(Some(meta.id), AuditAction::Start, None);
        debug!(
            scheduler = %self.config.name,
            task_id = meta.id,
            priority = %meta.priority,
            waited_ms = %now_ms().saturating_sub(meta.submitted_at_ms),
            "task started"
        );

        let slot = ActiveSlot {
            inner: Some(Arc::clone(self)),
        };
        let fut = job();
        self.spawner.spawn(async move {
            let settled = fut.await;
            slot.finish(meta.id, settled);
        });
    }

    fn release(&self) {
        let mut state = self.state.lock();
        state.active = state.active.saturating_sub(1);
    }

    fn record(&self, task_id: Option<TaskId>, action: AuditAction, detail: Option<String>) {
        let mut audit = self.audit.lock();
        if let Some(sink) = audit.as_mut() {
            sink.record(build_audit_event(task_id, &self.config.name, action, detail));
        }
    }
}

/// Occupancy of one active slot. Dropping it without `finish` (the runtime
/// dropped the task future) still frees the slot.
struct ActiveSlot<S>
where
    S: Spawn + Send + Sync + 'static,
{
    inner: Option<Arc<Inner<S>>>,
}

impl<S> ActiveSlot<S>
where
    S: Spawn + Send + Sync + 'static,
{
    fn finish(mut self, id: TaskId, settled: Settled) {
        let Some(inner) = self.inner.take() else {
            return;
        };
        inner.release();

        if settled.succeeded {
            SchedulerCounters::bump(&inner.counters.completed);
            inner.record(Some(id), AuditAction::Complete, None);
            debug!(scheduler = %inner.config.name, task_id = id, "task completed");
        } else {
            SchedulerCounters::bump(&inner.counters.failed);
            debug!(
                scheduler = %inner.config.name,
                task_id = id,
                reason = settled.detail.as_deref().unwrap_or("unknown"),
                "task failed"
            );
            inner.record(Some(id), AuditAction::Fail, settled.detail);
        }

        (settled.deliver)();
        inner.pump();
    }
}

impl<S> Drop for ActiveSlot<S>
where
    S: Spawn + Send + Sync + 'static,
{
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            warn!(scheduler = %inner.config.name, "task dropped before settling");
            inner.release();
            inner.pump();
        }
    }
}

async fn run_operation<T, E, F, Fut>(
    operation: F,
    mut completion: Completion<T, E>,
    timeout: Option<Duration>,
) -> Settled
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let outcome = execute(operation, timeout).await;
    let succeeded = outcome.is_ok();
    let detail = outcome.as_ref().err().map(describe_failure);
    completion.run_hook(&outcome);
    Settled {
        succeeded,
        detail,
        deliver: Box::new(move || completion.deliver(outcome)),
    }
}

async fn execute<T, E, F, Fut>(operation: F, timeout: Option<Duration>) -> TaskResult<T, E>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    // The call itself sits inside the unwind boundary so a panic while
    // building the future is caught too.
    let guarded = AssertUnwindSafe(async move { operation().await }).catch_unwind();

    #[cfg(feature = "tokio-runtime")]
    {
        if let Some(limit) = timeout {
            return match tokio::time::timeout(limit, guarded).await {
                Ok(caught) => settle(caught),
                Err(_) => {
                    warn!(timeout = ?limit, "task timed out");
                    Err(TaskError::TimedOut(limit))
                }
            };
        }
    }
    #[cfg(not(feature = "tokio-runtime"))]
    let _ = timeout;

    settle(guarded.await)
}

fn settle<T, E>(caught: Result<Result<T, E>, Box<dyn Any + Send>>) -> TaskResult<T, E> {
    match caught {
        Ok(result) => result.map_err(TaskError::Operation),
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            warn!(panic = %message, "task panicked");
            Err(TaskError::Panicked(message))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

fn describe_failure<E>(error: &TaskError<E>) -> String {
    match error {
        TaskError::Operation(_) => "operation error".to_string(),
        TaskError::Panicked(message) => format!("panicked: {message}"),
        TaskError::TimedOut(limit) => format!("timed out after {limit:?}"),
        TaskError::Cancelled => "cancelled".to_string(),
    }
}
