//! Deduplicating circuit-breaker registry.
//!
//! Tracks, per logical request key, whether an attempt is in flight and
//! whether the last attempt failed. Callers consult the registry before
//! starting work so that two concurrent callers never fetch the same key,
//! and nobody retries a key that has just failed until it is reset.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// How a failed attempt affects future attempts for the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Retrying may succeed; the key is only released.
    Transient,
    /// The key is blocked until reset (or cool-down expiry).
    NonRetryable,
}

/// Result of an attempt, reported through [`Registry::end_attempt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The operation succeeded; any failure memory is cleared.
    Success,
    /// The operation failed.
    Failure(FailureKind),
}

/// Current registry view of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    /// No attempt in flight and no failure recorded.
    Ready,
    /// Another caller is already fetching this key.
    InFlight,
    /// The last attempt failed and the key has not been reset.
    CoolingDown,
}

struct RegistryState<K> {
    in_flight: HashSet<K>,
    failed: HashMap<K, Instant>,
}

/// Per-category registry of in-flight and failed keys.
///
/// All operations take a single short lock; none of them await.
pub struct Registry<K> {
    name: String,
    cool_down: Option<Duration>,
    state: Mutex<RegistryState<K>>,
}

impl<K> Registry<K>
where
    K: Eq + Hash + Clone + Debug,
{
    /// Create a registry whose failures never expire on their own.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cool_down: None,
            state: Mutex::new(RegistryState {
                in_flight: HashSet::new(),
                failed: HashMap::new(),
            }),
        }
    }

    /// Let failed keys become attemptable again after `cool_down`.
    #[must_use]
    pub fn with_cool_down(mut self, cool_down: Duration) -> Self {
        self.cool_down = Some(cool_down);
        self
    }

    /// Registry name, used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configured cool-down, if any.
    pub const fn cool_down(&self) -> Option<Duration> {
        self.cool_down
    }

    /// Current state of `key`. Pure query.
    pub fn check(&self, key: &K) -> AttemptState {
        let state = self.state.lock();
        self.state_of(&state, key, Instant::now())
    }

    /// True when neither in flight nor cooling down.
    pub fn should_attempt(&self, key: &K) -> bool {
        self.check(key) == AttemptState::Ready
    }

    /// Mark `key` in flight. Idempotent.
    pub fn begin_attempt(&self, key: K) {
        let mut state = self.state.lock();
        if state.in_flight.insert(key.clone()) {
            debug!(registry = %self.name, key = ?key, "attempt started");
        }
    }

    /// Check and begin under one lock.
    ///
    /// # Errors
    ///
    /// Returns the blocking state when the key is in flight or cooling down.
    pub fn try_begin(&self, key: &K) -> Result<(), AttemptState> {
        let mut state = self.state.lock();
        self.prune_expired(&mut state, key, Instant::now());
        match self.state_of(&state, key, Instant::now()) {
            AttemptState::Ready => {
                state.in_flight.insert(key.clone());
                debug!(registry = %self.name, key = ?key, "attempt started");
                Ok(())
            }
            blocked => Err(blocked),
        }
    }

    /// Release `key` and record the outcome of its attempt.
    pub fn end_attempt(&self, key: &K, outcome: AttemptOutcome) {
        let mut state = self.state.lock();
        state.in_flight.remove(key);
        match outcome {
            AttemptOutcome::Success => {
                if state.failed.remove(key).is_some() {
                    info!(registry = %self.name, key = ?key, "key recovered");
                }
            }
            AttemptOutcome::Failure(FailureKind::NonRetryable) => {
                state.failed.insert(key.clone(), Instant::now());
                warn!(registry = %self.name, key = ?key, "key tripped after failure");
            }
            AttemptOutcome::Failure(FailureKind::Transient) => {
                debug!(registry = %self.name, key = ?key, "transient failure, key released");
            }
        }
    }

    /// Clear failure memory for `key`. Returns whether it was cooling down;
    /// an entry whose cool-down already lapsed is dropped but not counted.
    pub fn reset(&self, key: &K) -> bool {
        let removed = self.state.lock().failed.remove(key);
        let cleared = removed.is_some_and(|failed_at| !self.expired(failed_at, Instant::now()));
        if cleared {
            info!(registry = %self.name, key = ?key, "key reset");
        }
        cleared
    }

    /// Clear failure memory for every key. Returns how many were cooling down.
    pub fn reset_all(&self) -> usize {
        let cleared = {
            let mut state = self.state.lock();
            let now = Instant::now();
            state
                .failed
                .drain()
                .filter(|(_, failed_at)| !self.expired(*failed_at, now))
                .count()
        };
        info!(registry = %self.name, cleared, "all failed keys reset");
        cleared
    }

    /// True when `key` has an attempt in flight.
    pub fn is_in_flight(&self, key: &K) -> bool {
        self.state.lock().in_flight.contains(key)
    }

    /// True when `key` is blocked by a recorded failure.
    pub fn is_failed(&self, key: &K) -> bool {
        self.check(key) == AttemptState::CoolingDown
    }

    /// Number of keys in flight.
    pub fn in_flight_count(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    /// Number of keys currently blocked by a failure.
    pub fn failed_count(&self) -> usize {
        let state = self.state.lock();
        let now = Instant::now();
        state
            .failed
            .values()
            .filter(|failed_at| !self.expired(**failed_at, now))
            .count()
    }

    fn state_of(&self, state: &RegistryState<K>, key: &K, now: Instant) -> AttemptState {
        if state.in_flight.contains(key) {
            return AttemptState::InFlight;
        }
        match state.failed.get(key) {
            Some(failed_at) if !self.expired(*failed_at, now) => AttemptState::CoolingDown,
            _ => AttemptState::Ready,
        }
    }

    fn prune_expired(&self, state: &mut RegistryState<K>, key: &K, now: Instant) {
        let expired = state
            .failed
            .get(key)
            .is_some_and(|failed_at| self.expired(*failed_at, now));
        if expired {
            state.failed.remove(key);
            debug!(registry = %self.name, key = ?key, "cool-down expired");
        }
    }

    fn expired(&self, failed_at: Instant, now: Instant) -> bool {
        self.cool_down
            .is_some_and(|cool_down| now.saturating_duration_since(failed_at) >= cool_down)
    }
}

impl<K> Debug for Registry<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("name", &self.name)
            .field("cool_down", &self.cool_down)
            .finish_non_exhaustive()
    }
}
