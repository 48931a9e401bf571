//! Tokio spawner.

use std::future::Future;

use tokio::runtime::{Handle, TryCurrentError};

use crate::core::Spawn;

/// Spawns scheduled tasks onto a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioSpawner {
    handle: Handle,
}

impl TokioSpawner {
    /// Spawn onto the runtime behind `handle`.
    pub const fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Spawn onto the runtime the caller is running in.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime, like [`Handle::current`].
    #[must_use]
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    /// Like [`current`](Self::current) but reports a missing runtime.
    ///
    /// # Errors
    ///
    /// Fails when called outside a tokio runtime.
    pub fn try_current() -> Result<Self, TryCurrentError> {
        Handle::try_current().map(Self::new)
    }

    /// Underlying runtime handle.
    pub const fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Spawn for TokioSpawner {
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        // Detached; the scheduler learns about completion through the task itself.
        drop(self.handle.spawn(fut));
    }
}
