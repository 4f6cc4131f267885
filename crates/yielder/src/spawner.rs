use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::debug;

use yieldpool_core::{BoxError, TaskFailure, YieldError};

use crate::registry::TaskHandle;
use crate::shared::{Outcome, Shared};

/// Cloneable handle for feeding work into a yielder.
///
/// Task bodies capture a `Spawner` to spawn follow-up tasks into the same
/// batch; other threads can use one to spawn or put while the owner drains.
pub struct Spawner<T> {
    pub(crate) shared: Arc<Shared<T>>,
}

impl<T> Clone for Spawner<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> Spawner<T> {
    /// Spawn a task whose output is delivered as one value.
    pub fn spawn<F>(&self, fut: F) -> Result<TaskHandle, YieldError>
    where
        F: Future<Output = T> + Send + 'static,
    {
        self.spawn_task(async move { Ok(Some(fut.await)) })
    }

    /// Spawn a fallible task. An `Err` is recorded as a task failure and
    /// surfaced once the drain has delivered everything else.
    pub fn try_spawn<F, E>(&self, fut: F) -> Result<TaskHandle, YieldError>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        self.spawn_task(async move { fut.await.map(Some).map_err(Into::into) })
    }

    /// Spawn a task that contributes no value, e.g. one that only spawns
    /// other tasks. In an ordered yielder it still occupies its slot.
    pub fn spawn_unit<F>(&self, fut: F) -> Result<TaskHandle, YieldError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.spawn_task(async move {
            fut.await;
            Ok(None)
        })
    }

    /// Inject a value directly, bypassing task scheduling. Consumes the next
    /// sequence number exactly like a spawn; returns that number.
    pub fn put(&self, value: T) -> Result<u64, YieldError> {
        let mut state = self.shared.lock();
        if state.closed {
            return Err(YieldError::Closed);
        }
        let seq = state.next_seq();
        debug!(seq, "put");
        state.sink.deliver(seq, Some(value));
        state.wake_if_ready();
        Ok(seq)
    }

    /// Tasks spawned in the current batch that have not completed yet.
    pub fn pending(&self) -> usize {
        self.shared.lock().pending
    }

    fn spawn_task<F>(&self, body: F) -> Result<TaskHandle, YieldError>
    where
        F: Future<Output = Result<Option<T>, BoxError>> + Send + 'static,
    {
        let mut state = self.shared.lock();
        if state.closed {
            return Err(YieldError::Closed);
        }
        let seq = state.next_seq();
        let epoch = state.epoch;
        state.pending += 1;

        let admitted = self.shared.limiter.admit(AssertUnwindSafe(body).catch_unwind());
        let shared = Arc::clone(&self.shared);
        // The task cannot finish before it is registered: completion needs the lock we hold.
        let join = self.shared.handle.spawn(async move {
            let outcome = match admitted.await {
                Ok(Ok(Some(value))) => Outcome::Value(value),
                Ok(Ok(None)) => Outcome::Empty,
                Ok(Err(source)) => Outcome::Failed(TaskFailure::Failed { seq, source }),
                Err(payload) => Outcome::Failed(TaskFailure::Panicked {
                    seq,
                    message: panic_message(payload.as_ref()),
                }),
            };
            shared.complete(epoch, seq, outcome);
        });

        state.registry.insert(seq, join.abort_handle());
        debug!(seq, pending = state.pending, "spawned task");
        Ok(TaskHandle::new(seq, join.abort_handle()))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
