use std::future::Future;
use std::sync::Arc;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use yieldpool_core::{BoxError, TaskFailure, YieldConfig, YieldError};

use crate::drain::{Drain, IntoDrain};
use crate::registry::TaskHandle;
use crate::shared::Shared;
use crate::spawner::Spawner;

/// Runs a growing set of tasks and hands their results back through a
/// plain iterator.
///
/// Each yielder owns a current-thread tokio runtime. Tasks only make
/// progress while the owning thread is blocked inside [`Drain::next`], which
/// resumes as soon as one result is releasable (or nothing is left) and then
/// returns control to the caller.
///
/// There is no timeout: a task that never finishes stalls the drain.
///
/// # Panics
///
/// A yielder must be drained and dropped outside any async runtime. Doing
/// either from async code panics inside tokio, even if the yielder was
/// created on a plain thread.
///
/// ```ignore
/// let mut y = Yielder::ordered()?;
/// for c in "abc".chars() {
///     y.spawn(async move { c })?;
/// }
/// let out: String = y.drain().collect::<Result<_, _>>()?;
/// assert_eq!(out, "abc");
/// ```
pub struct Yielder<T: Send + 'static> {
    runtime: Runtime,
    spawner: Spawner<T>,
}

impl<T: Send + 'static> Yielder<T> {
    /// Create a yielder. Fails inside an async context, since draining
    /// blocks the calling thread on the yielder's own runtime.
    pub fn new(config: YieldConfig) -> Result<Self, YieldError> {
        config.validate()?;
        if Handle::try_current().is_ok() {
            return Err(YieldError::InsideRuntime);
        }

        let runtime = Builder::new_current_thread().enable_all().build()?;
        let shared = Arc::new(Shared::new(config, runtime.handle().clone()));
        info!(pool_size = ?config.pool_size, ordered = config.ordered, "yielder created");

        Ok(Self {
            runtime,
            spawner: Spawner { shared },
        })
    }

    pub fn unordered() -> Result<Self, YieldError> {
        Self::new(YieldConfig::unordered())
    }

    pub fn ordered() -> Result<Self, YieldError> {
        Self::new(YieldConfig::ordered())
    }

    /// Arrival-order yielder running at most `pool_size` tasks at once.
    pub fn pool(pool_size: usize) -> Result<Self, YieldError> {
        Self::new(YieldConfig::unordered().with_pool_size(pool_size))
    }

    /// Spawn-order yielder running at most `pool_size` tasks at once.
    pub fn ordered_pool(pool_size: usize) -> Result<Self, YieldError> {
        Self::new(YieldConfig::ordered().with_pool_size(pool_size))
    }

    /// A cloneable handle for spawning from task bodies or other threads.
    pub fn spawner(&self) -> Spawner<T> {
        self.spawner.clone()
    }

    pub fn spawn<F>(&self, fut: F) -> Result<TaskHandle, YieldError>
    where
        F: Future<Output = T> + Send + 'static,
    {
        self.spawner.spawn(fut)
    }

    pub fn try_spawn<F, E>(&self, fut: F) -> Result<TaskHandle, YieldError>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        self.spawner.try_spawn(fut)
    }

    pub fn spawn_unit<F>(&self, fut: F) -> Result<TaskHandle, YieldError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.spawner.spawn_unit(fut)
    }

    pub fn put(&self, value: T) -> Result<u64, YieldError> {
        self.spawner.put(value)
    }

    pub fn pending(&self) -> usize {
        self.spawner.pending()
    }

    pub fn is_ordered(&self) -> bool {
        self.spawner.shared.ordered
    }

    pub fn pool_size(&self) -> Option<usize> {
        self.spawner.shared.limiter.pool_size()
    }

    /// Pull results until the batch is exhausted.
    ///
    /// Yields `Ok` for every value, then at most one `Err` carrying the first
    /// task failure, then `None`. Dropping the drain early cancels every task
    /// still outstanding. Either way the yielder is reset for a new batch.
    ///
    /// # Panics
    ///
    /// Blocks the calling thread on the yielder's runtime, so it panics if
    /// called from within an async runtime.
    pub fn drain(&mut self) -> Drain<'_, T> {
        Drain::new(self)
    }

    /// Next releasable item, blocking on the runtime until there is one.
    pub(crate) fn pull(&mut self) -> Option<Result<T, TaskFailure>> {
        let shared = &self.spawner.shared;
        loop {
            let waiter = {
                let mut state = shared.lock();
                match state.sink.pop_ready() {
                    Some(Some(value)) => return Some(Ok(value)),
                    // An empty ordered slot: advance without emitting.
                    Some(None) => continue,
                    None => {}
                }

                if state.pending == 0 {
                    if state.sink.is_empty() {
                        let failure = state.failure.take();
                        let discarded = state.reset();
                        drop(state);
                        drop(discarded);
                        debug!(failed = failure.is_some(), "batch drained");
                        return failure.map(Err);
                    }
                    if let Some((from, to)) = state.sink.skip_gap() {
                        warn!(from, to, "no task left for sequence gap, skipping");
                        continue;
                    }
                }

                let (tx, rx) = oneshot::channel();
                state.waiter = Some(tx);
                rx
            };
            // A dropped sender just means the state was reset; re-check either way.
            let _ = self.runtime.block_on(waiter);
        }
    }

    /// Cancel everything still registered and reset for a new batch.
    pub(crate) fn abandon(&mut self) {
        let (aborted, discarded) = {
            let mut state = self.spawner.shared.lock();
            (state.registry.len(), state.reset())
        };
        drop(discarded);
        if aborted > 0 {
            info!(aborted, "drain abandoned, cancelled outstanding tasks");
            // Let the runtime drop the aborted futures so their permits come back.
            self.runtime.block_on(tokio::task::yield_now());
        }
    }
}

impl<T: Send + 'static> IntoIterator for Yielder<T> {
    type Item = Result<T, TaskFailure>;
    type IntoIter = IntoDrain<T>;

    fn into_iter(self) -> IntoDrain<T> {
        IntoDrain::new(self)
    }
}

impl<T: Send + 'static> Drop for Yielder<T> {
    fn drop(&mut self) {
        let discarded = {
            let mut state = self.spawner.shared.lock();
            state.closed = true;
            state.reset()
        };
        drop(discarded);
    }
}
