use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use yieldpool_core::{TaskFailure, YieldConfig};

use crate::limiter::Limiter;
use crate::registry::Registry;
use crate::sink::Sink;

/// How a task body ended.
pub(crate) enum Outcome<T> {
    Value(T),
    Empty,
    Failed(TaskFailure),
}

/// Buffered values and the failure a reset threw away. The caller drops
/// them after releasing the state lock, since a value's `Drop` may call back
/// into a [`Spawner`](crate::Spawner).
pub(crate) type Discarded<T> = (Sink<T>, Option<TaskFailure>);

/// Per-batch bookkeeping. Every field is guarded by the one mutex in
/// [`Shared`], so spawn, put, completion and the pull loop serialize.
pub(crate) struct State<T> {
    /// Bumped on every reset; completions from an older batch are ignored.
    pub epoch: u64,
    /// Last sequence number handed out (spawns and puts share it).
    pub order: u64,
    /// Tasks spawned minus tasks whose completion has been recorded.
    pub pending: usize,
    pub sink: Sink<T>,
    pub registry: Registry,
    pub waiter: Option<oneshot::Sender<()>>,
    pub failure: Option<TaskFailure>,
    /// Set once the owning yielder is dropped.
    pub closed: bool,
}

impl<T> State<T> {
    fn new(ordered: bool) -> Self {
        Self {
            epoch: 0,
            order: 0,
            pending: 0,
            sink: Sink::new(ordered),
            registry: Registry::default(),
            waiter: None,
            failure: None,
            closed: false,
        }
    }

    pub fn next_seq(&mut self) -> u64 {
        self.order += 1;
        self.order
    }

    /// Keep the first failure; later ones only count as "no value".
    pub fn record_failure(&mut self, failure: TaskFailure) {
        if self.failure.is_none() {
            warn!(seq = failure.seq(), error = %failure, "task failed");
            self.failure = Some(failure);
        } else {
            debug!(seq = failure.seq(), error = %failure, "discarding additional task failure");
        }
    }

    /// Fulfil the outstanding waiter if the consumer can make progress:
    /// something is releasable, or nothing is left pending.
    pub fn wake_if_ready(&mut self) {
        if self.pending == 0 || self.sink.has_ready() {
            if let Some(waiter) = self.waiter.take() {
                // The receiver is gone if the drain was dropped mid-wait.
                let _ = waiter.send(());
            }
        }
    }

    /// Return to a fresh batch. Buffered values and the failure slot are
    /// moved out rather than dropped here.
    #[must_use = "drop after releasing the state lock"]
    pub fn reset(&mut self) -> Discarded<T> {
        self.epoch += 1;
        self.order = 0;
        self.pending = 0;
        self.registry.abort_all();
        self.waiter = None;
        (self.sink.take(), self.failure.take())
    }
}

/// State shared between a yielder, its spawners and its running tasks.
pub(crate) struct Shared<T> {
    state: Mutex<State<T>>,
    pub limiter: Limiter,
    pub handle: Handle,
    pub ordered: bool,
}

impl<T> Shared<T> {
    pub fn new(config: YieldConfig, handle: Handle) -> Self {
        Self {
            state: Mutex::new(State::new(config.ordered)),
            limiter: Limiter::new(config.pool_size),
            handle,
            ordered: config.ordered,
        }
    }

    /// Task bodies run under `catch_unwind`, so a poisoned lock only means a
    /// panic inside our own bookkeeping; the state is still usable.
    pub fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Completion callback: runs exactly once at the end of every task that
    /// was not cancelled.
    pub fn complete(&self, epoch: u64, seq: u64, outcome: Outcome<T>) {
        let mut state = self.lock();
        if state.epoch != epoch || !state.registry.remove(seq) {
            debug!(seq, "ignoring completion of cancelled task");
            return;
        }
        state.pending -= 1;

        let value = match outcome {
            Outcome::Value(value) => Some(value),
            Outcome::Empty => None,
            Outcome::Failed(failure) => {
                state.record_failure(failure);
                None
            }
        };
        debug!(seq, has_value = value.is_some(), pending = state.pending, "task completed");
        state.sink.deliver(seq, value);
        state.wake_if_ready();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(seq: u64) -> TaskFailure {
        TaskFailure::Failed {
            seq,
            source: "boom".into(),
        }
    }

    #[test]
    fn first_failure_wins() {
        let mut state = State::<u8>::new(false);
        state.record_failure(failed(2));
        state.record_failure(failed(1));
        assert_eq!(state.failure.as_ref().map(TaskFailure::seq), Some(2));
    }

    #[test]
    fn wake_needs_progress() {
        let mut state = State::<u8>::new(true);
        state.pending = 1;
        let (tx, mut rx) = oneshot::channel();
        state.waiter = Some(tx);

        // Slot 2 cannot be released while slot 1 is outstanding.
        state.sink.deliver(2, Some(9));
        state.wake_if_ready();
        assert!(state.waiter.is_some());

        state.sink.deliver(1, Some(8));
        state.wake_if_ready();
        assert!(state.waiter.is_none());
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn wake_when_nothing_pending() {
        let mut state = State::<u8>::new(false);
        let (tx, mut rx) = oneshot::channel();
        state.waiter = Some(tx);
        state.wake_if_ready();
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn reset_restores_fresh_batch() {
        let mut state = State::<u8>::new(true);
        state.next_seq();
        state.next_seq();
        state.pending = 1;
        state.sink.deliver(2, Some(1));
        state.record_failure(failed(1));

        let (old_sink, old_failure) = state.reset();
        assert_eq!(state.epoch, 1);
        assert_eq!(state.next_seq(), 1);
        assert_eq!(state.pending, 0);
        assert!(state.sink.is_empty());
        assert!(state.failure.is_none());
        assert_eq!(old_sink.len(), 1);
        assert_eq!(old_failure.as_ref().map(TaskFailure::seq), Some(1));
    }
}
