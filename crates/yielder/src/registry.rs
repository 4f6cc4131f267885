use std::collections::HashMap;

use tokio::task::AbortHandle;

/// Handle to a task spawned into a yielder.
#[derive(Debug)]
pub struct TaskHandle {
    seq: u64,
    abort: AbortHandle,
}

impl TaskHandle {
    pub(crate) fn new(seq: u64, abort: AbortHandle) -> Self {
        Self { seq, abort }
    }

    /// Sequence number assigned at spawn time (1-based, per batch).
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Whether the task has finished, failed or been cancelled.
    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}

/// Live tasks keyed by sequence number.
///
/// A task stays registered until its completion is recorded; cancelling
/// removes every entry so late completions can tell they were dropped.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    handles: HashMap<u64, AbortHandle>,
}

impl Registry {
    pub fn insert(&mut self, seq: u64, handle: AbortHandle) {
        self.handles.insert(seq, handle);
    }

    /// Returns `false` if the task was never registered or already cancelled.
    pub fn remove(&mut self, seq: u64) -> bool {
        self.handles.remove(&seq).is_some()
    }

    /// Abort every registered task and forget them. Returns how many were aborted.
    pub fn abort_all(&mut self) -> usize {
        let count = self.handles.len();
        for (_, handle) in self.handles.drain() {
            handle.abort();
        }
        count
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn abort_all_cancels_and_clears() {
        let mut registry = Registry::default();
        let a = tokio::spawn(std::future::pending::<()>());
        let b = tokio::spawn(std::future::pending::<()>());
        registry.insert(1, a.abort_handle());
        registry.insert(2, b.abort_handle());
        assert_eq!(registry.len(), 2);

        assert_eq!(registry.abort_all(), 2);
        assert_eq!(registry.len(), 0);
        assert!(a.await.unwrap_err().is_cancelled());
        assert!(b.await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn remove_reports_membership() {
        let mut registry = Registry::default();
        let task = tokio::spawn(async {});
        registry.insert(5, task.abort_handle());

        assert!(registry.remove(5));
        assert!(!registry.remove(5));
        assert!(!registry.remove(6));
        task.await.unwrap();
    }

    #[tokio::test]
    async fn aborting_finished_task_is_noop() {
        let mut registry = Registry::default();
        let task = tokio::spawn(async { 42 });
        let abort = task.abort_handle();
        assert_eq!(task.await.unwrap(), 42);

        registry.insert(1, abort);
        assert_eq!(registry.abort_all(), 1);

        let handle = TaskHandle::new(1, tokio::spawn(async {}).abort_handle());
        assert_eq!(handle.seq(), 1);
    }
}
