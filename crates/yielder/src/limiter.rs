//! Admission control for spawned tasks.
//!
//! A [`Limiter`] wraps a task body so it first waits for one of `N` permits.
//! The permit is held until the wrapped future finishes or is dropped, so
//! aborts and panics release it the same way a normal return does.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

/// Bounded-concurrency gate. Cloning shares the same permits.
#[derive(Debug, Clone, Default)]
pub struct Limiter {
    semaphore: Option<Arc<Semaphore>>,
    pool_size: Option<usize>,
}

impl Limiter {
    /// `None` admits everything immediately.
    pub fn new(pool_size: Option<usize>) -> Self {
        Self {
            semaphore: pool_size.map(|n| Arc::new(Semaphore::new(n))),
            pool_size,
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn pool_size(&self) -> Option<usize> {
        self.pool_size
    }

    /// Permits currently free, or `None` when unbounded.
    pub fn available(&self) -> Option<usize> {
        self.semaphore.as_ref().map(|s| s.available_permits())
    }

    /// Wrap `fut` so it only starts running once a permit is free.
    ///
    /// Waiters are admitted in FIFO order as permits are released.
    pub fn admit<F>(&self, fut: F) -> impl Future<Output = F::Output> + Send + 'static
    where
        F: Future + Send + 'static,
        F::Output: Send,
    {
        let semaphore = self.semaphore.clone();
        async move {
            let _permit = match semaphore {
                // The semaphore is never closed, so acquisition only fails if that changes.
                Some(sem) => sem.acquire_owned().await.ok(),
                None => None,
            };
            fut.await
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    async fn track(running: Arc<AtomicUsize>, peak: Arc<AtomicUsize>) {
        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        running.fetch_sub(1, Ordering::SeqCst);
    }

    #[tokio::test]
    async fn caps_concurrency() {
        let limiter = Limiter::new(Some(2));
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..6)
            .map(|_| tokio::spawn(limiter.admit(track(running.clone(), peak.clone()))))
            .collect();
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 2);
        assert_eq!(limiter.available(), Some(2));
    }

    #[tokio::test]
    async fn unbounded_runs_everything_at_once() {
        let limiter = Limiter::unbounded();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..5)
            .map(|_| tokio::spawn(limiter.admit(track(running.clone(), peak.clone()))))
            .collect();
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 5);
        assert_eq!(limiter.available(), None);
        assert_eq!(limiter.pool_size(), None);
    }

    #[tokio::test]
    async fn abort_releases_permit() {
        let limiter = Limiter::new(Some(1));
        let stuck = tokio::spawn(limiter.admit(std::future::pending::<()>()));
        tokio::task::yield_now().await;
        assert_eq!(limiter.available(), Some(0));

        stuck.abort();
        assert!(stuck.await.unwrap_err().is_cancelled());
        assert_eq!(limiter.available(), Some(1));
    }
}
