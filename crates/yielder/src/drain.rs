use yieldpool_core::TaskFailure;

use crate::spawner::Spawner;
use crate::yielder::Yielder;

/// Borrowing pull interface returned by [`Yielder::drain`].
///
/// Dropping it before it returns `None` cancels the outstanding tasks.
pub struct Drain<'a, T: Send + 'static> {
    yielder: &'a mut Yielder<T>,
    finished: bool,
}

impl<'a, T: Send + 'static> Drain<'a, T> {
    pub(crate) fn new(yielder: &'a mut Yielder<T>) -> Self {
        Self {
            yielder,
            finished: false,
        }
    }

    /// Spawn more work into the batch while iterating.
    pub fn spawner(&self) -> Spawner<T> {
        self.yielder.spawner()
    }

    pub fn pending(&self) -> usize {
        self.yielder.pending()
    }
}

impl<T: Send + 'static> Iterator for Drain<'_, T> {
    type Item = Result<T, TaskFailure>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.yielder.pull();
        self.finished = item.is_none();
        item
    }
}

impl<T: Send + 'static> Drop for Drain<'_, T> {
    fn drop(&mut self) {
        if !self.finished {
            self.yielder.abandon();
        }
    }
}

/// Owning pull interface, from `Yielder::into_iter`.
///
/// Dropping it drops the yielder, which cancels whatever is still running.
pub struct IntoDrain<T: Send + 'static> {
    yielder: Yielder<T>,
}

impl<T: Send + 'static> IntoDrain<T> {
    pub(crate) fn new(yielder: Yielder<T>) -> Self {
        Self { yielder }
    }

    pub fn spawner(&self) -> Spawner<T> {
        self.yielder.spawner()
    }

    pub fn pending(&self) -> usize {
        self.yielder.pending()
    }
}

impl<T: Send + 'static> Iterator for IntoDrain<T> {
    type Item = Result<T, TaskFailure>;

    fn next(&mut self) -> Option<Self::Item> {
        self.yielder.pull()
    }
}
