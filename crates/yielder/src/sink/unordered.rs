use std::collections::VecDeque;

/// Arrival-order buffer of completed results.
#[derive(Debug)]
pub struct FifoSink<T> {
    queue: VecDeque<T>,
}

impl<T> FifoSink<T> {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    pub fn push(&mut self, value: T) {
        self.queue.push_back(value);
    }

    pub fn pop(&mut self) -> Option<T> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
