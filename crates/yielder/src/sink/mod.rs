//! Result sinks: where completed values wait until the consumer pulls them.
//!
//! - `unordered`: FIFO of arrival
//! - `ordered`: min-heap keyed by sequence number, released strictly in order

mod ordered;
mod unordered;

pub use ordered::OrderedSink;
pub use unordered::FifoSink;

/// The delivery discipline a yielder was built with.
#[derive(Debug)]
pub enum Sink<T> {
    Fifo(FifoSink<T>),
    Ordered(OrderedSink<T>),
}

impl<T> Sink<T> {
    pub fn new(ordered: bool) -> Self {
        if ordered {
            Sink::Ordered(OrderedSink::new())
        } else {
            Sink::Fifo(FifoSink::new())
        }
    }

    /// Record the outcome for `seq`. `None` still fills an ordered slot.
    pub fn deliver(&mut self, seq: u64, value: Option<T>) {
        match self {
            Sink::Fifo(fifo) => {
                if let Some(value) = value {
                    fifo.push(value);
                }
            }
            Sink::Ordered(heap) => heap.insert(seq, value),
        }
    }

    pub fn has_ready(&self) -> bool {
        match self {
            Sink::Fifo(fifo) => !fifo.is_empty(),
            Sink::Ordered(heap) => heap.has_ready(),
        }
    }

    /// Next releasable slot; `Some(None)` is an ordered slot with no value.
    pub fn pop_ready(&mut self) -> Option<Option<T>> {
        match self {
            Sink::Fifo(fifo) => fifo.pop().map(Some),
            Sink::Ordered(heap) => heap.pop_ready(),
        }
    }

    pub fn skip_gap(&mut self) -> Option<(u64, u64)> {
        match self {
            Sink::Fifo(_) => None,
            Sink::Ordered(heap) => heap.skip_gap(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Sink::Fifo(fifo) => fifo.len(),
            Sink::Ordered(heap) => heap.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Sink::Fifo(fifo) => fifo.is_empty(),
            Sink::Ordered(heap) => heap.is_empty(),
        }
    }

    /// Swap in a fresh sink of the same discipline and hand back the old one.
    pub fn take(&mut self) -> Self {
        let ordered = matches!(self, Sink::Ordered(_));
        std::mem::replace(self, Sink::new(ordered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_drops_empty_outcomes() {
        let mut sink = Sink::new(false);
        sink.deliver(1, None);
        assert!(sink.is_empty());
        sink.deliver(2, Some(7));
        assert_eq!(sink.pop_ready(), Some(Some(7)));
        assert_eq!(sink.skip_gap(), None);
    }

    #[test]
    fn ordered_keeps_empty_slots() {
        let mut sink = Sink::new(true);
        sink.deliver(1, None);
        assert_eq!(sink.len(), 1);
        assert!(sink.has_ready());
        assert_eq!(sink.pop_ready(), Some(None::<u8>));
        assert!(sink.is_empty());
    }

    #[test]
    fn take_keeps_discipline_and_restarts_cursor() {
        let mut sink = Sink::new(true);
        sink.deliver(1, Some('a'));
        sink.deliver(3, Some('c'));
        assert_eq!(sink.pop_ready(), Some(Some('a')));

        let old = sink.take();
        assert_eq!(old.len(), 1);
        assert!(sink.is_empty());
        assert!(matches!(sink, Sink::Ordered(_)));

        // A fresh batch numbers from 1 again.
        sink.deliver(1, Some('x'));
        assert_eq!(sink.pop_ready(), Some(Some('x')));
    }
}
