//! Gap-filling order buffer.
//!
//! Results arrive tagged with the sequence number they were spawned (or put)
//! under. They sit in a min-heap until every lower sequence number has been
//! released, then come out one at a time as the cursor advances.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// One filled slot. `value` is `None` for tasks that failed or produced
/// nothing; the slot still has to pass through to advance the cursor.
#[derive(Debug)]
struct Slot<T> {
    seq: u64,
    value: Option<T>,
}

impl<T> PartialEq for Slot<T> {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl<T> Eq for Slot<T> {}

impl<T> PartialOrd for Slot<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Slot<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.seq.cmp(&other.seq)
    }
}

#[derive(Debug)]
pub struct OrderedSink<T> {
    heap: BinaryHeap<Reverse<Slot<T>>>,
    /// Next sequence number eligible for release.
    cursor: u64,
}

impl<T> OrderedSink<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            cursor: 1,
        }
    }

    pub fn insert(&mut self, seq: u64, value: Option<T>) {
        self.heap.push(Reverse(Slot { seq, value }));
    }

    /// Whether the head of the heap is the slot the cursor is waiting for.
    pub fn has_ready(&self) -> bool {
        self.heap
            .peek()
            .is_some_and(|Reverse(slot)| slot.seq == self.cursor)
    }

    /// Release the head slot if it is next in line.
    ///
    /// `Some(None)` means an empty slot was consumed: the cursor moved but
    /// there is nothing to emit.
    pub fn pop_ready(&mut self) -> Option<Option<T>> {
        if !self.has_ready() {
            return None;
        }
        let Reverse(slot) = self.heap.pop()?;
        self.cursor += 1;
        Some(slot.value)
    }

    /// Jump the cursor over a hole to the lowest buffered slot.
    ///
    /// Only valid once nothing is pending: the missing numbers can no longer
    /// arrive. Returns the skipped range `[from, to)`.
    pub fn skip_gap(&mut self) -> Option<(u64, u64)> {
        let head = self.heap.peek()?.0.seq;
        if head <= self.cursor {
            return None;
        }
        let from = self.cursor;
        self.cursor = head;
        Some((from, head))
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain_ready(sink: &mut OrderedSink<char>) -> String {
        let mut out = String::new();
        while let Some(slot) = sink.pop_ready() {
            if let Some(c) = slot {
                out.push(c);
            }
        }
        out
    }

    #[test]
    fn holds_back_until_gap_fills() {
        let mut sink = OrderedSink::new();
        sink.insert(3, Some('c'));
        sink.insert(2, Some('b'));
        assert!(!sink.has_ready());
        assert_eq!(drain_ready(&mut sink), "");

        sink.insert(1, Some('a'));
        assert!(sink.has_ready());
        assert_eq!(drain_ready(&mut sink), "abc");
        assert_eq!(sink.cursor, 4);
        assert!(sink.is_empty());
    }

    #[test]
    fn empty_slot_advances_cursor_without_value() {
        let mut sink = OrderedSink::new();
        sink.insert(2, Some('b'));
        sink.insert(1, None);
        assert_eq!(sink.pop_ready(), Some(None));
        assert_eq!(sink.pop_ready(), Some(Some('b')));
        assert_eq!(sink.pop_ready(), None);
        assert_eq!(sink.cursor, 3);
    }

    #[test]
    fn partial_release_stops_at_next_hole() {
        let mut sink = OrderedSink::new();
        for (seq, c) in [(1, 'a'), (2, 'b'), (4, 'd'), (5, 'e')] {
            sink.insert(seq, Some(c));
        }
        assert_eq!(drain_ready(&mut sink), "ab");
        assert_eq!(sink.len(), 2);

        sink.insert(3, Some('c'));
        assert_eq!(drain_ready(&mut sink), "cde");
    }

    #[test]
    fn skip_gap_jumps_to_head() {
        let mut sink = OrderedSink::new();
        sink.insert(4, Some('d'));
        assert_eq!(sink.skip_gap(), Some((1, 4)));
        assert_eq!(sink.skip_gap(), None);
        assert_eq!(drain_ready(&mut sink), "d");
        assert_eq!(sink.skip_gap(), None);
    }
}
