// HeartTrack - Sensor FIFO Bookkeeping
//
// The MAX30105 keeps a 32-entry circular FIFO with 5-bit write/read pointers
// and an overflow counter. The driver drains it into a bounded local queue on
// every poll so the queue never serves samples the chip has long replaced.

use std::collections::VecDeque;

use crate::events::Sample;

/// Entries in the on-chip FIFO.
pub const FIFO_DEPTH: usize = 32;

/// Samples waiting in the chip FIFO.
///
/// Equal pointers mean either empty or full; the chip only counts overflows
/// once it is full, so a non-zero `overflow` resolves the tie.
pub fn pending_samples(write_ptr: u8, read_ptr: u8, overflow: u8) -> usize {
    let pending = usize::from(write_ptr.wrapping_sub(read_ptr)) % FIFO_DEPTH;
    if pending == 0 && overflow > 0 {
        FIFO_DEPTH
    } else {
        pending
    }
}

/// Local copy of drained samples, oldest first. Pushing past `capacity`
/// drops the oldest entry.
#[derive(Debug)]
pub struct SampleQueue {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl SampleQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: Sample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn front(&self) -> Option<&Sample> {
        self.samples.front()
    }

    pub fn pop(&mut self) -> Option<Sample> {
        self.samples.pop_front()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Discard everything except the most recent sample.
    pub fn keep_latest(&mut self) {
        let stale = self.samples.len().saturating_sub(1);
        self.samples.drain(..stale);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: u32) -> impl Iterator<Item = Sample> {
        (0..n).map(|i| Sample::new(i, i))
    }

    #[test]
    fn pending_counts_across_pointer_wrap() {
        assert_eq!(pending_samples(5, 2, 0), 3);
        assert_eq!(pending_samples(1, 30, 0), 3);
        assert_eq!(pending_samples(31, 0, 0), 31);
    }

    #[test]
    fn equal_pointers_are_empty_without_overflow() {
        assert_eq!(pending_samples(12, 12, 0), 0);
    }

    #[test]
    fn equal_pointers_with_overflow_are_full() {
        assert_eq!(pending_samples(12, 12, 1), FIFO_DEPTH);
        assert_eq!(pending_samples(0, 0, 31), FIFO_DEPTH);
    }

    #[test]
    fn queue_drops_oldest_when_full() {
        let mut queue = SampleQueue::new(4);
        for s in numbered(6) {
            queue.push(s);
        }
        assert_eq!(queue.len(), 4);
        assert_eq!(queue.pop(), Some(Sample::new(2, 2)));
        assert_eq!(queue.front(), Some(&Sample::new(3, 3)));
    }

    #[test]
    fn keep_latest_leaves_the_newest_sample() {
        let mut queue = SampleQueue::new(FIFO_DEPTH);
        for s in numbered(10) {
            queue.push(s);
        }
        queue.keep_latest();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.front(), Some(&Sample::new(9, 9)));

        queue.pop();
        queue.keep_latest();
        assert!(queue.is_empty());

        queue.push(Sample::new(1, 1));
        queue.clear();
        assert_eq!(queue.pop(), None);
    }
}
