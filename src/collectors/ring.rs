//! Fixed-capacity circular buffer (§9 Design Notes: "Ring buffers — fixed
//! capacity circular arrays with head+count; snapshot reads copy out
//! newest-first"). Used for the recent-trade rings (§4.C, §4.E).

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    capacity: usize,
    items: VecDeque<T>,
}

impl<T: Clone> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            items: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Newest-first snapshot, copying out of the buffer.
    pub fn newest_first(&self) -> Vec<T> {
        self.items.iter().rev().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_once_capacity_is_exceeded() {
        let mut ring = RingBuffer::new(3);
        ring.push(1);
        ring.push(2);
        ring.push(3);
        ring.push(4);
        assert_eq!(ring.newest_first(), vec![4, 3, 2]);
    }

    #[test]
    fn newest_first_orders_most_recent_first() {
        let mut ring = RingBuffer::new(200);
        for i in 0..5 {
            ring.push(i);
        }
        assert_eq!(ring.newest_first(), vec![4, 3, 2, 1, 0]);
    }
}
