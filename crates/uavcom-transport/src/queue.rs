use heapless::spsc::{Consumer, Producer, Queue};

use crate::error::{Result, TransportError};
use crate::traits::{ByteSink, ByteSource};

/// Fixed-capacity single-producer/single-consumer byte ring buffer.
///
/// One queue serves one direction of the serial link. The main loop owns the
/// queue directly; an interrupt handler can instead take one half via
/// [`ByteQueue::split`]. Usable capacity is `N - 1` bytes.
pub struct ByteQueue<const N: usize> {
    inner: Queue<u8, N>,
}

impl<const N: usize> ByteQueue<N> {
    /// Create an empty queue.
    pub const fn new() -> Self {
        Self {
            inner: Queue::new(),
        }
    }

    /// Maximum number of bytes the queue can hold.
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Number of bytes currently queued.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if no byte is queued.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Split into producer and consumer halves.
    pub fn split(&mut self) -> (Producer<'_, u8, N>, Consumer<'_, u8, N>) {
        self.inner.split()
    }

    /// Pop every queued byte into a vector.
    pub fn drain_to_vec(&mut self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        while let Some(byte) = self.inner.dequeue() {
            out.push(byte);
        }
        out
    }
}

impl<const N: usize> Default for ByteQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ByteSink for ByteQueue<N> {
    fn push(&mut self, byte: u8) -> Result<()> {
        self.inner.enqueue(byte).map_err(|_| TransportError::QueueFull {
            needed: 1,
            free: 0,
        })
    }

    fn free_space(&self) -> usize {
        self.inner.capacity() - self.inner.len()
    }
}

impl<const N: usize> ByteSource for ByteQueue<N> {
    fn pop(&mut self) -> Option<u8> {
        self.inner.dequeue()
    }

    fn available(&self) -> usize {
        self.inner.len()
    }
}

impl<const N: usize> std::fmt::Debug for ByteQueue<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let mut queue = ByteQueue::<16>::new();
        queue.push_all(b"hello").unwrap();

        assert_eq!(queue.len(), 5);
        assert_eq!(queue.drain_to_vec(), b"hello");
        assert!(queue.is_empty());
    }

    #[test]
    fn full_queue_rejects_without_partial_write() {
        let mut queue = ByteQueue::<8>::new();
        let cap = queue.capacity();
        queue.push_all(&vec![1u8; cap]).unwrap();

        assert_eq!(queue.free_space(), 0);
        assert!(matches!(
            queue.push(2),
            Err(TransportError::QueueFull { .. })
        ));
        assert!(queue.push_all(&[3]).is_err());
        assert_eq!(queue.len(), cap);
    }

    #[test]
    fn empty_pop_is_none() {
        let mut queue = ByteQueue::<4>::new();
        assert_eq!(queue.pop(), None);
        assert_eq!(queue.available(), 0);
    }

    #[test]
    fn wraps_around() {
        let mut queue = ByteQueue::<4>::new();
        for round in 0..10u8 {
            queue.push(round).unwrap();
            queue.push(round.wrapping_add(100)).unwrap();
            assert_eq!(queue.pop(), Some(round));
            assert_eq!(queue.pop(), Some(round.wrapping_add(100)));
        }
        assert!(queue.is_empty());
    }
}
