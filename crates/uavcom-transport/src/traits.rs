use std::collections::VecDeque;

use heapless::spsc::{Consumer, Producer};

use crate::error::{Result, TransportError};

/// Outbound half of a byte queue.
///
/// Pushing never blocks. A full queue is reported immediately and the caller
/// decides whether to drop or retry.
pub trait ByteSink {
    /// Push a single byte.
    fn push(&mut self, byte: u8) -> Result<()>;

    /// Number of bytes that can be pushed right now.
    fn free_space(&self) -> usize;

    /// Push all bytes or none of them.
    fn push_all(&mut self, bytes: &[u8]) -> Result<()> {
        let free = self.free_space();
        if bytes.len() > free {
            return Err(TransportError::QueueFull {
                needed: bytes.len(),
                free,
            });
        }
        for &byte in bytes {
            self.push(byte)?;
        }
        Ok(())
    }
}

/// Inbound half of a byte queue.
pub trait ByteSource {
    /// Pop the oldest byte, or `None` when the queue is empty.
    fn pop(&mut self) -> Option<u8>;

    /// Number of bytes waiting to be popped.
    fn available(&self) -> usize;
}

/// Monotonic microsecond time source.
pub trait Clock {
    /// Microseconds since an arbitrary, fixed origin.
    fn now_us(&self) -> u64;
}

impl<T: ByteSink + ?Sized> ByteSink for &mut T {
    fn push(&mut self, byte: u8) -> Result<()> {
        (**self).push(byte)
    }

    fn free_space(&self) -> usize {
        (**self).free_space()
    }
}

impl<T: ByteSource + ?Sized> ByteSource for &mut T {
    fn pop(&mut self) -> Option<u8> {
        (**self).pop()
    }

    fn available(&self) -> usize {
        (**self).available()
    }
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_us(&self) -> u64 {
        (**self).now_us()
    }
}

// Unbounded host-side sink, handy for capturing output.
impl ByteSink for Vec<u8> {
    fn push(&mut self, byte: u8) -> Result<()> {
        Vec::push(self, byte);
        Ok(())
    }

    fn free_space(&self) -> usize {
        usize::MAX - self.len()
    }
}

impl ByteSource for VecDeque<u8> {
    fn pop(&mut self) -> Option<u8> {
        self.pop_front()
    }

    fn available(&self) -> usize {
        self.len()
    }
}

impl<const N: usize> ByteSink for Producer<'_, u8, N> {
    fn push(&mut self, byte: u8) -> Result<()> {
        self.enqueue(byte).map_err(|_| TransportError::QueueFull {
            needed: 1,
            free: 0,
        })
    }

    fn free_space(&self) -> usize {
        self.capacity() - self.len()
    }
}

impl<const N: usize> ByteSource for Consumer<'_, u8, N> {
    fn pop(&mut self) -> Option<u8> {
        self.dequeue()
    }

    fn available(&self) -> usize {
        self.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TinySink {
        data: Vec<u8>,
        cap: usize,
    }

    impl ByteSink for TinySink {
        fn push(&mut self, byte: u8) -> Result<()> {
            if self.data.len() == self.cap {
                return Err(TransportError::QueueFull { needed: 1, free: 0 });
            }
            self.data.push(byte);
            Ok(())
        }

        fn free_space(&self) -> usize {
            self.cap - self.data.len()
        }
    }

    #[test]
    fn push_all_is_all_or_nothing() {
        let mut sink = TinySink {
            data: Vec::new(),
            cap: 4,
        };

        sink.push_all(b"abc").unwrap();
        let err = sink.push_all(b"de").unwrap_err();

        assert!(matches!(
            err,
            TransportError::QueueFull { needed: 2, free: 1 }
        ));
        assert_eq!(sink.data, b"abc");
    }

    #[test]
    fn vec_sink_and_deque_source() {
        let mut sink = Vec::new();
        sink.push_all(&[1, 2, 3]).unwrap();

        let mut source: VecDeque<u8> = sink.into();
        assert_eq!(source.available(), 3);
        assert_eq!(source.pop(), Some(1));
        assert_eq!(source.pop(), Some(2));
        assert_eq!(source.pop(), Some(3));
        assert_eq!(source.pop(), None);
    }

    #[test]
    fn split_queue_halves_implement_traits() {
        let mut queue: heapless::spsc::Queue<u8, 8> = heapless::spsc::Queue::new();
        let (mut producer, mut consumer) = queue.split();

        let free = producer.free_space();
        producer.push_all(&[9, 8, 7]).unwrap();
        assert_eq!(producer.free_space(), free - 3);
        assert_eq!(consumer.available(), 3);
        assert_eq!(consumer.pop(), Some(9));
    }
}
