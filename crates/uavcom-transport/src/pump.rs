//! Byte pumps between queues and `std::io` streams.
//!
//! These are the host-side stand-ins for the UART interrupt handlers: one
//! moves received bytes into the inbound queue, the other empties the
//! outbound queue into the stream.

use std::io::{ErrorKind, Read, Write};

use tracing::trace;

use crate::error::{Result, TransportError};
use crate::traits::{ByteSink, ByteSource};

const PUMP_CHUNK_SIZE: usize = 256;

/// Read from `reader` into `sink` until the sink is full, the reader would
/// block, or the reader reports EOF.
///
/// Returns the number of bytes moved. Zero means EOF, a full sink, or no data
/// ready.
pub fn fill_from<R: Read, S: ByteSink>(reader: &mut R, sink: &mut S) -> Result<usize> {
    let mut moved = 0usize;
    let mut chunk = [0u8; PUMP_CHUNK_SIZE];

    loop {
        let want = sink.free_space().min(PUMP_CHUNK_SIZE);
        if want == 0 {
            break;
        }

        let read = match reader.read(&mut chunk[..want]) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => break,
            Err(err) => return Err(TransportError::Io(err)),
        };

        sink.push_all(&chunk[..read])?;
        moved += read;
    }

    if moved > 0 {
        trace!(bytes = moved, "filled queue from stream");
    }
    Ok(moved)
}

/// Pop every byte from `source` and write it to `writer`.
///
/// Returns the number of bytes written.
pub fn drain_into<S: ByteSource, W: Write>(source: &mut S, writer: &mut W) -> Result<usize> {
    let mut moved = 0usize;
    let mut chunk = [0u8; PUMP_CHUNK_SIZE];

    loop {
        let mut len = 0usize;
        while len < PUMP_CHUNK_SIZE {
            match source.pop() {
                Some(byte) => {
                    chunk[len] = byte;
                    len += 1;
                }
                None => break,
            }
        }
        if len == 0 {
            break;
        }

        let mut offset = 0usize;
        while offset < len {
            match writer.write(&chunk[offset..len]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        moved += len;
    }

    if moved > 0 {
        writer.flush()?;
        trace!(bytes = moved, "drained queue to stream");
    }
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::queue::ByteQueue;

    #[test]
    fn fill_stops_when_queue_full() {
        let data = vec![0x55u8; 100];
        let mut reader = Cursor::new(data);
        let mut queue = ByteQueue::<32>::new();

        let moved = fill_from(&mut reader, &mut queue).unwrap();

        assert_eq!(moved, queue.capacity());
        assert_eq!(queue.free_space(), 0);
    }

    #[test]
    fn fill_returns_zero_at_eof() {
        let mut reader = Cursor::new(Vec::<u8>::new());
        let mut queue = ByteQueue::<32>::new();
        assert_eq!(fill_from(&mut reader, &mut queue).unwrap(), 0);
    }

    #[test]
    fn fill_retries_interrupted_reads() {
        let mut reader = InterruptedThenData {
            interrupted: false,
            data: Cursor::new(b"abc".to_vec()),
        };
        let mut queue = ByteQueue::<32>::new();

        assert_eq!(fill_from(&mut reader, &mut queue).unwrap(), 3);
        assert_eq!(queue.drain_to_vec(), b"abc");
    }

    #[test]
    fn drain_writes_everything() {
        let mut queue = ByteQueue::<1024>::new();
        let payload: Vec<u8> = (0..600u32).map(|i| (i % 251) as u8).collect();
        queue.push_all(&payload).unwrap();

        let mut out = Vec::new();
        let moved = drain_into(&mut queue, &mut out).unwrap();

        assert_eq!(moved, payload.len());
        assert_eq!(out, payload);
        assert!(queue.is_empty());
    }

    #[test]
    fn drain_reports_closed_stream() {
        let mut queue = ByteQueue::<8>::new();
        queue.push(1).unwrap();

        let err = drain_into(&mut queue, &mut ZeroWriter).unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }

    struct InterruptedThenData {
        interrupted: bool,
        data: Cursor<Vec<u8>>,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.read(buf)
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
