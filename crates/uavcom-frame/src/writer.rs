use std::io::{self, ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::header::{TransportHeader, HEADER_SIZE};

/// Writes frames to a blocking `Write` stream, such as a serial port opened
/// by a host tool.
///
/// The writer numbers its frames itself, starting at zero. Each frame is
/// written and flushed in full before `send` returns.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    message: Vec<u8>,
    sequence: u16,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(config.max_encoded_frame_size()),
            message: Vec::with_capacity(config.max_message_size),
            sequence: 0,
            config,
        }
    }

    /// Encode and write a payload, returning its sequence number.
    ///
    /// An over-long payload is rejected before a sequence number is used.
    pub fn send(&mut self, payload: &[u8]) -> Result<u16> {
        let max = self.config.max_message_size;
        if payload.len() > max {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max,
            });
        }

        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);

        self.buf.clear();
        encode_frame(sequence, payload, &mut self.buf)?;
        self.inner.write_all(&self.buf).map_err(stream_error)?;
        self.flush()?;
        Ok(sequence)
    }

    /// Write `header` followed by `body` as one frame.
    pub fn send_message(&mut self, header: &TransportHeader, body: &[u8]) -> Result<u16> {
        let mut message = std::mem::take(&mut self.message);
        message.clear();
        message.reserve(HEADER_SIZE + body.len());
        header.put(&mut message);
        message.extend_from_slice(body);

        let result = self.send(&message);
        self.message = message;
        result
    }

    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                other => return other.map_err(stream_error),
            }
        }
    }

    /// Sequence number the next frame will carry.
    pub fn next_sequence(&self) -> u16 {
        self.sequence
    }

    /// Continue numbering from `sequence`, e.g. to append to a capture.
    pub fn set_next_sequence(&mut self, sequence: u16) {
        self.sequence = sequence;
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

// A stream that stops taking bytes has gone away.
fn stream_error(err: io::Error) -> FrameError {
    match err.kind() {
        ErrorKind::WriteZero | ErrorKind::BrokenPipe => FrameError::ConnectionClosed,
        _ => FrameError::Io(err),
    }
}
