use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};

use crate::codec::{decode_frame, Frame, FrameConfig, DELIMITER};
use crate::error::{FrameError, Result};

const READ_CHUNK_SIZE: usize = 512;

/// Pulls frames out of a blocking byte stream, such as a capture file or a
/// serial device.
///
/// A damaged frame is reported as an error and skipped; the next call picks
/// up after its delimiter, so a caller can keep reading past corruption.
pub struct FrameReader<T> {
    inner: T,
    pending: BytesMut,
    scratch: Vec<u8>,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        let encoded = config.max_encoded_frame_size();
        Self {
            inner,
            pending: BytesMut::with_capacity(encoded + READ_CHUNK_SIZE),
            scratch: vec![0; encoded],
            config,
        }
    }

    /// Block until the next frame or damaged frame is delimited.
    ///
    /// End of stream is `Err(FrameError::ConnectionClosed)`; an unterminated
    /// tail is dropped.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(result) = self.take_buffered() {
                return result;
            }
            if self.fill()? == 0 {
                self.pending.clear();
                return Err(FrameError::ConnectionClosed);
            }
        }
    }

    // Appends one read's worth of bytes; 0 means end of stream.
    fn fill(&mut self) -> Result<usize> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(n) => {
                    self.pending.extend_from_slice(&chunk[..n]);
                    return Ok(n);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    fn take_buffered(&mut self) -> Option<Result<Frame>> {
        let limit = self.config.max_encoded_frame_size();
        let too_large = |size: usize| FrameError::PayloadTooLarge {
            size,
            max: self.config.max_message_size,
        };

        match self.pending.iter().position(|&b| b == DELIMITER) {
            Some(end) => {
                let stuffed = self.pending.split_to(end);
                self.pending.advance(1);
                if stuffed.len() >= limit {
                    return Some(Err(too_large(stuffed.len())));
                }
                Some(decode_frame(
                    &stuffed,
                    &mut self.scratch,
                    self.config.max_message_size,
                ))
            }
            // no delimiter within a full frame's worth of bytes
            None if self.pending.len() >= limit => {
                let size = self.pending.len();
                self.pending.clear();
                Some(Err(too_large(size)))
            }
            None => None,
        }
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

impl<T: Read> Iterator for FrameReader<T> {
    type Item = Result<Frame>;

    /// Frames and per-frame errors, ending when the stream closes.
    fn next(&mut self) -> Option<Self::Item> {
        match self.read_frame() {
            Err(FrameError::ConnectionClosed) => None,
            other => Some(other),
        }
    }
}
