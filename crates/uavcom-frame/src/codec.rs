use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::checksum::{checksum, Checksum};
use crate::error::{FrameError, Result};
use crate::header::{TransportHeader, HEADER_SIZE};
use crate::stuffing::{self, max_stuffed_size, Encoder};

/// Sequence number size on the wire.
pub const SEQUENCE_SIZE: usize = 2;

/// Checksum size on the wire.
pub const CHECKSUM_SIZE: usize = 2;

/// Bytes appended to every payload before stuffing.
pub const FRAME_OVERHEAD: usize = SEQUENCE_SIZE + CHECKSUM_SIZE;

/// Frame delimiter. Never appears inside stuffed data.
pub const DELIMITER: u8 = 0x00;

/// Default maximum unstuffed payload size.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 128;

/// Largest stuffed frame, delimiter included, for a given payload limit.
pub const fn max_encoded_frame_size(max_message_size: usize) -> usize {
    max_stuffed_size(max_message_size + FRAME_OVERHEAD) + 1
}

/// A decoded, checksum-verified frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Sender's sequence number.
    pub sequence: u16,
    /// Header and message body.
    pub payload: Bytes,
}

impl Frame {
    pub fn new(sequence: u16, payload: impl Into<Bytes>) -> Self {
        Self {
            sequence,
            payload: payload.into(),
        }
    }

    /// Parse the transport header, returning it with the message body.
    pub fn header(&self) -> Result<(TransportHeader, &[u8])> {
        TransportHeader::parse(&self.payload)
    }

    /// Upper bound on the stuffed wire size, delimiter included.
    pub fn wire_size(&self) -> usize {
        max_stuffed_size(self.payload.len() + FRAME_OVERHEAD) + 1
    }
}

/// Configuration for the frame layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Maximum unstuffed payload size in bytes. Default: 128.
    pub max_message_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl FrameConfig {
    /// Size of the inbound accumulation buffer.
    pub fn max_encoded_frame_size(&self) -> usize {
        max_encoded_frame_size(self.max_message_size)
    }

    /// Largest message body that fits behind a transport header.
    pub fn max_body_size(&self) -> usize {
        self.max_message_size.saturating_sub(HEADER_SIZE)
    }
}

/// Checksum over payload followed by the little-endian sequence number.
pub fn frame_checksum(payload: &[u8], sequence: u16) -> u16 {
    let mut crc = Checksum::new();
    crc.update(payload);
    crc.update(&sequence.to_le_bytes());
    crc.finalize()
}

/// Encode one frame into the wire format, appending to `dst`.
///
/// Wire format:
/// ```text
/// ┌────────────────────────────────────────────────────┬───────────┐
/// │ stuffed( payload ‖ sequence (2B LE) ‖ crc (2B LE) ) │ 0x00      │
/// └────────────────────────────────────────────────────┴───────────┘
/// ```
///
/// Returns the number of bytes appended.
pub fn encode_frame(sequence: u16, payload: &[u8], dst: &mut BytesMut) -> Result<usize> {
    let crc = frame_checksum(payload, sequence);
    let unstuffed = payload.len() + FRAME_OVERHEAD;

    let start = dst.len();
    dst.resize(start + max_stuffed_size(unstuffed), 0);

    let mut enc = Encoder::start(unstuffed, &mut dst[start..])?;
    enc.feed_block(payload);
    enc.feed_block(&sequence.to_le_bytes());
    enc.feed_block(&crc.to_le_bytes());
    let written = enc.finalize()?;

    dst.truncate(start + written);
    dst.put_u8(DELIMITER);
    Ok(written + 1)
}

/// Decode one stuffed frame (delimiter already stripped) and verify it.
///
/// `scratch` receives the unstuffed bytes and must hold at least the
/// payload plus [`FRAME_OVERHEAD`]. A payload longer than `max_message_size`
/// is rejected even when `scratch` could hold it.
pub fn decode_frame(stuffed: &[u8], scratch: &mut [u8], max_message_size: usize) -> Result<Frame> {
    let len = stuffing::decode(stuffed, scratch)?;
    if len <= FRAME_OVERHEAD {
        return Err(FrameError::FrameTooShort { len });
    }
    let size = len - FRAME_OVERHEAD;
    if size > max_message_size {
        return Err(FrameError::PayloadTooLarge {
            size,
            max: max_message_size,
        });
    }

    let body_end = len - CHECKSUM_SIZE;
    let computed = checksum(&scratch[..body_end]);
    let received = u16::from_le_bytes([scratch[body_end], scratch[body_end + 1]]);
    if computed != received {
        return Err(FrameError::ChecksumMismatch { received, computed });
    }

    let payload_end = body_end - SEQUENCE_SIZE;
    let sequence = u16::from_le_bytes([scratch[payload_end], scratch[payload_end + 1]]);
    Ok(Frame {
        sequence,
        payload: Bytes::copy_from_slice(&scratch[..payload_end]),
    })
}
