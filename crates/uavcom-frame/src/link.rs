use bytes::BytesMut;
use tracing::{debug, trace};
use uavcom_transport::{ByteSink, ByteSource};

use crate::codec::{decode_frame, encode_frame, Frame, FrameConfig, DELIMITER};
use crate::error::{FrameError, Result};
use crate::header::{TransportHeader, HEADER_SIZE};
use crate::stats::LinkStats;

/// Frame transport state for one serial link.
///
/// Outbound, [`send`](Self::send) stamps each payload with the next sequence
/// number and a checksum, stuffs it and pushes the whole frame into a byte
/// queue. Inbound, [`feed`](Self::feed) accumulates bytes until a delimiter
/// and returns every frame that verifies. Every outcome is counted in
/// [`LinkStats`].
///
/// ```
/// use uavcom_frame::{FrameLink, TransportHeader};
///
/// let mut vehicle = FrameLink::new();
/// let mut wire = Vec::new();
/// vehicle
///     .send_message(&mut wire, &TransportHeader::new(0x101), b"status")
///     .unwrap();
///
/// let mut peer = FrameLink::new();
/// let frame = wire.iter().find_map(|&b| peer.feed(b)).unwrap();
/// let (header, body) = frame.header().unwrap();
/// assert_eq!(header.id, 0x101);
/// assert_eq!(body, b"status");
/// ```
pub struct FrameLink {
    config: FrameConfig,
    sequence: u16,
    rx_buf: Vec<u8>,
    rx_used: usize,
    scratch: Vec<u8>,
    tx_buf: BytesMut,
    message_buf: BytesMut,
    stats: LinkStats,
}

impl FrameLink {
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    pub fn with_config(config: FrameConfig) -> Self {
        let encoded = config.max_encoded_frame_size();
        Self {
            config,
            sequence: 0,
            rx_buf: vec![0; encoded],
            rx_used: 0,
            scratch: vec![0; encoded],
            tx_buf: BytesMut::with_capacity(encoded),
            message_buf: BytesMut::with_capacity(config.max_message_size),
            stats: LinkStats::default(),
        }
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    /// Sequence number the next accepted send will carry.
    pub fn next_sequence(&self) -> u16 {
        self.sequence
    }

    /// Encode `payload` and push the stuffed frame into `tx`.
    ///
    /// Either the whole frame is queued or nothing is. Returns the sequence
    /// number used. The sequence number is consumed even when the queue is
    /// full, so the peer sees the gap.
    pub fn send<S: ByteSink + ?Sized>(&mut self, tx: &mut S, payload: &[u8]) -> Result<u16> {
        let max = self.config.max_message_size;
        if payload.len() > max {
            self.stats.tx.oversized += 1;
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max,
            });
        }

        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);

        self.tx_buf.clear();
        encode_frame(sequence, payload, &mut self.tx_buf)?;

        if let Err(err) = tx.push_all(&self.tx_buf) {
            let err = FrameError::from(err);
            if matches!(err, FrameError::NoBufferSpace { .. }) {
                self.stats.tx.no_buffer_space += 1;
            }
            return Err(err);
        }

        self.stats.tx.good += 1;
        trace!(
            sequence,
            payload = payload.len(),
            wire = self.tx_buf.len(),
            "frame queued"
        );
        Ok(sequence)
    }

    /// Prefix `body` with `header` and send it.
    ///
    /// An over-long message is rejected before any counter or the sequence
    /// number changes.
    pub fn send_message<S: ByteSink + ?Sized>(
        &mut self,
        tx: &mut S,
        header: &TransportHeader,
        body: &[u8],
    ) -> Result<u16> {
        let size = HEADER_SIZE + body.len();
        if size > self.config.max_message_size {
            return Err(FrameError::PayloadTooLarge {
                size,
                max: self.config.max_message_size,
            });
        }

        let mut message = std::mem::take(&mut self.message_buf);
        message.clear();
        header.put(&mut message);
        message.extend_from_slice(body);

        let result = self.send(tx, &message);
        self.message_buf = message;
        result
    }

    /// Process one received byte.
    ///
    /// Returns a frame when `byte` is a delimiter closing a frame that
    /// decodes and verifies. Damaged frames are counted and dropped.
    pub fn feed(&mut self, byte: u8) -> Option<Frame> {
        if byte != DELIMITER {
            self.rx_buf[self.rx_used] = byte;
            self.rx_used += 1;
            if self.rx_used == self.rx_buf.len() {
                debug!(bytes = self.rx_used, "no delimiter within frame limit, discarding");
                self.rx_used = 0;
                self.stats.rx.oversized += 1;
            }
            return None;
        }

        let used = std::mem::replace(&mut self.rx_used, 0);
        let max = self.config.max_message_size;
        match decode_frame(&self.rx_buf[..used], &mut self.scratch, max) {
            Ok(frame) => {
                self.stats.rx.good += 1;
                Some(frame)
            }
            Err(FrameError::PayloadTooLarge { size, .. }) => {
                debug!(size, max, "dropping oversized frame");
                self.stats.rx.oversized += 1;
                None
            }
            Err(FrameError::Stuffing(err)) => {
                debug!(error = %err, bytes = used, "dropping undecodable frame");
                self.stats.rx.decode_fail += 1;
                None
            }
            Err(err) => {
                debug!(error = %err, bytes = used, "dropping corrupt frame");
                self.stats.rx.checksum_fail += 1;
                None
            }
        }
    }

    /// Pop bytes from `rx` until a frame completes or the queue runs dry.
    pub fn poll<S: ByteSource + ?Sized>(&mut self, rx: &mut S) -> Option<Frame> {
        while let Some(byte) = rx.pop() {
            if let Some(frame) = self.feed(byte) {
                return Some(frame);
            }
        }
        None
    }
}

impl Default for FrameLink {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FrameLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameLink")
            .field("config", &self.config)
            .field("sequence", &self.sequence)
            .field("rx_used", &self.rx_used)
            .field("stats", &self.stats)
            .finish()
    }
}
