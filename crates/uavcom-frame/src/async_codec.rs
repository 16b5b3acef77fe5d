//! `tokio_util` codec for framing async byte streams.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::codec::{decode_frame, encode_frame, Frame, FrameConfig, DELIMITER};
use crate::error::{FrameError, Result};
use crate::stats::{RxStats, TxStats};

/// Stuffed-frame codec for `tokio_util::codec::Framed`.
///
/// Damaged frames are counted and skipped rather than returned as errors,
/// because `Framed` ends the stream after the first decoder error.
#[derive(Debug, Clone)]
pub struct StuffedCodec {
    config: FrameConfig,
    sequence: u16,
    scratch: Vec<u8>,
    rx: RxStats,
    tx: TxStats,
}

impl StuffedCodec {
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            config,
            sequence: 0,
            scratch: vec![0; config.max_encoded_frame_size()],
            rx: RxStats::default(),
            tx: TxStats::default(),
        }
    }

    pub fn rx_stats(&self) -> &RxStats {
        &self.rx
    }

    pub fn tx_stats(&self) -> &TxStats {
        &self.tx
    }
}

impl Default for StuffedCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for StuffedCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        let limit = self.config.max_encoded_frame_size();
        loop {
            let Some(end) = src.iter().position(|&b| b == DELIMITER) else {
                if src.len() >= limit {
                    debug!(bytes = src.len(), "no delimiter within frame limit, discarding");
                    src.clear();
                    self.rx.oversized += 1;
                }
                return Ok(None);
            };

            let stuffed = src.split_to(end);
            src.advance(1);

            if stuffed.len() >= limit {
                self.rx.oversized += 1;
                continue;
            }
            match decode_frame(&stuffed, &mut self.scratch, self.config.max_message_size) {
                Ok(frame) => {
                    self.rx.good += 1;
                    return Ok(Some(frame));
                }
                Err(FrameError::PayloadTooLarge { size, .. }) => {
                    debug!(size, "dropping oversized frame");
                    self.rx.oversized += 1;
                }
                Err(FrameError::Stuffing(err)) => {
                    debug!(error = %err, "dropping undecodable frame");
                    self.rx.decode_fail += 1;
                }
                Err(err) => {
                    debug!(error = %err, "dropping corrupt frame");
                    self.rx.checksum_fail += 1;
                }
            }
        }
    }
}

impl<'a> Encoder<&'a [u8]> for StuffedCodec {
    type Error = FrameError;

    fn encode(&mut self, payload: &'a [u8], dst: &mut BytesMut) -> Result<()> {
        if payload.len() > self.config.max_message_size {
            self.tx.oversized += 1;
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.config.max_message_size,
            });
        }
        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        encode_frame(sequence, payload, dst)?;
        self.tx.good += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_decode() {
        let mut codec = StuffedCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(&b"first"[..], &mut buf).unwrap();
        codec.encode(&b"second"[..], &mut buf).unwrap();

        let f1 = codec.decode(&mut buf).unwrap().unwrap();
        let f2 = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!((f1.sequence, f1.payload.as_ref()), (0, b"first".as_ref()));
        assert_eq!((f2.sequence, f2.payload.as_ref()), (1, b"second".as_ref()));
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(codec.rx_stats().good, 2);
        assert_eq!(codec.tx_stats().good, 2);
    }

    #[test]
    fn partial_frame_waits_for_delimiter() {
        let mut codec = StuffedCodec::new();
        let mut wire = BytesMut::new();
        codec.encode(&b"partial"[..], &mut wire).unwrap();

        let mut buf = BytesMut::from(&wire[..wire.len() - 1]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&[DELIMITER]);
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame.payload.as_ref(), b"partial");
    }

    #[test]
    fn corrupt_frame_is_skipped() {
        let mut codec = StuffedCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(&b"\x05\x06\x07"[..], &mut buf).unwrap();
        buf[1] ^= 0x08;
        codec.encode(&b"after"[..], &mut buf).unwrap();

        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame.payload.as_ref(), b"after");
        assert_eq!(codec.rx_stats().checksum_fail, 1);
    }

    #[test]
    fn oversized_payload_rejected() {
        let mut codec = StuffedCodec::with_config(FrameConfig {
            max_message_size: 2,
        });
        let mut buf = BytesMut::new();
        let err = codec.encode(&b"abc"[..], &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
        assert!(buf.is_empty());
        assert_eq!(codec.tx_stats().oversized, 1);
    }
}
