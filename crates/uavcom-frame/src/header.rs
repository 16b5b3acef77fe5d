//! Transport header carried at the start of every payload.

use bytes::{Buf, BufMut};

use crate::error::{FrameError, Result};

/// Header size on the wire: id (4) + flags (1) + ack id (2).
pub const HEADER_SIZE: usize = 7;

bitflags::bitflags! {
    /// Transport header flag bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TransportFlags: u8 {
        /// The sender wants an acknowledgement frame back.
        const ACK_REQUEST = 0x01;
        /// This frame acknowledges an earlier request.
        const ACK_RESPONSE = 0x02;
    }
}

/// Typed header: message id, flags and acknowledgement correlation id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransportHeader {
    pub id: u32,
    pub flags: TransportFlags,
    pub ack_id: u16,
}

impl TransportHeader {
    /// Plain header without acknowledgement.
    pub fn new(id: u32) -> Self {
        Self {
            id,
            flags: TransportFlags::empty(),
            ack_id: 0,
        }
    }

    /// Request an acknowledgement correlated by `ack_id`.
    pub fn with_ack_request(mut self, ack_id: u16) -> Self {
        self.flags |= TransportFlags::ACK_REQUEST;
        self.ack_id = ack_id;
        self
    }

    pub fn wants_ack(&self) -> bool {
        self.flags.contains(TransportFlags::ACK_REQUEST)
    }

    pub fn is_ack(&self) -> bool {
        self.flags.contains(TransportFlags::ACK_RESPONSE)
    }

    /// The header of the acknowledgement answering this one.
    pub fn ack_response(&self) -> Self {
        Self {
            id: self.id,
            flags: TransportFlags::ACK_RESPONSE,
            ack_id: self.ack_id,
        }
    }

    /// Append the wire form to `dst`.
    pub fn put<B: BufMut>(&self, dst: &mut B) {
        dst.put_u32_le(self.id);
        dst.put_u8(self.flags.bits());
        dst.put_u16_le(self.ack_id);
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        self.put(&mut &mut out[..]);
        out
    }

    /// Split a payload into its header and message body.
    ///
    /// Unknown flag bits are preserved.
    pub fn parse(payload: &[u8]) -> Result<(Self, &[u8])> {
        if payload.len() < HEADER_SIZE {
            return Err(FrameError::HeaderTooShort { len: payload.len() });
        }
        let (mut head, body) = payload.split_at(HEADER_SIZE);
        let id = head.get_u32_le();
        let flags = TransportFlags::from_bits_retain(head.get_u8());
        let ack_id = head.get_u16_le();
        Ok((Self { id, flags, ack_id }, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_layout_is_little_endian() {
        let header = TransportHeader::new(0x0403_0201).with_ack_request(0x0605);
        assert_eq!(header.to_bytes(), [0x01, 0x02, 0x03, 0x04, 0x01, 0x05, 0x06]);
    }

    #[test]
    fn parse_splits_body() {
        let mut wire = TransportHeader::new(0x201).to_bytes().to_vec();
        wire.extend_from_slice(b"body");

        let (header, body) = TransportHeader::parse(&wire).unwrap();
        assert_eq!(header.id, 0x201);
        assert!(!header.wants_ack());
        assert_eq!(body, b"body");
    }

    #[test]
    fn parse_rejects_short_payload() {
        let err = TransportHeader::parse(&[1, 2, 3]).unwrap_err();
        assert!(matches!(err, FrameError::HeaderTooShort { len: 3 }));
    }

    #[test]
    fn ack_response_keeps_correlation() {
        let request = TransportHeader::new(9).with_ack_request(77);
        let ack = request.ack_response();

        assert_eq!(ack.id, 9);
        assert_eq!(ack.ack_id, 77);
        assert!(ack.is_ack());
        assert!(!ack.wants_ack());
    }

    #[test]
    fn unknown_flags_survive_parse() {
        let wire = [0, 0, 0, 0, 0x81, 0, 0];
        let (header, _) = TransportHeader::parse(&wire).unwrap();
        assert_eq!(header.flags.bits(), 0x81);
        assert!(header.wants_ack());
    }
}
