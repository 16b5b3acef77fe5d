//! Byte-stuffed, checksummed framing for the uavcom serial link.
//!
//! Every message travels as one self-delimiting frame:
//! - the payload (transport header + message body)
//! - a 2-byte little-endian sequence number
//! - a 2-byte little-endian CRC-16 over payload and sequence number
//!
//! all stuffed so the only zero byte on the wire is the trailing delimiter.
//! A receiver that joins mid-stream or loses bytes resynchronizes at the next
//! zero.
//!
//! [`FrameLink`] drives a link over non-blocking byte queues and counts every
//! outcome. [`FrameReader`] and [`FrameWriter`] do the same job over blocking
//! `std::io` streams for host-side tools.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod checksum;
pub mod codec;
pub mod error;
pub mod header;
pub mod link;
pub mod reader;
pub mod stats;
pub mod stuffing;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::StuffedCodec;
pub use codec::{
    decode_frame, encode_frame, max_encoded_frame_size, Frame, FrameConfig,
    DEFAULT_MAX_MESSAGE_SIZE, DELIMITER, FRAME_OVERHEAD,
};
pub use error::{FrameError, Result, StuffingError};
pub use header::{TransportFlags, TransportHeader, HEADER_SIZE};
pub use link::FrameLink;
pub use reader::FrameReader;
pub use stats::{LinkStats, RxStats, TxStats};
pub use writer::FrameWriter;
