/// Errors produced by the byte-stuffing codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StuffingError {
    /// The output buffer is too small. `required` is the size that would
    /// have been written.
    #[error("not enough memory ({required} bytes required)")]
    NotEnoughMemory { required: usize },

    /// Decoding was asked to process zero bytes.
    #[error("empty stuffed input")]
    EmptyInput,

    /// A block announced more literal bytes than the input holds.
    #[error("stuffed input truncated inside a block")]
    Truncated,

    /// A zero code byte was found inside stuffed data.
    #[error("invalid zero code byte at offset {offset}")]
    InvalidCode { offset: usize },
}

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The outbound byte queue cannot hold the encoded frame.
    #[error("no buffer space ({needed} bytes needed, {free} free)")]
    NoBufferSpace { needed: usize, free: usize },

    /// The stuffed frame could not be decoded.
    #[error("stuffing error: {0}")]
    Stuffing(#[from] StuffingError),

    /// The decoded frame is too short to carry a payload.
    #[error("frame too short ({len} bytes)")]
    FrameTooShort { len: usize },

    /// The checksum carried by the frame does not match its contents.
    #[error("checksum mismatch (frame {received:#06x}, computed {computed:#06x})")]
    ChecksumMismatch { received: u16, computed: u16 },

    /// The payload is too short to carry a transport header.
    #[error("payload too short for transport header ({len} bytes)")]
    HeaderTooShort { len: usize },

    /// Byte queue failure other than backpressure.
    #[error("transport error: {0}")]
    Transport(uavcom_transport::TransportError),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended.
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// True for errors that mean the frame arrived damaged on the wire.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            FrameError::Stuffing(_)
                | FrameError::FrameTooShort { .. }
                | FrameError::ChecksumMismatch { .. }
        )
    }
}

impl From<uavcom_transport::TransportError> for FrameError {
    fn from(err: uavcom_transport::TransportError) -> Self {
        match err {
            uavcom_transport::TransportError::QueueFull { needed, free } => {
                FrameError::NoBufferSpace { needed, free }
            }
            uavcom_transport::TransportError::Io(io) => FrameError::Io(io),
            other => FrameError::Transport(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
