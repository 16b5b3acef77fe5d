/// Errors that can occur in link operations.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] uavcom_frame::FrameError),

    /// A message body is shorter than its fixed layout.
    #[error("message {id:#x} body too short ({len} bytes, need {expected})")]
    BodyTooShort { id: u32, len: usize, expected: usize },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error while loading configuration.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LinkError>;
