/// Errors that can occur in byte transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The queue cannot take the requested number of bytes.
    #[error("queue full ({needed} bytes requested, {free} free)")]
    QueueFull { needed: usize, free: usize },

    /// An I/O error occurred on the attached stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The attached stream stopped accepting bytes.
    #[error("stream closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
