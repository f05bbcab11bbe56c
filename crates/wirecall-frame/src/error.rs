/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame header carries a frame type byte outside the protocol range.
    #[error("unknown frame type {0} (expected 0..=3)")]
    UnknownFrameType(u8),

    /// The method name or payload exceeds the wire format's length field.
    #[error("frame field too large ({size} bytes, max {max})")]
    FieldTooLarge { size: usize, max: usize },

    /// An I/O error occurred while writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame could be written.
    #[error("connection closed")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
