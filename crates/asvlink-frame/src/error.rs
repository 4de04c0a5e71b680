/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// No sync pattern turned up within the resync budget.
    #[error("frame not found after {shifts} byte shifts")]
    FrameNotFound { shifts: usize },

    /// The frame does not start with the sync pattern.
    #[error("invalid sync pattern (expected 0xFA 0xFA)")]
    InvalidSync,

    /// The trailing CRC does not match the frame contents.
    #[error("checksum mismatch: received {received:#04X}, computed {computed:#04X}")]
    ChecksumMismatch { received: u8, computed: u8 },

    /// The module id byte is not in the fleet address space.
    #[error("unknown module id {0:#04X}")]
    UnknownModule(u8),

    /// The module is known but does not speak this message id.
    #[error("unknown mode {msg_id:#04X} for module {module:#04X}")]
    UnknownMode { module: u8, msg_id: u8 },

    /// Fewer bytes than the smallest possible frame.
    #[error("truncated frame ({len} bytes)")]
    Truncated { len: usize },

    /// The payload size field disagrees with the frame length.
    #[error("payload size field says {declared} bytes, frame carries {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// The payload has the wrong length for its module and mode.
    #[error("payload length {actual} does not match expected {expected}")]
    PayloadLength { expected: usize, actual: usize },

    /// The encoded payload does not fit the 1-byte size field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The payload variant does not belong to the addressed module/mode.
    #[error("payload does not match module {module:#04X} mode {msg_id:#04X}")]
    PayloadMismatch { module: u8, msg_id: u8 },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl FrameError {
    /// Read timed out (or would block) rather than failing outright.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            FrameError::Io(err)
                if matches!(err.kind(), std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock)
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
