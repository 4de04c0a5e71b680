use asvlink_frame::MessageId;

/// Errors that can occur in link-level operations.
#[derive(Debug, thiserror::Error)]
pub enum CommError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] asvlink_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] asvlink_frame::FrameError),

    /// No acknowledgement arrived before the read timeout.
    #[error("acknowledgement timed out")]
    AckTimeout,

    /// The peer answered with something other than Ack-OK.
    #[error("expected ACK_OK, got {0}")]
    AckMismatch(MessageId),

    /// The sync handshake never completed.
    #[error("time sync failed after {attempts} attempts")]
    SyncTimeout { attempts: usize },

    /// A message arrived that the current role cannot handle.
    #[error("unexpected message {0}")]
    UnexpectedMessage(MessageId),

    /// Chunk counters broke the 1..=total contiguous sequence.
    #[error("chunk sequence violated: {0}")]
    ChunkSequence(String),

    /// The image needs more chunks than the 1-byte counter allows.
    #[error("image of {size} bytes exceeds {max} bytes at the configured chunk size")]
    ImageTooLarge { size: usize, max: usize },

    /// Every attempt of a retried operation failed.
    #[error("{op} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        op: &'static str,
        attempts: usize,
        last: Box<CommError>,
    },

    /// The measurement source failed.
    #[error("measurement failed: {0}")]
    Measurement(String),

    /// The image sink could not store an image.
    #[error("storage error: {0}")]
    Storage(#[source] std::io::Error),

    /// Configuration file could not be parsed or is inconsistent.
    #[error("config error: {0}")]
    Config(String),
}

impl CommError {
    /// Error of the final attempt, unwrapping retry exhaustion.
    pub fn root(&self) -> &CommError {
        match self {
            CommError::RetriesExhausted { last, .. } => last.root(),
            other => other,
        }
    }

    /// The underlying read timed out rather than failing outright.
    pub fn is_timeout(&self) -> bool {
        match self.root() {
            CommError::Frame(err) => err.is_timeout(),
            CommError::AckTimeout => true,
            _ => false,
        }
    }

    /// The line is gone; retrying on it cannot succeed.
    pub fn is_disconnected(&self) -> bool {
        matches!(
            self.root(),
            CommError::Frame(asvlink_frame::FrameError::ConnectionClosed)
        )
    }
}

pub type Result<T> = std::result::Result<T, CommError>;
