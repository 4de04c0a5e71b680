/// Errors that can occur in serial transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the serial line.
    #[error("failed to open serial port {port}: {source}")]
    Open {
        port: String,
        source: serialport::Error,
    },

    /// The line was closed underneath us and could not be reopened.
    #[error("serial port {port} closed and failed to reopen: {source}")]
    Reopen {
        port: String,
        source: serialport::Error,
    },

    /// Failed to apply a setting (timeout, buffer reset) to an open line.
    #[error("failed to configure serial port {port}: {source}")]
    Configure {
        port: String,
        source: serialport::Error,
    },

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Whether a caller may reasonably try to reopen the line after this error.
    pub fn is_reconnect_eligible(&self) -> bool {
        match self {
            TransportError::Io(err) => crate::stream::is_closed_error(err),
            TransportError::Reopen { .. } => true,
            TransportError::Open { .. } | TransportError::Configure { .. } => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
