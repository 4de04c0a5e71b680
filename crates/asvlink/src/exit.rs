use std::fmt;
use std::io;

use asvlink_comm::CommError;
use asvlink_frame::FrameError;
use asvlink_transport::TransportError;

// Exit codes follow sysexits where one fits.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const CONFIG: i32 = 78;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::PayloadTooLarge { .. }
        | FrameError::PayloadLength { .. }
        | FrameError::PayloadMismatch { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn comm_error(context: &str, err: CommError) -> CliError {
    match err {
        CommError::Transport(err) => transport_error(context, err),
        CommError::Frame(err) => frame_error(context, err),
        CommError::Config(_) => CliError::new(CONFIG, format!("{context}: {err}")),
        CommError::ImageTooLarge { .. } => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        CommError::AckTimeout | CommError::SyncTimeout { .. } => {
            CliError::new(TIMEOUT, format!("{context}: {err}"))
        }
        CommError::Storage(source) => io_error(context, source),
        other => CliError::new(FAILURE, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_map_to_124() {
        let err = comm_error("sync", CommError::SyncTimeout { attempts: 10 });
        assert_eq!(err.code, TIMEOUT);
        assert_eq!(err.to_string(), "sync: time sync failed after 10 attempts");
    }

    #[test]
    fn config_errors_map_to_78() {
        let err = comm_error("load", CommError::Config("bad".to_string()));
        assert_eq!(err.code, CONFIG);
    }

    #[test]
    fn nested_io_error_keeps_its_kind() {
        let io = io::Error::from(io::ErrorKind::PermissionDenied);
        let err = comm_error("open", CommError::Transport(TransportError::Io(io)));
        assert_eq!(err.code, PERMISSION_DENIED);
    }
}
