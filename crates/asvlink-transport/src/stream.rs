use std::io::{self, ErrorKind, Read, Write};
use std::time::Duration;

use serialport::SerialPort;
use tracing::warn;

use crate::error::{Result, TransportError};
use crate::serial::{clear_port, open_port, SerialConfig};

/// A connected serial line, readable and writable.
///
/// Reads may return fewer bytes than requested and may fail with
/// `TimedOut` once the configured read timeout elapses; framing code above
/// this layer loops until it has what it needs. A read that fails because the
/// device went away reopens the line from its config once before giving up.
pub struct LinkStream {
    port: Box<dyn SerialPort>,
    config: SerialConfig,
}

impl LinkStream {
    pub(crate) fn from_serial(port: Box<dyn SerialPort>, config: SerialConfig) -> Self {
        Self { port, config }
    }

    /// Wrap an already opened port (e.g. one end of a pseudo-terminal pair).
    pub fn from_port(port: Box<dyn SerialPort>) -> Self {
        let config = SerialConfig {
            port: port.name().unwrap_or_default(),
            baud_rate: port.baud_rate().unwrap_or(crate::DEFAULT_BAUD_RATE),
            timeout: port.timeout(),
        };
        Self { port, config }
    }

    /// Settings this line was opened with.
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    /// Set read timeout on the underlying line.
    pub fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.port
            .set_timeout(timeout)
            .map_err(|source| TransportError::Configure {
                port: self.config.port.clone(),
                source,
            })?;
        self.config.timeout = timeout;
        Ok(())
    }

    /// Discard bytes queued in both directions.
    pub fn clear_buffers(&self) -> Result<()> {
        clear_port(self.port.as_ref(), &self.config)
    }

    /// Try to clone this line (creates a new file descriptor).
    ///
    /// Sender/receiver halves and the paired syncer each hold a clone of the
    /// same line; they never read concurrently.
    pub fn try_clone(&self) -> Result<Self> {
        let port = self
            .port
            .try_clone()
            .map_err(|source| TransportError::Configure {
                port: self.config.port.clone(),
                source,
            })?;
        Ok(Self {
            port,
            config: self.config.clone(),
        })
    }

    fn reopen(&mut self) -> Result<()> {
        self.port = open_port(&self.config).map_err(|err| match err {
            TransportError::Open { port, source } => TransportError::Reopen { port, source },
            other => other,
        })?;
        warn!(port = %self.config.port, "serial port was reopened");
        Ok(())
    }
}

impl Read for LinkStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.port.read(buf) {
            Err(err) if is_closed_error(&err) => {
                self.reopen()
                    .map_err(|reopen_err| io::Error::new(err.kind(), reopen_err.to_string()))?;
                self.port.read(buf)
            }
            other => other,
        }
    }
}

impl Write for LinkStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl std::fmt::Debug for LinkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkStream")
            .field("port", &self.config.port)
            .field("baud_rate", &self.config.baud_rate)
            .finish()
    }
}

/// Errors meaning the device disappeared rather than merely being quiet.
pub(crate) fn is_closed_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::BrokenPipe
            | ErrorKind::NotConnected
            | ErrorKind::ConnectionAborted
            | ErrorKind::ConnectionReset
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_errors_are_reconnect_eligible() {
        for kind in [ErrorKind::BrokenPipe, ErrorKind::NotConnected] {
            let err = TransportError::Io(io::Error::from(kind));
            assert!(err.is_reconnect_eligible());
        }
        let timeout = TransportError::Io(io::Error::from(ErrorKind::TimedOut));
        assert!(!timeout.is_reconnect_eligible());
    }

    #[test]
    #[cfg(unix)]
    fn pty_pair_roundtrip() {
        let (master, slave) = serialport::TTYPort::pair().unwrap();
        let mut module_side = LinkStream::from_port(Box::new(slave));
        let mut controller_side = LinkStream::from_port(Box::new(master));
        controller_side
            .set_read_timeout(Duration::from_millis(200))
            .unwrap();

        module_side.write_all(&[0xFA, 0xFA, 0xFF]).unwrap();
        module_side.flush().unwrap();

        let mut buf = [0u8; 3];
        controller_side.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [0xFA, 0xFA, 0xFF]);
    }

    #[test]
    #[cfg(unix)]
    fn try_clone_shares_line() {
        let (master, slave) = serialport::TTYPort::pair().unwrap();
        let module_side = LinkStream::from_port(Box::new(slave));
        let mut writer = module_side.try_clone().unwrap();
        let mut controller_side = LinkStream::from_port(Box::new(master));
        controller_side
            .set_read_timeout(Duration::from_millis(200))
            .unwrap();

        writer.write_all(&[0x01, 0x02]).unwrap();
        writer.flush().unwrap();

        let mut buf = [0u8; 2];
        controller_side.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [0x01, 0x02]);
        drop(module_side);
    }
}
