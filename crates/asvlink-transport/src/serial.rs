use std::fmt;
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::LinkStream;

/// Default line speed shared with the module firmware.
pub const DEFAULT_BAUD_RATE: u32 = 921_600;

/// Default read timeout. Bounds how long a blocked read can delay shutdown.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(500);

// Stand-in for "no timeout"; a zero timeout would make reads non-blocking.
const BLOCKING_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Serial line settings (8N1, no flow control).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttySC0`.
    pub port: String,
    /// Line speed in bit/s.
    pub baud_rate: u32,
    /// Read timeout. `Duration::ZERO` blocks until data arrives.
    pub timeout: Duration,
}

impl SerialConfig {
    /// Settings for `port` with default speed and timeout.
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Override the line speed.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Override the read timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Open the line described by this config.
    pub fn open(&self) -> Result<LinkStream> {
        let port = open_port(self)?;
        info!(port = %self.port, baud_rate = self.baud_rate, "opened serial line");
        Ok(LinkStream::from_serial(port, self.clone()))
    }

    /// Open the line and discard anything already queued in either direction.
    pub fn open_clean(&self) -> Result<LinkStream> {
        let stream = self.open()?;
        stream.clear_buffers()?;
        Ok(stream)
    }
}

impl fmt::Display for SerialConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "port: {:?}, baudrate: {}, timeout: {:?}",
            self.port, self.baud_rate, self.timeout
        )
    }
}

pub(crate) fn open_port(config: &SerialConfig) -> Result<Box<dyn SerialPort>> {
    let mut builder = serialport::new(config.port.as_str(), config.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None);

    builder = if config.timeout.is_zero() {
        builder.timeout(BLOCKING_TIMEOUT)
    } else {
        builder.timeout(config.timeout)
    };

    builder.open().map_err(|source| TransportError::Open {
        port: config.port.clone(),
        source,
    })
}

pub(crate) fn clear_port(port: &dyn SerialPort, config: &SerialConfig) -> Result<()> {
    port.clear(ClearBuffer::All)
        .map_err(|source| TransportError::Configure {
            port: config.port.clone(),
            source,
        })?;
    debug!(port = %config.port, "cleared serial buffers");
    Ok(())
}
