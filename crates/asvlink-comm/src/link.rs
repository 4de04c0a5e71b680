use std::io::{Read, Write};

use asvlink_frame::{FrameConfig, FrameReader, FrameWriter, Message, OriginHandle};
use asvlink_transport::{LinkStream, SerialConfig};

use crate::error::Result;

/// Both directions of one point-to-point line.
pub struct Link<R, W> {
    pub reader: FrameReader<R>,
    pub writer: FrameWriter<W>,
}

impl<R: Read, W: Write> Link<R, W> {
    pub fn new(reader: FrameReader<R>, writer: FrameWriter<W>) -> Self {
        Self { reader, writer }
    }

    /// Stamp, encode and write one message.
    pub fn send(&mut self, msg: &mut Message) -> Result<()> {
        self.writer.send(msg)?;
        Ok(())
    }

    /// Read and decode the next message.
    pub fn recv(&mut self) -> Result<Message> {
        Ok(self.reader.read_message()?)
    }

    pub fn into_parts(self) -> (FrameReader<R>, FrameWriter<W>) {
        (self.reader, self.writer)
    }
}

impl Link<LinkStream, LinkStream> {
    /// Open a serial line and split it into reader and writer halves.
    pub fn open(serial: &SerialConfig, origin: OriginHandle) -> Result<Self> {
        let stream = serial.open_clean()?;
        Self::from_stream(stream, origin)
    }

    pub fn from_stream(stream: LinkStream, origin: OriginHandle) -> Result<Self> {
        let reader_stream = stream.try_clone()?;
        let frame_config = FrameConfig {
            read_timeout: Some(stream.config().timeout).filter(|t| !t.is_zero()),
            ..FrameConfig::default()
        };
        let reader = FrameReader::with_config_link(reader_stream, frame_config)?;
        let writer = FrameWriter::new(stream, origin);
        Ok(Self::new(reader, writer))
    }
}

#[cfg(all(test, unix))]
pub(crate) mod test_support {
    use std::os::unix::net::UnixStream;
    use std::time::Duration;

    use asvlink_frame::{FrameReader, FrameWriter, OriginHandle};

    use super::Link;

    /// Two linked ends over a socket pair; reads time out after `timeout`.
    pub fn pair(
        origin: OriginHandle,
        timeout: Duration,
    ) -> (Link<UnixStream, UnixStream>, Link<UnixStream, UnixStream>) {
        let (left, right) = UnixStream::pair().unwrap();
        (end(left, origin.clone(), timeout), end(right, origin, timeout))
    }

    pub fn end(stream: UnixStream, origin: OriginHandle, timeout: Duration) -> Link<UnixStream, UnixStream> {
        stream.set_read_timeout(Some(timeout)).unwrap();
        let reader = FrameReader::new(stream.try_clone().unwrap());
        Link::new(reader, FrameWriter::new(stream, origin))
    }
}
