use std::io::{ErrorKind, Write};
use std::thread;
use std::time::Duration;

use bytes::BytesMut;

use crate::clock::OriginHandle;
use crate::codec::{encode_message, Message, MIN_FRAME_SIZE, MAX_PAYLOAD};
use crate::error::{FrameError, Result};
use crate::ids::{MessageId, ModuleId};

const INITIAL_BUFFER_CAPACITY: usize = MIN_FRAME_SIZE + MAX_PAYLOAD;

/// Pause before retrying a write the stream refused with `WouldBlock`.
/// A full frame takes well under a millisecond on the line.
pub const WOULD_BLOCK_BACKOFF: Duration = Duration::from_millis(1);

/// Writes complete frames to any `Write` stream.
///
/// Every message is stamped with the current `system_time` relative to the
/// shared time origin just before encoding.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    origin: OriginHandle,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T, origin: OriginHandle) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            origin,
        }
    }

    /// Stamp, encode and send a message (blocking).
    ///
    /// On success `msg` carries the `system_time`, `payload_size` and
    /// `checksum` that went on the wire.
    pub fn send(&mut self, msg: &mut Message) -> Result<()> {
        msg.system_time = self.origin.system_time();
        self.buf.clear();
        encode_message(msg, &mut self.buf)?;
        self.write_buffered()?;
        tracing::trace!(
            module = %msg.module,
            msg_id = %msg.msg_id,
            size = msg.payload_size,
            "frame sent"
        );
        Ok(())
    }

    /// Send a payload-less control message (sync request or acknowledgement).
    pub fn send_control(&mut self, module: ModuleId, msg_id: MessageId) -> Result<Message> {
        let mut msg = Message::control(module, msg_id);
        self.send(&mut msg)?;
        Ok(msg)
    }

    /// Write pre-encoded bytes verbatim.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.clear();
        self.buf.extend_from_slice(bytes);
        self.write_buffered()
    }

    fn write_buffered(&mut self) -> Result<()> {
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(WOULD_BLOCK_BACKOFF)
                }
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(WOULD_BLOCK_BACKOFF)
                }
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Time origin used for stamping.
    pub fn origin(&self) -> &OriginHandle {
        &self.origin
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::clock::{unix_millis_now, TimeOrigin};
    use crate::codec::decode_message;
    use crate::payload::{CheckData, Payload};

    #[test]
    fn stamps_system_time_from_origin() {
        let origin = TimeOrigin::at(unix_millis_now() - 5_000);
        let mut writer = FrameWriter::new(Vec::new(), origin.handle());

        let mut msg = Message::new(
            ModuleId::Check,
            MessageId::WritingModeA,
            Payload::Check(CheckData { value: 3 }),
        );
        writer.send(&mut msg).unwrap();
        assert!((5_000..6_000).contains(&msg.system_time));

        let decoded = decode_message(writer.get_ref()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn send_control_has_empty_payload() {
        let origin = TimeOrigin::starting_now();
        let mut writer = FrameWriter::new(Vec::new(), origin.handle());
        let sent = writer
            .send_control(ModuleId::Camera, MessageId::AckOk)
            .unwrap();

        assert_eq!(sent.payload_size, 0);
        assert_eq!(writer.get_ref().len(), MIN_FRAME_SIZE);
        assert_eq!(decode_message(writer.get_ref()).unwrap(), sent);
    }

    #[test]
    fn encode_failure_writes_nothing() {
        let origin = TimeOrigin::starting_now();
        let mut writer = FrameWriter::new(Vec::new(), origin.handle());
        let mut msg = Message::new(
            ModuleId::Lidar,
            MessageId::WritingModeA,
            Payload::Check(CheckData { value: 1 }),
        );
        assert!(writer.send(&mut msg).is_err());
        assert!(writer.get_ref().is_empty());
    }

    #[test]
    fn short_writes_are_completed() {
        let origin = TimeOrigin::starting_now();
        let sink = ChunkedWriter {
            written: Vec::new(),
            interrupted: false,
        };
        let mut writer = FrameWriter::new(sink, origin.handle());
        writer.write_raw(&[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(writer.into_inner().written, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn zero_length_write_is_connection_closed() {
        let origin = TimeOrigin::starting_now();
        let mut writer = FrameWriter::new(ClosedWriter, origin.handle());
        let err = writer.write_raw(&[1]).unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn would_block_backs_off_then_completes() {
        let origin = TimeOrigin::starting_now();
        let sink = BusyWriter {
            written: Vec::new(),
            write_refusals: 3,
            flush_refusals: 2,
        };
        let mut writer = FrameWriter::new(sink, origin.handle());

        let started = std::time::Instant::now();
        writer.write_raw(&[7, 8, 9]).unwrap();
        assert!(started.elapsed() >= WOULD_BLOCK_BACKOFF * 5);

        let sink = writer.into_inner();
        assert_eq!(sink.written, vec![7, 8, 9]);
        assert_eq!((sink.write_refusals, sink.flush_refusals), (0, 0));
    }

    struct BusyWriter {
        written: Vec<u8>,
        write_refusals: usize,
        flush_refusals: usize,
    }

    impl Write for BusyWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.write_refusals > 0 {
                self.write_refusals -= 1;
                return Err(io::Error::from(ErrorKind::WouldBlock));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            if self.flush_refusals > 0 {
                self.flush_refusals -= 1;
                return Err(io::Error::from(ErrorKind::WouldBlock));
            }
            Ok(())
        }
    }

    struct ChunkedWriter {
        written: Vec<u8>,
        interrupted: bool,
    }

    impl Write for ChunkedWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(io::Error::from(ErrorKind::Interrupted));
            }
            let n = buf.len().min(2);
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct ClosedWriter;

    impl Write for ClosedWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
