use std::io::{ErrorKind, Read};

use asvlink_transport::LinkStream;
use bytes::{Bytes, BytesMut};

use crate::codec::{
    checksum, decode_message, FrameConfig, Message, CHECKSUM_SIZE, HEADER_SIZE,
    PAYLOAD_SIZE_OFFSET, SYNC_PATTERN,
};
use crate::error::{FrameError, Result};

/// Extracts frames from a noisy byte stream.
///
/// Scans for the sync pattern one byte at a time, then reads the service
/// fields and exactly `payload_size + 1` more bytes. Short reads are retried
/// until the requested length is satisfied.
///
/// Noise can contain the sync pattern too. When a candidate frame fails its
/// checksum and a later sync pattern sits inside the bytes already read, the
/// reader pushes those bytes back and scans again from there, so a real frame
/// hidden behind a false start is not lost. A corrupt candidate with no
/// embedded sync pattern is returned as-is for the decoder to reject.
pub struct FrameReader<T> {
    inner: T,
    pending: BytesMut,
    config: FrameConfig,
}

enum Candidate {
    Frame(Bytes),
    Rescan { skipped: usize },
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            pending: BytesMut::new(),
            config,
        }
    }

    /// Read the raw bytes of the next frame (blocking), still undecoded.
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached and
    /// `Err(FrameError::FrameNotFound)` once the resync budget is spent.
    pub fn read_frame(&mut self) -> Result<Bytes> {
        let mut window = BytesMut::with_capacity(SYNC_PATTERN.len());
        self.fill(&mut window, SYNC_PATTERN.len())?;

        let mut shifts = 0usize;
        loop {
            if window[..] == SYNC_PATTERN {
                match self.read_candidate(&window)? {
                    Candidate::Frame(frame) => {
                        if shifts > 0 {
                            tracing::debug!(shifts, "resynchronized on sync pattern");
                        }
                        return Ok(frame);
                    }
                    Candidate::Rescan { skipped } => {
                        shifts += skipped;
                        if shifts > self.config.resync_budget {
                            return Err(FrameError::FrameNotFound { shifts });
                        }
                        window.clear();
                        self.fill(&mut window, SYNC_PATTERN.len())?;
                        continue;
                    }
                }
            }

            if shifts >= self.config.resync_budget {
                return Err(FrameError::FrameNotFound { shifts });
            }
            let next = self.read_byte()?;
            window[0] = window[1];
            window[1] = next;
            shifts += 1;
        }
    }

    /// Read and decode the next frame.
    pub fn read_message(&mut self) -> Result<Message> {
        let frame = self.read_frame()?;
        decode_message(&frame)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    ///
    /// Bytes read ahead during a rescan are dropped.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    fn read_candidate(&mut self, sync: &[u8]) -> Result<Candidate> {
        let mut frame = BytesMut::with_capacity(HEADER_SIZE + CHECKSUM_SIZE);
        frame.extend_from_slice(sync);

        if let Err(err) = self.fill(&mut frame, HEADER_SIZE - SYNC_PATTERN.len()) {
            return self.rescan_partial(frame, err);
        }
        let payload_size = usize::from(frame[PAYLOAD_SIZE_OFFSET]);
        if let Err(err) = self.fill(&mut frame, payload_size + CHECKSUM_SIZE) {
            return self.rescan_partial(frame, err);
        }

        let body_end = frame.len() - CHECKSUM_SIZE;
        if checksum(&frame[SYNC_PATTERN.len()..body_end]) == frame[body_end] {
            return Ok(Candidate::Frame(frame.freeze()));
        }

        match find_sync(&frame[1..]) {
            Some(pos) => {
                let skipped = 1 + pos;
                tracing::debug!(skipped, "false sync pattern, rescanning candidate bytes");
                self.push_back(&frame[skipped..]);
                Ok(Candidate::Rescan { skipped })
            }
            None => Ok(Candidate::Frame(frame.freeze())),
        }
    }

    /// The stream stalled or closed mid-candidate: salvage any later sync
    /// pattern among the bytes read so far, otherwise surface the error.
    fn rescan_partial(&mut self, frame: BytesMut, err: FrameError) -> Result<Candidate> {
        match find_sync(&frame[1..]) {
            Some(pos) => {
                let skipped = 1 + pos;
                self.push_back(&frame[skipped..]);
                Ok(Candidate::Rescan { skipped })
            }
            None => Err(err),
        }
    }

    fn push_back(&mut self, bytes: &[u8]) {
        let mut pending = BytesMut::with_capacity(bytes.len() + self.pending.len());
        pending.extend_from_slice(bytes);
        pending.extend_from_slice(&self.pending);
        self.pending = pending;
    }

    fn read_byte(&mut self) -> Result<u8> {
        let mut byte = BytesMut::with_capacity(1);
        self.fill(&mut byte, 1)?;
        Ok(byte[0])
    }

    /// Append exactly `count` bytes to `dst`, pushed-back bytes first.
    ///
    /// On error `dst` keeps whatever arrived before the failure.
    fn fill(&mut self, dst: &mut BytesMut, count: usize) -> Result<()> {
        let from_pending = count.min(self.pending.len());
        if from_pending > 0 {
            dst.extend_from_slice(&self.pending.split_to(from_pending));
        }

        let mut remaining = count - from_pending;
        let mut chunk = [0u8; 256];
        while remaining > 0 {
            let want = remaining.min(chunk.len());
            let read = match self.inner.read(&mut chunk[..want]) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            dst.extend_from_slice(&chunk[..read]);
            remaining -= read;
        }
        Ok(())
    }
}

impl FrameReader<LinkStream> {
    /// Create a frame reader for a serial line and apply the read timeout from config.
    pub fn with_config_link(mut inner: LinkStream, config: FrameConfig) -> Result<Self> {
        if let Some(timeout) = config.read_timeout {
            inner
                .set_read_timeout(timeout)
                .map_err(|err| FrameError::Io(std::io::Error::other(err.to_string())))?;
        }
        Ok(Self::with_config(inner, config))
    }
}

fn find_sync(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(SYNC_PATTERN.len())
        .position(|window| window == SYNC_PATTERN)
}
