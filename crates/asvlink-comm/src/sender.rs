use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use asvlink_frame::payload::is_chunked;
use asvlink_frame::{
    encode_message, CameraData, FrameError, ImageChunk, Message, MessageId, ModuleId,
    OriginHandle, Payload, MAX_PAYLOAD,
};
use bytes::{Bytes, BytesMut};
use tracing::{debug, error, info, warn};

use crate::config::DEFAULT_CHUNK_SIZE;
use crate::error::{CommError, Result};
use crate::link::Link;
use crate::retry::RetryPolicy;
use crate::source::{MeasureError, MeasurementSource};

/// Attempts per frame (write plus optional ack wait) before giving up on it.
pub const DEFAULT_SEND_ATTEMPTS: usize = 2;

/// Largest raw slice that still fits one frame next to the chunk counters.
pub const MAX_CHUNK_SIZE: usize = MAX_PAYLOAD - ImageChunk::HEADER_SIZE;

/// Pushes measurements from one module to the controller.
///
/// Without a link the sender runs dry: messages are encoded and logged but
/// nothing is written.
pub struct Sender<R, W> {
    module: ModuleId,
    mode: MessageId,
    link: Option<Link<R, W>>,
    origin: OriginHandle,
    ack: bool,
    retry: RetryPolicy,
    chunk_size: usize,
    throttle: Duration,
}

impl<R: Read, W: Write> Sender<R, W> {
    pub fn new(module: ModuleId, mode: MessageId, origin: OriginHandle) -> Self {
        Self {
            module,
            mode,
            link: None,
            origin,
            ack: true,
            retry: RetryPolicy::new(DEFAULT_SEND_ATTEMPTS, Duration::ZERO),
            chunk_size: DEFAULT_CHUNK_SIZE,
            throttle: Duration::ZERO,
        }
    }

    /// Attach the line to the controller.
    pub fn with_link(mut self, link: Link<R, W>) -> Self {
        self.link = Some(link);
        self
    }

    /// Wait for Ack-OK after every frame.
    pub fn with_ack(mut self, ack: bool) -> Self {
        self.ack = ack;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Raw image bytes per chunk, clamped to what fits in one frame.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.clamp(1, MAX_CHUNK_SIZE);
        self
    }

    /// Pause after every successful send.
    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.link.is_none()
    }

    pub fn link_mut(&mut self) -> Option<&mut Link<R, W>> {
        self.link.as_mut()
    }

    pub fn into_link(self) -> Option<Link<R, W>> {
        self.link
    }

    /// Pull measurements from `source` and send them until `shutdown` is set
    /// or the source is exhausted.
    ///
    /// Failed measurements and failed sends are logged and skipped; one lost
    /// frame never stops the loop. Returns the number of payloads delivered.
    pub fn run(
        &mut self,
        source: &mut dyn MeasurementSource,
        shutdown: &AtomicBool,
    ) -> Result<usize> {
        info!(module = %self.module, mode = %self.mode, dry_run = self.is_dry_run(), "sender started");
        let mut delivered = 0usize;

        while !shutdown.load(Ordering::Relaxed) {
            let payload = match source.measure() {
                Ok(payload) => payload,
                Err(MeasureError::Exhausted) => {
                    debug!("measurement source exhausted");
                    break;
                }
                Err(err) => {
                    error!(error = %err, "cannot read measurement");
                    continue;
                }
            };

            match self.send(payload) {
                Ok(()) => delivered += 1,
                Err(err) => error!(error = %err, "cannot transmit measurement"),
            }
        }

        info!(delivered, "sender stopped");
        source
            .close()
            .map_err(|err| CommError::Measurement(err.to_string()))?;
        Ok(delivered)
    }

    /// Send one payload, splitting chunk-eligible images into several frames.
    ///
    /// A chunked transfer is abandoned at the first chunk that exhausts its
    /// retries; later chunks are not sent.
    pub fn send(&mut self, payload: Payload) -> Result<()> {
        if is_chunked(self.module, self.mode) {
            if let Payload::Camera(CameraData::Image(image)) = &payload {
                if image.raw_bytes.len() > self.chunk_size {
                    let chunks = split_image(&image.raw_bytes, self.chunk_size)?;
                    let total = chunks.len();
                    for chunk in chunks {
                        let current = chunk.current_chunk;
                        let msg = Message::new(
                            self.module,
                            self.mode,
                            Payload::Camera(CameraData::Image(chunk)),
                        );
                        self.send_frame(msg).map_err(|err| {
                            warn!(chunk = current, total, "chunked transfer abandoned");
                            err
                        })?;
                    }
                    self.pause();
                    return Ok(());
                }
            }
        }

        self.send_frame(Message::new(self.module, self.mode, payload))?;
        self.pause();
        Ok(())
    }

    fn send_frame(&mut self, mut msg: Message) -> Result<Message> {
        let Some(link) = self.link.as_mut() else {
            msg.system_time = self.origin.system_time();
            let mut scratch = BytesMut::new();
            encode_message(&mut msg, &mut scratch)?;
            info!(%msg, "transmitting disabled, message not sent");
            return Ok(msg);
        };

        let ack = self.ack;
        self.retry.run("send", |attempt| {
            link.send(&mut msg)?;
            if ack {
                wait_ack(link)?;
            }
            debug!(attempt, "frame delivered");
            Ok(())
        })?;

        info!(%msg, "sent message");
        Ok(msg)
    }

    fn pause(&self) {
        if !self.throttle.is_zero() {
            thread::sleep(self.throttle);
        }
    }
}

/// Read until an acknowledgement arrives.
///
/// A SyncResponse here answers a sync request the syncer already gave up on
/// (the controller replies after the client timeout); it is dropped.
fn wait_ack<R: Read, W: Write>(link: &mut Link<R, W>) -> Result<()> {
    let reply = loop {
        let reply = link.reader.read_message().map_err(|err| match err {
            err if err.is_timeout() => CommError::AckTimeout,
            FrameError::FrameNotFound { .. } => CommError::AckTimeout,
            other => CommError::Frame(other),
        })?;
        if reply.msg_id != MessageId::SyncResponse {
            break reply;
        }
        debug!(%reply, "stale sync response skipped");
    };

    if reply.msg_id != MessageId::AckOk {
        return Err(CommError::AckMismatch(reply.msg_id));
    }
    debug!(%reply, "got ack");
    Ok(())
}

/// Split raw image bytes into 1-based numbered chunks of at most `chunk_size`.
pub fn split_image(raw: &[u8], chunk_size: usize) -> Result<Vec<ImageChunk>> {
    let chunk_size = chunk_size.max(1);
    let max = chunk_size * usize::from(u8::MAX);
    if raw.len() > max {
        return Err(CommError::ImageTooLarge {
            size: raw.len(),
            max,
        });
    }

    if raw.is_empty() {
        return Ok(vec![ImageChunk::single(Bytes::new())]);
    }

    let total = raw.len().div_ceil(chunk_size) as u8;
    Ok(raw
        .chunks(chunk_size)
        .enumerate()
        .map(|(i, part)| ImageChunk {
            current_chunk: (i + 1) as u8,
            total_chunks: total,
            raw_bytes: Bytes::copy_from_slice(part),
        })
        .collect())
}
