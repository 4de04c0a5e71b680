use std::io::{Read, Write};

use asvlink_frame::payload::is_chunked;
use asvlink_frame::{
    decode_message, CameraData, FrameReader, FrameWriter, ImageChunk, Message, MessageId,
    ModuleId, Payload,
};
use bytes::{Bytes, BytesMut};
use tracing::{debug, trace, warn};

use crate::config::DEFAULT_RETRIES_LIMIT;
use crate::error::{CommError, Result};
use crate::link::Link;
use crate::retry::RetryPolicy;

/// Controller-side end of a module line.
///
/// Acknowledges every decoded frame except sync requests (those are answered
/// by the syncer) and reassembles chunked transfers into one message.
pub struct Receiver<R, W> {
    module: ModuleId,
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
    ack: bool,
    retry: RetryPolicy,
}

impl<R: Read, W: Write> Receiver<R, W> {
    /// `module` is the id this side puts on its acknowledgements.
    pub fn new(module: ModuleId, reader: FrameReader<R>, writer: FrameWriter<W>) -> Self {
        Self {
            module,
            reader,
            writer,
            ack: true,
            retry: RetryPolicy::new(DEFAULT_RETRIES_LIMIT, std::time::Duration::ZERO),
        }
    }

    pub fn from_link(module: ModuleId, link: Link<R, W>) -> Self {
        let (reader, writer) = link.into_parts();
        Self::new(module, reader, writer)
    }

    /// Send Ack-OK / Ack-Fail replies.
    pub fn with_ack(mut self, ack: bool) -> Self {
        self.ack = ack;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Receive the next message, reassembling chunked transfers.
    ///
    /// A reassembled message carries the first chunk's `system_time`, the
    /// joined bytes as a single complete chunk, and zero `payload_size` and
    /// `checksum`: no single frame ever carried those bytes.
    pub fn receive(&mut self) -> Result<Message> {
        let first = self.receive_frame()?;
        if !is_chunked(first.module, first.msg_id) {
            return Ok(first);
        }

        let (current, total) = match first.payload.image_chunk() {
            Some(chunk) => (chunk.current_chunk, chunk.total_chunks),
            None => return Err(CommError::UnexpectedMessage(first.msg_id)),
        };
        if current != 1 || total == 0 {
            return Err(CommError::ChunkSequence(format!(
                "transfer must start at chunk 1, got {current}/{total}"
            )));
        }
        if current == total {
            return Ok(first);
        }

        let mut image = BytesMut::with_capacity(usize::from(total) * 256);
        if let Some(chunk) = first.payload.image_chunk() {
            image.extend_from_slice(&chunk.raw_bytes);
        }

        for expected in 2..=total {
            let next = self.receive_frame()?;
            let chunk = next
                .payload
                .image_chunk()
                .filter(|_| next.module == first.module && next.msg_id == first.msg_id)
                .ok_or_else(|| {
                    CommError::ChunkSequence(format!(
                        "expected chunk {expected}/{total}, got {} {}",
                        next.module, next.msg_id
                    ))
                })?;
            if chunk.current_chunk != expected || chunk.total_chunks != total {
                return Err(CommError::ChunkSequence(format!(
                    "expected chunk {expected}/{total}, got {}/{}",
                    chunk.current_chunk, chunk.total_chunks
                )));
            }
            trace!(chunk = expected, total, len = chunk.raw_bytes.len(), "chunk received");
            image.extend_from_slice(&chunk.raw_bytes);
        }

        debug!(total, len = image.len(), "chunked transfer reassembled");
        Ok(Message {
            module: first.module,
            msg_id: first.msg_id,
            system_time: first.system_time,
            payload_size: 0,
            payload: Payload::Camera(CameraData::Image(ImageChunk {
                current_chunk: total,
                total_chunks: total,
                raw_bytes: Bytes::from(image),
            })),
            checksum: 0,
        })
    }

    /// One frame, with its acknowledgement, retried as a unit.
    fn receive_frame(&mut self) -> Result<Message> {
        let retry = self.retry;
        retry.run("receive", |attempt| {
            let raw = self.reader.read_frame()?;
            trace!(attempt, raw = ?raw.as_ref(), "raw frame");

            let msg = match decode_message(&raw) {
                Ok(msg) => msg,
                Err(err) => {
                    self.reply(MessageId::AckFail);
                    return Err(err.into());
                }
            };

            if msg.msg_id != MessageId::SyncRequest {
                self.reply(MessageId::AckOk);
            }
            Ok(msg)
        })
    }

    fn reply(&mut self, msg_id: MessageId) {
        if !self.ack {
            return;
        }
        if let Err(err) = self.writer.send_control(self.module, msg_id) {
            warn!(%msg_id, error = %err, "failed to send acknowledgement");
        }
    }

    /// Writer half, shared with the paired syncer's replies.
    pub fn writer_mut(&mut self) -> &mut FrameWriter<W> {
        &mut self.writer
    }

    /// Release the line.
    pub fn close(self) {
        debug!(module = %self.module, "receiver closed");
    }
}
