//! Time-origin negotiation between a module (client) and the controller (server).
//!
//! Client states: idle, awaiting a response (retried with a fixed delay), then
//! either synced to the controller's origin or falling back to a local one.

use std::io::{Read, Write};
use std::thread;
use std::time::Duration;

use asvlink_frame::{FrameWriter, Message, MessageId, ModuleId, Payload, SyncData, TimeOrigin};
use tracing::{debug, info, trace, warn};

use crate::error::{CommError, Result};
use crate::link::Link;
use crate::retry::RetryPolicy;

/// Environment variable holding a fallback origin in Unix seconds.
pub const START_STAMP_ENV: &str = "START_STAMP";

/// Round trips attempted before the client gives up.
pub const DEFAULT_SYNC_ATTEMPTS: usize = 10;

/// Pause between failed round trips.
pub const DEFAULT_SYNC_DELAY: Duration = Duration::from_millis(500);

/// Server pause before replying, giving the client time to start reading.
pub const DEFAULT_REPLY_DELAY: Duration = Duration::from_secs(1);

/// Where the client's origin came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncSource {
    /// Agreed with the controller.
    Remote,
    /// Taken from the `START_STAMP` override.
    EnvOverride,
    /// Process start time, left as it was.
    ProcessStart,
}

/// Negotiates the shared time origin over `T`.
///
/// `T` is a [`Link`] on the client side and the controller's [`FrameWriter`]
/// on the server side.
pub struct Syncer<T> {
    module: ModuleId,
    transport: Option<T>,
    retry: RetryPolicy,
    reply_delay: Duration,
    epoch_override: Option<u32>,
}

impl<T> Syncer<T> {
    pub fn new(module: ModuleId, transport: Option<T>) -> Self {
        Self {
            module,
            transport,
            retry: RetryPolicy::new(DEFAULT_SYNC_ATTEMPTS, DEFAULT_SYNC_DELAY),
            reply_delay: DEFAULT_REPLY_DELAY,
            epoch_override: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = delay;
        self
    }

    /// Fallback origin in Unix seconds, used when the line is absent or the
    /// handshake fails.
    pub fn with_epoch_override(mut self, secs: Option<u32>) -> Self {
        self.epoch_override = secs;
        self
    }

    pub fn transport_mut(&mut self) -> Option<&mut T> {
        self.transport.as_mut()
    }

    pub fn into_transport(self) -> Option<T> {
        self.transport
    }

    fn fall_back(&self, origin: &mut TimeOrigin) -> SyncSource {
        match self.epoch_override {
            Some(secs) => {
                origin.set_origin(u64::from(secs) * 1000);
                info!(start_stamp = secs, "time synced from {START_STAMP_ENV}");
                SyncSource::EnvOverride
            }
            None => {
                info!(
                    start_stamp = origin.get_origin() / 1000,
                    "time synced from process start"
                );
                SyncSource::ProcessStart
            }
        }
    }
}

impl<R: Read, W: Write> Syncer<Link<R, W>> {
    /// Module side: agree on the controller's origin.
    ///
    /// Without a line, applies the override or keeps the process start and
    /// never touches the network. With a line, a failed handshake still
    /// applies the fallback origin, then reports [`CommError::SyncTimeout`].
    pub fn sync(&mut self, origin: &mut TimeOrigin) -> Result<SyncSource> {
        let module = self.module;
        let Some(link) = self.transport.as_mut() else {
            return Ok(self.fall_back(origin));
        };

        let outcome = self.retry.run("sync", |attempt| {
            link.writer.send_control(module, MessageId::SyncRequest)?;
            let resp = link.recv()?;
            if resp.msg_id != MessageId::SyncResponse {
                return Err(CommError::UnexpectedMessage(resp.msg_id));
            }
            match resp.payload {
                Payload::Sync(data) => {
                    debug!(attempt, "sync response received");
                    Ok(data)
                }
                _ => Err(CommError::UnexpectedMessage(resp.msg_id)),
            }
        });

        match outcome {
            Ok(data) => {
                origin.set_origin(data.as_millis());
                info!(start_stamp = data.0, "time synced from remote");
                Ok(SyncSource::Remote)
            }
            Err(err) => {
                let attempts = match &err {
                    CommError::RetriesExhausted { attempts, .. } => *attempts,
                    _ => self.retry.attempts(),
                };
                warn!(error = %err, "time sync failed, using local origin");
                self.fall_back(origin);
                Err(CommError::SyncTimeout { attempts })
            }
        }
    }
}

impl<W: Write> Syncer<FrameWriter<W>> {
    /// Controller side: answer one sync request with our own origin.
    ///
    /// Anything but a `SyncRequest` is rejected without a reply.
    pub fn process_sync_request(&mut self, req: &Message) -> Result<Message> {
        let (module, delay) = (self.module, self.reply_delay);
        let Some(writer) = self.transport.as_mut() else {
            return Err(CommError::Config("sync server has no line".to_string()));
        };
        answer(module, delay, req, writer)
    }
}

impl<T> Syncer<T> {
    /// Controller side, on a line owned by someone else (the receiver of the
    /// same module).
    pub fn respond<W: Write>(&self, req: &Message, writer: &mut FrameWriter<W>) -> Result<Message> {
        answer(self.module, self.reply_delay, req, writer)
    }
}

fn answer<W: Write>(
    module: ModuleId,
    reply_delay: Duration,
    req: &Message,
    writer: &mut FrameWriter<W>,
) -> Result<Message> {
    if req.msg_id != MessageId::SyncRequest {
        return Err(CommError::UnexpectedMessage(req.msg_id));
    }

    let mut resp = Message::new(
        module,
        MessageId::SyncResponse,
        Payload::Sync(SyncData(writer.origin().origin_secs())),
    );

    if !reply_delay.is_zero() {
        thread::sleep(reply_delay);
    }
    trace!("writing sync response");
    writer.send(&mut resp)?;
    info!(%resp, "sent sync response");
    Ok(resp)
}
