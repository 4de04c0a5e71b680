//! Multi-module receive orchestrator.
//!
//! One worker thread per module line. Workers share nothing but the shutdown
//! flag, the completion channel and the time origin. Shutdown is cooperative:
//! the flag is checked between `receive()` calls, so a worker blocked on a
//! silent line notices it only once its read times out. Keep the line read
//! timeout short to bound shutdown latency.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use asvlink_frame::payload::is_chunked;
use asvlink_frame::{Message, MessageId, ModuleId, OriginHandle};
use asvlink_transport::LinkStream;
use tracing::{debug, error, info, info_span, warn};

use crate::config::{ControllerConfig, LinkConfig};
use crate::error::{CommError, Result};
use crate::link::Link;
use crate::receiver::Receiver;
use crate::syncer::{Syncer, DEFAULT_REPLY_DELAY};

/// Destination for reassembled camera images.
pub trait ImageSink: Send + Sync {
    fn store(&self, system_time: u32, image: &[u8]) -> io::Result<()>;
}

/// Writes each image to `<dir>/camera_<system_time>.jpeg`.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, system_time: u32) -> PathBuf {
        self.dir.join(format!("camera_{system_time}.jpeg"))
    }
}

impl ImageSink for DirectorySink {
    fn store(&self, system_time: u32, image: &[u8]) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(system_time);
        std::fs::write(&path, image)?;
        info!(path = %path.display(), len = image.len(), "image stored");
        Ok(())
    }
}

/// What one worker did before it stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub name: String,
    pub messages: usize,
    pub images: usize,
    pub syncs: usize,
    pub errors: usize,
    /// The line closed under the worker.
    pub disconnected: bool,
}

struct Worker<R, W> {
    name: String,
    receiver: Receiver<R, W>,
}

/// Runs one receive loop per module until shutdown.
pub struct Controller<R, W> {
    workers: Vec<Worker<R, W>>,
    sink: Arc<dyn ImageSink>,
    shutdown: Arc<AtomicBool>,
    reply_delay: Duration,
    /// Module id on every ack and sync response this controller sends.
    responder: ModuleId,
}

impl<R, W> Controller<R, W>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    pub fn new(sink: Arc<dyn ImageSink>) -> Self {
        Self {
            workers: Vec::new(),
            sink,
            shutdown: Arc::new(AtomicBool::new(false)),
            reply_delay: DEFAULT_REPLY_DELAY,
            responder: ModuleId::Control,
        }
    }

    /// Answer as `responder` instead of [`ModuleId::Control`].
    ///
    /// The registrar runs the same loop under [`ModuleId::Registrar`].
    /// Applies to lines added with [`Controller::add_link`] afterwards and
    /// to every sync response.
    pub fn with_responder(mut self, responder: ModuleId) -> Self {
        self.responder = responder;
        self
    }

    pub fn responder(&self) -> ModuleId {
        self.responder
    }

    /// Use an externally owned shutdown flag (e.g. one set from a signal handler).
    pub fn with_shutdown(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Delay before each sync response.
    pub fn with_reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = delay;
        self
    }

    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn add_module(&mut self, name: impl Into<String>, receiver: Receiver<R, W>) {
        self.workers.push(Worker {
            name: name.into(),
            receiver,
        });
    }

    /// Add a line, acknowledging as this controller's responder.
    pub fn add_link(&mut self, name: impl Into<String>, link: Link<R, W>, listener: &LinkConfig) {
        let receiver = Receiver::from_link(self.responder, link)
            .with_ack(listener.ack)
            .with_retry(listener.retry());
        self.add_module(name, receiver);
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Start every worker and block until all of them have reported back.
    pub fn run(self) -> Vec<WorkerReport> {
        let expected = self.workers.len();
        let (done_tx, done_rx) = mpsc::channel();
        info!(modules = expected, responder = %self.responder, "controller started");

        for worker in self.workers {
            let done_tx = done_tx.clone();
            let shutdown = Arc::clone(&self.shutdown);
            let sink = Arc::clone(&self.sink);
            let syncer: Syncer<()> =
                Syncer::new(self.responder, None).with_reply_delay(self.reply_delay);
            thread::spawn(move || {
                let span = info_span!("worker", module = %worker.name);
                let _entered = span.enter();
                let report = worker.run(&shutdown, &syncer, sink.as_ref());
                // The receiving end only goes away if `run` itself is gone.
                let _ = done_tx.send(report);
            });
        }
        drop(done_tx);

        let mut reports = Vec::with_capacity(expected);
        while reports.len() < expected {
            match done_rx.recv() {
                Ok(report) => {
                    debug!(module = %report.name, "worker finished");
                    reports.push(report);
                }
                Err(_) => {
                    error!("worker exited without reporting");
                    break;
                }
            }
        }
        info!(modules = reports.len(), "controller stopped");
        reports
    }
}

impl Controller<LinkStream, LinkStream> {
    /// Open a line per enabled module in `config`, answering as `responder`
    /// ([`ModuleId::Control`] or [`ModuleId::Registrar`]).
    ///
    /// Failing to open any line is fatal; nothing is started.
    pub fn from_config(
        config: &ControllerConfig,
        responder: ModuleId,
        origin: OriginHandle,
        sink: Arc<dyn ImageSink>,
    ) -> Result<Self> {
        let mut controller = Self::new(sink).with_responder(responder);
        for (module, listener) in config.enabled_modules()? {
            let link = Link::open(&listener.serial(), origin.clone())?;
            info!(%module, port = %listener.port, "module line opened");
            controller.add_link(module.name(), link, listener);
        }
        Ok(controller)
    }
}

impl<R: Read, W: Write> Worker<R, W> {
    fn run(self, shutdown: &AtomicBool, syncer: &Syncer<()>, sink: &dyn ImageSink) -> WorkerReport {
        let Worker { name, mut receiver } = self;
        let mut report = WorkerReport {
            name,
            ..WorkerReport::default()
        };

        while !shutdown.load(Ordering::Acquire) {
            let msg = match receiver.receive() {
                Ok(msg) => msg,
                Err(err) if err.is_disconnected() => {
                    warn!(error = %err, "line closed");
                    report.disconnected = true;
                    break;
                }
                Err(err) if err.is_timeout() => {
                    debug!("no traffic");
                    continue;
                }
                Err(err) => {
                    warn!(error = %err, "receive failed");
                    report.errors += 1;
                    continue;
                }
            };

            report.messages += 1;
            info!(%msg, "message received");
            if let Err(err) = handle(&msg, &mut receiver, syncer, sink, &mut report) {
                warn!(error = %err, "message handling failed");
                report.errors += 1;
            }
        }

        receiver.close();
        report
    }
}

fn handle<R: Read, W: Write>(
    msg: &Message,
    receiver: &mut Receiver<R, W>,
    syncer: &Syncer<()>,
    sink: &dyn ImageSink,
    report: &mut WorkerReport,
) -> Result<()> {
    if msg.msg_id == MessageId::SyncRequest {
        syncer.respond(msg, receiver.writer_mut())?;
        report.syncs += 1;
        return Ok(());
    }

    if is_chunked(msg.module, msg.msg_id) {
        if let Some(chunk) = msg.payload.image_chunk() {
            sink.store(msg.system_time, &chunk.raw_bytes)
                .map_err(CommError::Storage)?;
            report.images += 1;
        }
    }
    Ok(())
}
