//! Reliable messaging on top of the frame layer.
//!
//! A module runs a [`Syncer`] client once to agree on the time origin, then a
//! [`Sender`] loop that pushes measurements and waits for acknowledgements.
//! The controller runs one [`Receiver`] per module line, answers inline sync
//! requests with a server-side [`Syncer`], and reassembles chunked images.

pub mod config;
pub mod controller;
pub mod error;
pub mod link;
pub mod receiver;
pub mod retry;
pub mod sender;
pub mod source;
pub mod syncer;

pub use config::{
    parse_duration, ControllerConfig, LinkConfig, ModuleConnectionConfig, DEFAULT_CHUNK_SIZE,
    DEFAULT_RETRIES_LIMIT,
};
pub use controller::{Controller, DirectorySink, ImageSink, WorkerReport};
pub use error::{CommError, Result};
pub use link::Link;
pub use receiver::Receiver;
pub use retry::RetryPolicy;
pub use sender::Sender;
pub use source::{MeasureError, MeasurementSource};
pub use syncer::{SyncSource, Syncer, DEFAULT_REPLY_DELAY, START_STAMP_ENV};
