//! Point-to-point serial transport for the onboard link layer.
//!
//! Every module talks to the controller over its own serial line. This is the
//! lowest layer of asvlink: it opens a line from a [`SerialConfig`] and hands
//! out a [`LinkStream`] implementing `Read + Write`. Everything else builds on
//! top of it (or on any other `Read + Write` stream, which is how the tests
//! drive the upper layers).

pub mod error;
pub mod serial;
pub mod stream;

pub use error::{Result, TransportError};
pub use serial::{SerialConfig, DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT};
pub use stream::LinkStream;
