//! Onboard link layer of an unmanned surface vessel.
//!
//! Sensor modules (depth meter, lidar, IMU, GNSS, camera) talk to a central
//! controller over point-to-point serial lines using a small binary frame
//! format with CRC-8 checksums, acknowledgements, time-origin sync and
//! chunked transfer of camera images.
//!
//! # Crate Structure
//!
//! - [`transport`]: Serial line transport with reopen-on-close
//! - [`frame`]: Wire format, payload codecs and the resynchronizing reader
//! - [`comm`]: Sender, receiver, syncer and the controller orchestrator

/// Re-export transport types.
pub mod transport {
    pub use asvlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use asvlink_frame::*;
}

/// Re-export link-level messaging types.
pub mod comm {
    pub use asvlink_comm::*;
}
