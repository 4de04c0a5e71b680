//! Checksummed binary framing for the onboard link layer.
//!
//! Every frame on a serial line looks like:
//! - A 2-byte sync pattern (`0xFA 0xFA`) used to resynchronize after noise
//! - A reserved byte, the module id and the message id
//! - A 4-byte little-endian system time relative to the shared time origin
//! - A 1-byte payload size, the payload, and a CRC-8/SMBus trailer
//!
//! Payloads are typed per module and narrowed by message mode; see
//! [`payload`] for the codec registry.

pub mod clock;
pub mod codec;
pub mod error;
pub mod ids;
pub mod payload;
pub mod reader;
pub mod wire;
pub mod writer;

pub use clock::{unix_millis_now, OriginHandle, TimeOrigin};
pub use codec::{
    checksum, decode_message, encode_message, FrameConfig, Message, CHECKSUM_SIZE,
    DEFAULT_RESYNC_BUDGET, HEADER_SIZE, MAX_PAYLOAD, MIN_FRAME_SIZE, RESERVED_BYTE, SYNC_PATTERN,
};
pub use error::{FrameError, Result};
pub use ids::{MessageId, ModuleId};
pub use payload::{
    CameraData, CheckData, DepthMeterData, GnssData, GnssPosition, GnssVelocity, ImageChunk,
    ImuData, LidarData, LidarPoint, Orientation, Payload, PayloadCodec, SyncData,
    LIDAR_POINTS,
};
pub use reader::FrameReader;
pub use wire::U24;
pub use writer::FrameWriter;
