//! Typed payloads and the `(ModuleId, MessageId)` codec registry.
//!
//! Each module payload implements [`PayloadCodec`]; the registry below is the
//! single place that decides which module speaks which modes. Control
//! messages carry either nothing (sync request, acknowledgements) or a
//! [`SyncData`] (sync response), regardless of the module they address.

mod camera;
mod check;
mod depth_meter;
mod gnss;
mod imu;
mod lidar;

use std::fmt;

use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};
use crate::ids::{MessageId, ModuleId};
use crate::wire::expect_len;

pub use camera::{CameraData, ImageChunk, Orientation};
pub use check::CheckData;
pub use depth_meter::DepthMeterData;
pub use gnss::{GnssData, GnssPosition, GnssVelocity};
pub use imu::ImuData;
pub use lidar::{LidarData, LidarPoint, LIDAR_POINTS};

/// Encode/decode routine for one module payload type.
pub trait PayloadCodec: Sized {
    /// Module that owns this payload type.
    const MODULE: ModuleId;

    /// Append the wire encoding of `self` for `mode` to `dst`.
    fn pack(&self, mode: MessageId, dst: &mut BytesMut) -> Result<()>;

    /// Decode a payload previously written by [`PayloadCodec::pack`].
    fn unpack(src: &[u8], mode: MessageId) -> Result<Self>;

    /// Error for a mode this payload type does not speak.
    fn unsupported(mode: MessageId) -> FrameError {
        FrameError::UnknownMode {
            module: Self::MODULE.as_u8(),
            msg_id: mode.as_u8(),
        }
    }
}

/// Time origin carried by a `SyncResponse`, in whole seconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncData(pub u32);

impl SyncData {
    pub const SIZE: usize = 4;

    pub fn pack(&self, dst: &mut BytesMut) {
        dst.put_u32_le(self.0);
    }

    pub fn unpack(src: &[u8]) -> Result<Self> {
        expect_len(src, Self::SIZE)?;
        Ok(Self(u32::from_le_bytes([src[0], src[1], src[2], src[3]])))
    }

    /// The origin as Unix epoch milliseconds.
    pub fn as_millis(&self) -> u64 {
        u64::from(self.0) * 1000
    }
}

/// Payload of a decoded or to-be-encoded message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Payload {
    /// Sync requests and acknowledgements carry no payload.
    #[default]
    Empty,
    DepthMeter(DepthMeterData),
    Lidar(LidarData),
    Imu(ImuData),
    Gnss(GnssData),
    Camera(CameraData),
    Check(CheckData),
    Sync(SyncData),
}

impl Payload {
    /// Short variant name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Empty => "empty",
            Payload::DepthMeter(_) => "depth_meter",
            Payload::Lidar(_) => "lidar",
            Payload::Imu(_) => "imu",
            Payload::Gnss(_) => "gnss",
            Payload::Camera(_) => "camera",
            Payload::Check(_) => "check",
            Payload::Sync(_) => "sync",
        }
    }

    /// The image chunk, if this is a chunked camera payload.
    pub fn image_chunk(&self) -> Option<&ImageChunk> {
        match self {
            Payload::Camera(CameraData::Image(chunk)) => Some(chunk),
            _ => None,
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Empty => f.write_str("{}"),
            Payload::DepthMeter(d) => write!(f, "{d:?}"),
            Payload::Lidar(d) => write!(f, "{d:?}"),
            Payload::Imu(d) => write!(f, "{d:?}"),
            Payload::Gnss(d) => write!(f, "{d:?}"),
            Payload::Camera(d) => write!(f, "{d}"),
            Payload::Check(d) => write!(f, "{d:?}"),
            Payload::Sync(d) => write!(f, "{d:?}"),
        }
    }
}

type UnpackFn = fn(&[u8], MessageId) -> Result<Payload>;

struct CodecEntry {
    module: ModuleId,
    modes: &'static [MessageId],
    unpack: UnpackFn,
}

const WRITING_A: &[MessageId] = &[MessageId::WritingModeA];
const WRITING_AB: &[MessageId] = &[MessageId::WritingModeA, MessageId::WritingModeB];
const WRITING_ABC: &[MessageId] = &[
    MessageId::WritingModeA,
    MessageId::WritingModeB,
    MessageId::WritingModeC,
];

static REGISTRY: &[CodecEntry] = &[
    CodecEntry {
        module: ModuleId::DepthMeter,
        modes: WRITING_A,
        unpack: unpack_depth_meter,
    },
    CodecEntry {
        module: ModuleId::Lidar,
        modes: WRITING_A,
        unpack: unpack_lidar,
    },
    CodecEntry {
        module: ModuleId::Imu,
        modes: WRITING_ABC,
        unpack: unpack_imu,
    },
    CodecEntry {
        module: ModuleId::Gnss,
        modes: WRITING_ABC,
        unpack: unpack_gnss,
    },
    CodecEntry {
        module: ModuleId::Camera,
        modes: WRITING_AB,
        unpack: unpack_camera,
    },
    CodecEntry {
        module: ModuleId::Check,
        modes: WRITING_A,
        unpack: unpack_check,
    },
];

fn unpack_depth_meter(src: &[u8], mode: MessageId) -> Result<Payload> {
    DepthMeterData::unpack(src, mode).map(Payload::DepthMeter)
}

fn unpack_lidar(src: &[u8], mode: MessageId) -> Result<Payload> {
    LidarData::unpack(src, mode).map(Payload::Lidar)
}

fn unpack_imu(src: &[u8], mode: MessageId) -> Result<Payload> {
    ImuData::unpack(src, mode).map(Payload::Imu)
}

fn unpack_gnss(src: &[u8], mode: MessageId) -> Result<Payload> {
    GnssData::unpack(src, mode).map(Payload::Gnss)
}

fn unpack_camera(src: &[u8], mode: MessageId) -> Result<Payload> {
    CameraData::unpack(src, mode).map(Payload::Camera)
}

fn unpack_check(src: &[u8], mode: MessageId) -> Result<Payload> {
    CheckData::unpack(src, mode).map(Payload::Check)
}

fn lookup(module: ModuleId, msg_id: MessageId) -> Result<&'static CodecEntry> {
    let entry = REGISTRY
        .iter()
        .find(|entry| entry.module == module)
        .ok_or(FrameError::UnknownModule(module.as_u8()))?;
    if !entry.modes.contains(&msg_id) {
        return Err(FrameError::UnknownMode {
            module: module.as_u8(),
            msg_id: msg_id.as_u8(),
        });
    }
    Ok(entry)
}

/// Returns true if `(module, msg_id)` has a registered codec.
pub fn is_registered(module: ModuleId, msg_id: MessageId) -> bool {
    msg_id.is_control() || lookup(module, msg_id).is_ok()
}

/// Returns true for the `(module, mode)` pairs that travel as chunked transfers.
pub fn is_chunked(module: ModuleId, msg_id: MessageId) -> bool {
    module == ModuleId::Camera && msg_id == MessageId::WritingModeB
}

/// Decode a payload by `(module, msg_id)`.
pub fn unpack_payload(module: ModuleId, msg_id: MessageId, src: &[u8]) -> Result<Payload> {
    match msg_id {
        MessageId::SyncRequest | MessageId::AckOk | MessageId::AckFail => {
            expect_len(src, 0)?;
            Ok(Payload::Empty)
        }
        MessageId::SyncResponse => SyncData::unpack(src).map(Payload::Sync),
        _ => (lookup(module, msg_id)?.unpack)(src, msg_id),
    }
}

/// Encode `payload` for `(module, msg_id)`, appending to `dst`.
pub fn pack_payload(
    module: ModuleId,
    msg_id: MessageId,
    payload: &Payload,
    dst: &mut BytesMut,
) -> Result<()> {
    let mismatch = || FrameError::PayloadMismatch {
        module: module.as_u8(),
        msg_id: msg_id.as_u8(),
    };

    match msg_id {
        MessageId::SyncRequest | MessageId::AckOk | MessageId::AckFail => {
            return match payload {
                Payload::Empty => Ok(()),
                _ => Err(mismatch()),
            };
        }
        MessageId::SyncResponse => {
            return match payload {
                Payload::Sync(data) => {
                    data.pack(dst);
                    Ok(())
                }
                _ => Err(mismatch()),
            };
        }
        _ => {}
    }

    lookup(module, msg_id)?;
    match (module, payload) {
        (ModuleId::DepthMeter, Payload::DepthMeter(d)) => d.pack(msg_id, dst),
        (ModuleId::Lidar, Payload::Lidar(d)) => d.pack(msg_id, dst),
        (ModuleId::Imu, Payload::Imu(d)) => d.pack(msg_id, dst),
        (ModuleId::Gnss, Payload::Gnss(d)) => d.pack(msg_id, dst),
        (ModuleId::Camera, Payload::Camera(d)) => d.pack(msg_id, dst),
        (ModuleId::Check, Payload::Check(d)) => d.pack(msg_id, dst),
        _ => Err(mismatch()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_rejects_unknown_mode() {
        let result = unpack_payload(ModuleId::DepthMeter, MessageId::WritingModeB, &[0; 12]);
        assert!(matches!(
            result,
            Err(FrameError::UnknownMode {
                module: 0x71,
                msg_id: 0x15
            })
        ));
    }

    #[test]
    fn test_registry_rejects_unregistered_module() {
        let result = unpack_payload(ModuleId::Navigation, MessageId::WritingModeA, &[]);
        assert!(matches!(result, Err(FrameError::UnknownModule(0x61))));
        assert!(!is_registered(ModuleId::Registrar, MessageId::ReadingModeA));
    }

    #[test]
    fn test_control_messages_for_any_module() {
        assert!(is_registered(ModuleId::Navigation, MessageId::AckOk));
        assert_eq!(
            unpack_payload(ModuleId::Lidar, MessageId::SyncRequest, &[]).unwrap(),
            Payload::Empty
        );
        assert_eq!(
            unpack_payload(ModuleId::Camera, MessageId::SyncResponse, &[0x10, 0, 0, 0]).unwrap(),
            Payload::Sync(SyncData(16))
        );
        assert!(matches!(
            unpack_payload(ModuleId::Check, MessageId::AckOk, &[1]),
            Err(FrameError::PayloadLength { .. })
        ));
    }

    #[test]
    fn test_pack_rejects_mismatched_payload() {
        let mut buf = BytesMut::new();
        let result = pack_payload(
            ModuleId::Lidar,
            MessageId::WritingModeA,
            &Payload::Check(CheckData { value: 1 }),
            &mut buf,
        );
        assert!(matches!(result, Err(FrameError::PayloadMismatch { .. })));

        let result = pack_payload(
            ModuleId::Check,
            MessageId::AckOk,
            &Payload::Check(CheckData { value: 1 }),
            &mut buf,
        );
        assert!(matches!(result, Err(FrameError::PayloadMismatch { .. })));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_chunked_pairs() {
        assert!(is_chunked(ModuleId::Camera, MessageId::WritingModeB));
        assert!(!is_chunked(ModuleId::Camera, MessageId::WritingModeA));
        assert!(!is_chunked(ModuleId::Lidar, MessageId::WritingModeB));
    }

    #[test]
    fn test_sync_data_millis() {
        assert_eq!(SyncData(1_700_000_000).as_millis(), 1_700_000_000_000);
    }
}
