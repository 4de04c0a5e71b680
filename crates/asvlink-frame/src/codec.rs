use std::fmt;
use std::time::Duration;

use bytes::{Buf, BufMut, BytesMut};
use crc::{Crc, CRC_8_SMBUS};

use crate::error::{FrameError, Result};
use crate::ids::{MessageId, ModuleId};
use crate::payload::{pack_payload, unpack_payload, Payload};

/// Sync pattern that opens every frame.
pub const SYNC_PATTERN: [u8; 2] = [0xFA, 0xFA];

/// Value written into the reserved byte.
pub const RESERVED_BYTE: u8 = 0xFF;

/// Service fields before the payload:
/// sync (2) + reserved (1) + module (1) + msg (1) + system time (4) + size (1).
pub const HEADER_SIZE: usize = 10;

/// Trailing CRC-8 byte.
pub const CHECKSUM_SIZE: usize = 1;

/// A frame with an empty payload.
pub const MIN_FRAME_SIZE: usize = HEADER_SIZE + CHECKSUM_SIZE;

/// Largest payload the 1-byte size field can describe.
pub const MAX_PAYLOAD: usize = u8::MAX as usize;

/// Sync pattern shifts the reader tolerates before giving up.
pub const DEFAULT_RESYNC_BUDGET: usize = 1024;

pub(crate) const PAYLOAD_SIZE_OFFSET: usize = HEADER_SIZE - 1;

const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);

/// CRC-8/SMBus (poly 0x07, init 0x00, no reflection).
pub fn checksum(bytes: &[u8]) -> u8 {
    CRC8.checksum(bytes)
}

/// One protocol message.
///
/// `payload_size` and `checksum` are filled in by [`encode_message`] and
/// [`decode_message`]; callers building a message leave them at zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub module: ModuleId,
    pub msg_id: MessageId,
    /// Milliseconds since the shared time origin, stamped at encode time.
    pub system_time: u32,
    pub payload_size: u8,
    pub payload: Payload,
    pub checksum: u8,
}

impl Message {
    pub fn new(module: ModuleId, msg_id: MessageId, payload: Payload) -> Self {
        Self {
            module,
            msg_id,
            system_time: 0,
            payload_size: 0,
            payload,
            checksum: 0,
        }
    }

    /// A payload-less control message (sync request or acknowledgement).
    pub fn control(module: ModuleId, msg_id: MessageId) -> Self {
        Self::new(module, msg_id, Payload::Empty)
    }

    /// Total wire size (header + payload + checksum), valid after encode/decode.
    pub fn wire_size(&self) -> usize {
        MIN_FRAME_SIZE + usize::from(self.payload_size)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{module:{:#04X},msg:{:#04X},ts:{},size:{},payload:{},crc:{:#04X}}}",
            self.module.as_u8(),
            self.msg_id.as_u8(),
            self.system_time,
            self.payload_size,
            self.payload,
            self.checksum
        )
    }
}

/// Encode a message into the wire format.
///
/// Wire format:
/// ```text
/// ┌───────────┬──────┬────────┬─────┬──────────┬──────┬─────────┬───────┐
/// │ Sync (2B) │ Rsvd │ Module │ Msg │ Time     │ Size │ Payload │ CRC-8 │
/// │ 0xFA 0xFA │ 0xFF │ (1B)   │(1B) │ (4B LE)  │ (1B) │ (Size)  │ (1B)  │
/// └───────────┴──────┴────────┴─────┴──────────┴──────┴─────────┴───────┘
///              └────────────── covered by the CRC ──────────────┘
/// ```
///
/// Updates `msg.payload_size` and `msg.checksum` to what went on the wire.
/// `dst` is left untouched on error.
pub fn encode_message(msg: &mut Message, dst: &mut BytesMut) -> Result<()> {
    let mut payload = BytesMut::new();
    pack_payload(msg.module, msg.msg_id, &msg.payload, &mut payload)?;
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }

    let start = dst.len();
    dst.reserve(MIN_FRAME_SIZE + payload.len());
    dst.put_slice(&SYNC_PATTERN);
    dst.put_u8(RESERVED_BYTE);
    dst.put_u8(msg.module.as_u8());
    dst.put_u8(msg.msg_id.as_u8());
    dst.put_u32_le(msg.system_time);
    dst.put_u8(payload.len() as u8);
    dst.put_slice(&payload);
    let crc = checksum(&dst[start + SYNC_PATTERN.len()..]);
    dst.put_u8(crc);

    msg.payload_size = payload.len() as u8;
    msg.checksum = crc;
    Ok(())
}

/// Decode exactly one frame.
///
/// The checksum is verified before the size field is trusted, so any
/// corruption after the sync pattern reports [`FrameError::ChecksumMismatch`].
pub fn decode_message(src: &[u8]) -> Result<Message> {
    if src.len() < MIN_FRAME_SIZE {
        return Err(FrameError::Truncated { len: src.len() });
    }
    if src[..SYNC_PATTERN.len()] != SYNC_PATTERN {
        return Err(FrameError::InvalidSync);
    }

    let body_end = src.len() - CHECKSUM_SIZE;
    let received = src[body_end];
    let computed = checksum(&src[SYNC_PATTERN.len()..body_end]);
    if received != computed {
        return Err(FrameError::ChecksumMismatch { received, computed });
    }

    let mut header = &src[SYNC_PATTERN.len() + 1..HEADER_SIZE];
    let module_byte = header.get_u8();
    let msg_byte = header.get_u8();
    let system_time = header.get_u32_le();
    let payload_size = header.get_u8();

    let payload_bytes = &src[HEADER_SIZE..body_end];
    if payload_bytes.len() != usize::from(payload_size) {
        return Err(FrameError::LengthMismatch {
            declared: usize::from(payload_size),
            actual: payload_bytes.len(),
        });
    }

    let module = ModuleId::try_from(module_byte)?;
    let msg_id = MessageId::from_u8(msg_byte).ok_or(FrameError::UnknownMode {
        module: module_byte,
        msg_id: msg_byte,
    })?;
    let payload = unpack_payload(module, msg_id, payload_bytes)?;

    Ok(Message {
        module,
        msg_id,
        system_time,
        payload_size,
        payload,
        checksum: received,
    })
}

/// Configuration for frame readers.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Byte shifts allowed while hunting for a sync pattern. Default: 1024.
    pub resync_budget: usize,
    /// Read timeout applied to serial lines.
    pub read_timeout: Option<Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            resync_budget: DEFAULT_RESYNC_BUDGET,
            read_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::payload::{
        CameraData, CheckData, DepthMeterData, GnssData, ImageChunk, ImuData, LidarData,
        Orientation, SyncData,
    };
    use crate::wire::U24;

    fn depth_message() -> Message {
        let mut msg = Message::new(
            ModuleId::DepthMeter,
            MessageId::WritingModeA,
            Payload::DepthMeter(DepthMeterData {
                sensor_id: 1,
                system_time: 1000,
                distance: U24::from(1000u16),
                status: 1,
                strength: 1024,
                precision: 32,
            }),
        );
        msg.system_time = 1000;
        msg
    }

    #[test]
    fn test_crc8_smbus_check_value() {
        assert_eq!(checksum(b"123456789"), 0xF4);
        assert_eq!(checksum(&[]), 0x00);
    }

    #[test]
    fn test_depth_meter_scenario() {
        let mut msg = depth_message();
        let mut buf = BytesMut::new();
        encode_message(&mut msg, &mut buf).unwrap();

        assert_eq!(buf.len(), MIN_FRAME_SIZE + DepthMeterData::SIZE);
        assert_eq!(
            &buf[..HEADER_SIZE],
            &[0xFA, 0xFA, 0xFF, 0x71, 0x14, 0xE8, 0x03, 0x00, 0x00, 12]
        );
        let expected_crc = checksum(&buf[2..buf.len() - 1]);
        assert_eq!(buf[buf.len() - 1], expected_crc);
        assert_eq!(msg.checksum, expected_crc);
        assert_eq!(msg.payload_size, 12);

        let decoded = decode_message(&buf).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_roundtrip_every_registered_pair() {
        let mut lidar = LidarData::default();
        lidar.points[3].distance = 777;
        let imu = ImuData {
            ax: -12,
            mz: 40,
            ..Default::default()
        };
        let cases = vec![
            (ModuleId::Lidar, MessageId::WritingModeA, Payload::Lidar(lidar)),
            (ModuleId::Imu, MessageId::WritingModeA, Payload::Imu(ImuData { mz: 0, ..imu })),
            (ModuleId::Imu, MessageId::WritingModeB, Payload::Imu(imu)),
            (
                ModuleId::Imu,
                MessageId::WritingModeC,
                Payload::Imu(ImuData {
                    mz: 40,
                    ..Default::default()
                }),
            ),
            (ModuleId::Gnss, MessageId::WritingModeA, Payload::Gnss(GnssData::default())),
            (
                ModuleId::Camera,
                MessageId::WritingModeA,
                Payload::Camera(CameraData::Orientation(Orientation {
                    yaw: -1,
                    pitch: 2,
                    roll: -3,
                })),
            ),
            (
                ModuleId::Camera,
                MessageId::WritingModeB,
                Payload::Camera(CameraData::Image(ImageChunk::single(Bytes::from_static(
                    b"jpeg",
                )))),
            ),
            (
                ModuleId::Check,
                MessageId::WritingModeA,
                Payload::Check(CheckData { value: 0xDEAD_BEEF }),
            ),
            (ModuleId::Control, MessageId::SyncRequest, Payload::Empty),
            (
                ModuleId::Control,
                MessageId::SyncResponse,
                Payload::Sync(SyncData(1_700_000_000)),
            ),
            (ModuleId::Camera, MessageId::AckOk, Payload::Empty),
            (ModuleId::Lidar, MessageId::AckFail, Payload::Empty),
        ];

        for (module, msg_id, payload) in cases {
            let mut msg = Message::new(module, msg_id, payload);
            msg.system_time = 42;
            let mut buf = BytesMut::new();
            encode_message(&mut msg, &mut buf).unwrap();
            assert_eq!(buf.len(), msg.wire_size());
            let decoded = decode_message(&buf).unwrap();
            assert_eq!(decoded, msg, "{module} {msg_id}");
        }
    }

    #[test]
    fn test_every_single_bit_flip_is_a_checksum_mismatch() {
        let mut msg = depth_message();
        let mut buf = BytesMut::new();
        encode_message(&mut msg, &mut buf).unwrap();

        for byte in SYNC_PATTERN.len()..buf.len() {
            for bit in 0..8 {
                let mut corrupt = buf.to_vec();
                corrupt[byte] ^= 1 << bit;
                let err = decode_message(&corrupt).unwrap_err();
                assert!(
                    matches!(err, FrameError::ChecksumMismatch { .. }),
                    "byte {byte} bit {bit}: {err}"
                );
            }
        }
    }

    #[test]
    fn test_decode_rejects_bad_sync() {
        let mut msg = depth_message();
        let mut buf = BytesMut::new();
        encode_message(&mut msg, &mut buf).unwrap();
        buf[1] = 0x00;
        assert!(matches!(decode_message(&buf), Err(FrameError::InvalidSync)));
    }

    #[test]
    fn test_decode_truncated() {
        assert!(matches!(
            decode_message(&[0xFA, 0xFA, 0xFF]),
            Err(FrameError::Truncated { len: 3 })
        ));
    }

    fn frame_with(module: u8, msg_id: u8, payload: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_slice(&SYNC_PATTERN);
        buf.put_u8(RESERVED_BYTE);
        buf.put_u8(module);
        buf.put_u8(msg_id);
        buf.put_u32_le(0);
        buf.put_u8(payload.len() as u8);
        buf.put_slice(payload);
        let crc = checksum(&buf[2..]);
        buf.put_u8(crc);
        buf.to_vec()
    }

    #[test]
    fn test_decode_unknown_module_and_mode() {
        let frame = frame_with(0x42, 0x14, &[0; 4]);
        assert!(matches!(
            decode_message(&frame),
            Err(FrameError::UnknownModule(0x42))
        ));

        let frame = frame_with(0xF0, 0x17, &[0; 4]);
        assert!(matches!(
            decode_message(&frame),
            Err(FrameError::UnknownMode {
                module: 0xF0,
                msg_id: 0x17
            })
        ));

        let frame = frame_with(0xF0, 0x11, &[0; 4]);
        assert!(matches!(
            decode_message(&frame),
            Err(FrameError::UnknownMode { .. })
        ));
    }

    #[test]
    fn test_decode_length_mismatch_with_valid_crc() {
        let mut frame = frame_with(0xF0, 0x14, &[1, 2, 3, 4]);
        // Declare 5 bytes, then fix the CRC so only the size check can fail.
        frame[PAYLOAD_SIZE_OFFSET] = 5;
        let last = frame.len() - 1;
        frame[last] = checksum(&frame[2..last]);
        assert!(matches!(
            decode_message(&frame),
            Err(FrameError::LengthMismatch {
                declared: 5,
                actual: 4
            })
        ));
    }

    #[test]
    fn test_encode_rejects_oversized_payload() {
        let mut msg = Message::new(
            ModuleId::Camera,
            MessageId::WritingModeB,
            Payload::Camera(CameraData::Image(ImageChunk::single(vec![0u8; 254]))),
        );
        let mut buf = BytesMut::new();
        let err = encode_message(&mut msg, &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 256, max: 255 }));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_display() {
        let mut msg = depth_message();
        let mut buf = BytesMut::new();
        encode_message(&mut msg, &mut buf).unwrap();
        let text = msg.to_string();
        assert!(text.starts_with("{module:0x71,msg:0x14,ts:1000,size:12,payload:"));
    }
}
