use bytes::{Buf, BufMut, BytesMut};

use super::PayloadCodec;
use crate::error::Result;
use crate::ids::{MessageId, ModuleId};
use crate::wire::{expect_len, GetWire, PutWire, U24};

/// One range reading from the depth meter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DepthMeterData {
    pub sensor_id: u8,
    /// Sensor-side time of the reading, ms since the time origin.
    pub system_time: u32,
    pub distance: U24,
    pub status: u8,
    pub strength: u16,
    pub precision: u8,
}

impl DepthMeterData {
    pub const SIZE: usize = 12;
}

impl PayloadCodec for DepthMeterData {
    const MODULE: ModuleId = ModuleId::DepthMeter;

    fn pack(&self, mode: MessageId, dst: &mut BytesMut) -> Result<()> {
        if mode != MessageId::WritingModeA {
            return Err(Self::unsupported(mode));
        }
        dst.reserve(Self::SIZE);
        dst.put_u8(self.sensor_id);
        dst.put_u32_le(self.system_time);
        dst.put_u24_le(self.distance);
        dst.put_u8(self.status);
        dst.put_u16_le(self.strength);
        dst.put_u8(self.precision);
        Ok(())
    }

    fn unpack(mut src: &[u8], mode: MessageId) -> Result<Self> {
        if mode != MessageId::WritingModeA {
            return Err(Self::unsupported(mode));
        }
        expect_len(src, Self::SIZE)?;
        Ok(Self {
            sensor_id: src.get_u8(),
            system_time: src.get_u32_le(),
            distance: src.get_u24_le(),
            status: src.get_u8(),
            strength: src.get_u16_le(),
            precision: src.get_u8(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FrameError;

    fn sample() -> DepthMeterData {
        DepthMeterData {
            sensor_id: 1,
            system_time: 1000,
            distance: U24::from(1000u16),
            status: 1,
            strength: 1024,
            precision: 32,
        }
    }

    #[test]
    fn test_layout() {
        let mut buf = BytesMut::new();
        sample().pack(MessageId::WritingModeA, &mut buf).unwrap();
        assert_eq!(
            buf.as_ref(),
            &[0x01, 0xE8, 0x03, 0x00, 0x00, 0xE8, 0x03, 0x00, 0x01, 0x00, 0x04, 0x20]
        );
        let back = DepthMeterData::unpack(&buf, MessageId::WritingModeA).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_wrong_length() {
        let result = DepthMeterData::unpack(&[0; 11], MessageId::WritingModeA);
        assert!(matches!(
            result,
            Err(FrameError::PayloadLength {
                expected: 12,
                actual: 11
            })
        ));
    }

    #[test]
    fn test_unsupported_mode() {
        let mut buf = BytesMut::new();
        let result = sample().pack(MessageId::WritingModeC, &mut buf);
        assert!(matches!(result, Err(FrameError::UnknownMode { .. })));
    }
}
