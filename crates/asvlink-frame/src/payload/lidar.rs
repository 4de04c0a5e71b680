use bytes::{Buf, BufMut, BytesMut};

use super::PayloadCodec;
use crate::error::Result;
use crate::ids::{MessageId, ModuleId};
use crate::wire::expect_len;

/// Points per lidar packet.
pub const LIDAR_POINTS: usize = 12;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LidarPoint {
    pub distance: u16,
    pub intensity: u8,
}

/// One lidar sweep segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LidarData {
    /// Rotation speed, degrees per second.
    pub speed: u16,
    /// Angle of the first point, 0.01 degree units.
    pub start_angle: u16,
    pub points: [LidarPoint; LIDAR_POINTS],
    /// Angle of the last point, 0.01 degree units.
    pub end_angle: u16,
    pub timestamp: u16,
}

impl LidarData {
    pub const SIZE: usize = 2 + 2 + LIDAR_POINTS * 3 + 2 + 2;
}

impl PayloadCodec for LidarData {
    const MODULE: ModuleId = ModuleId::Lidar;

    fn pack(&self, mode: MessageId, dst: &mut BytesMut) -> Result<()> {
        if mode != MessageId::WritingModeA {
            return Err(Self::unsupported(mode));
        }
        dst.reserve(Self::SIZE);
        dst.put_u16_le(self.speed);
        dst.put_u16_le(self.start_angle);
        for point in &self.points {
            dst.put_u16_le(point.distance);
            dst.put_u8(point.intensity);
        }
        dst.put_u16_le(self.end_angle);
        dst.put_u16_le(self.timestamp);
        Ok(())
    }

    fn unpack(mut src: &[u8], mode: MessageId) -> Result<Self> {
        if mode != MessageId::WritingModeA {
            return Err(Self::unsupported(mode));
        }
        expect_len(src, Self::SIZE)?;
        let speed = src.get_u16_le();
        let start_angle = src.get_u16_le();
        let mut points = [LidarPoint::default(); LIDAR_POINTS];
        for point in &mut points {
            point.distance = src.get_u16_le();
            point.intensity = src.get_u8();
        }
        Ok(Self {
            speed,
            start_angle,
            points,
            end_angle: src.get_u16_le(),
            timestamp: src.get_u16_le(),
        })
    }
}
