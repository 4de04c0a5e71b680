use bytes::{Buf, BufMut, BytesMut};

use super::PayloadCodec;
use crate::error::Result;
use crate::ids::{MessageId, ModuleId};
use crate::wire::{expect_len, GetWire, PutWire};

/// Geodetic position solution (UBX NAV-POSLLH).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GnssPosition {
    /// GPS time of week, ms.
    pub itow: u32,
    /// Longitude, 1e-7 degrees.
    pub lon: i32,
    /// Latitude, 1e-7 degrees.
    pub lat: i32,
    /// Height above ellipsoid, mm.
    pub height: i32,
    /// Height above mean sea level, mm.
    pub hmsl: i32,
    pub h_acc: u32,
    pub v_acc: u32,
}

/// Velocity solution in the NED frame (UBX NAV-VELNED).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GnssVelocity {
    pub itow: u32,
    /// North/east/down velocity, cm/s.
    pub vel_n: i32,
    pub vel_e: i32,
    pub vel_d: i32,
    pub speed: u32,
    pub ground_speed: u32,
    /// Heading of motion, 1e-5 degrees.
    pub heading: i32,
    pub s_acc: u32,
    pub c_acc: u32,
}

/// GNSS fix. Mode A carries both halves, mode B position, mode C velocity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GnssData {
    pub position: GnssPosition,
    pub velocity: GnssVelocity,
}

impl GnssPosition {
    pub const SIZE: usize = 28;

    fn put(&self, dst: &mut BytesMut) {
        dst.put_u32_le(self.itow);
        dst.put_i32_sm(self.lon);
        dst.put_i32_sm(self.lat);
        dst.put_i32_sm(self.height);
        dst.put_i32_sm(self.hmsl);
        dst.put_u32_le(self.h_acc);
        dst.put_u32_le(self.v_acc);
    }

    fn get(src: &mut &[u8]) -> Self {
        Self {
            itow: src.get_u32_le(),
            lon: src.get_i32_sm(),
            lat: src.get_i32_sm(),
            height: src.get_i32_sm(),
            hmsl: src.get_i32_sm(),
            h_acc: src.get_u32_le(),
            v_acc: src.get_u32_le(),
        }
    }
}

impl GnssVelocity {
    pub const SIZE: usize = 36;

    fn put(&self, dst: &mut BytesMut) {
        dst.put_u32_le(self.itow);
        dst.put_i32_sm(self.vel_n);
        dst.put_i32_sm(self.vel_e);
        dst.put_i32_sm(self.vel_d);
        dst.put_u32_le(self.speed);
        dst.put_u32_le(self.ground_speed);
        dst.put_i32_sm(self.heading);
        dst.put_u32_le(self.s_acc);
        dst.put_u32_le(self.c_acc);
    }

    fn get(src: &mut &[u8]) -> Self {
        Self {
            itow: src.get_u32_le(),
            vel_n: src.get_i32_sm(),
            vel_e: src.get_i32_sm(),
            vel_d: src.get_i32_sm(),
            speed: src.get_u32_le(),
            ground_speed: src.get_u32_le(),
            heading: src.get_i32_sm(),
            s_acc: src.get_u32_le(),
            c_acc: src.get_u32_le(),
        }
    }
}

impl PayloadCodec for GnssData {
    const MODULE: ModuleId = ModuleId::Gnss;

    fn pack(&self, mode: MessageId, dst: &mut BytesMut) -> Result<()> {
        match mode {
            MessageId::WritingModeA => {
                self.position.put(dst);
                self.velocity.put(dst);
            }
            MessageId::WritingModeB => self.position.put(dst),
            MessageId::WritingModeC => self.velocity.put(dst),
            _ => return Err(Self::unsupported(mode)),
        }
        Ok(())
    }

    fn unpack(mut src: &[u8], mode: MessageId) -> Result<Self> {
        let mut data = Self::default();
        match mode {
            MessageId::WritingModeA => {
                expect_len(src, GnssPosition::SIZE + GnssVelocity::SIZE)?;
                data.position = GnssPosition::get(&mut src);
                data.velocity = GnssVelocity::get(&mut src);
            }
            MessageId::WritingModeB => {
                expect_len(src, GnssPosition::SIZE)?;
                data.position = GnssPosition::get(&mut src);
            }
            MessageId::WritingModeC => {
                expect_len(src, GnssVelocity::SIZE)?;
                data.velocity = GnssVelocity::get(&mut src);
            }
            _ => return Err(Self::unsupported(mode)),
        }
        Ok(data)
    }
}
