use bytes::BytesMut;

use super::PayloadCodec;
use crate::error::Result;
use crate::ids::{MessageId, ModuleId};
use crate::wire::{expect_len, GetWire, PutWire};

/// Accelerometer, gyroscope and magnetometer sample.
///
/// Mode A carries accel + gyro, mode B adds the magnetometer, mode C is the
/// magnetometer alone. Fields a mode does not carry decode as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImuData {
    pub acc_factor: i16,
    pub gyr_factor: i16,
    pub ax: i16,
    pub ay: i16,
    pub az: i16,
    pub gx: i16,
    pub gy: i16,
    pub gz: i16,
    pub mx: i16,
    pub my: i16,
    pub mz: i16,
}

impl ImuData {
    pub const SIZE_MODE_A: usize = 16;
    pub const SIZE_MODE_B: usize = 22;
    pub const SIZE_MODE_C: usize = 6;

    fn put_inertial(&self, dst: &mut BytesMut) {
        dst.put_i16_sm(self.acc_factor);
        dst.put_i16_sm(self.ax);
        dst.put_i16_sm(self.ay);
        dst.put_i16_sm(self.az);
        dst.put_i16_sm(self.gyr_factor);
        dst.put_i16_sm(self.gx);
        dst.put_i16_sm(self.gy);
        dst.put_i16_sm(self.gz);
    }

    fn put_magnetic(&self, dst: &mut BytesMut) {
        dst.put_i16_sm(self.mx);
        dst.put_i16_sm(self.my);
        dst.put_i16_sm(self.mz);
    }

    fn get_inertial(&mut self, src: &mut &[u8]) {
        self.acc_factor = src.get_i16_sm();
        self.ax = src.get_i16_sm();
        self.ay = src.get_i16_sm();
        self.az = src.get_i16_sm();
        self.gyr_factor = src.get_i16_sm();
        self.gx = src.get_i16_sm();
        self.gy = src.get_i16_sm();
        self.gz = src.get_i16_sm();
    }

    fn get_magnetic(&mut self, src: &mut &[u8]) {
        self.mx = src.get_i16_sm();
        self.my = src.get_i16_sm();
        self.mz = src.get_i16_sm();
    }
}

impl PayloadCodec for ImuData {
    const MODULE: ModuleId = ModuleId::Imu;

    fn pack(&self, mode: MessageId, dst: &mut BytesMut) -> Result<()> {
        match mode {
            MessageId::WritingModeA => self.put_inertial(dst),
            MessageId::WritingModeB => {
                self.put_inertial(dst);
                self.put_magnetic(dst);
            }
            MessageId::WritingModeC => self.put_magnetic(dst),
            _ => return Err(Self::unsupported(mode)),
        }
        Ok(())
    }

    fn unpack(mut src: &[u8], mode: MessageId) -> Result<Self> {
        let mut data = Self::default();
        match mode {
            MessageId::WritingModeA => {
                expect_len(src, Self::SIZE_MODE_A)?;
                data.get_inertial(&mut src);
            }
            MessageId::WritingModeB => {
                expect_len(src, Self::SIZE_MODE_B)?;
                data.get_inertial(&mut src);
                data.get_magnetic(&mut src);
            }
            MessageId::WritingModeC => {
                expect_len(src, Self::SIZE_MODE_C)?;
                data.get_magnetic(&mut src);
            }
            _ => return Err(Self::unsupported(mode)),
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ImuData {
        ImuData {
            acc_factor: 16,
            gyr_factor: 131,
            ax: -120,
            ay: 45,
            az: 16_384,
            gx: -3,
            gy: 0,
            gz: 7,
            mx: -250,
            my: 310,
            mz: -i16::MAX,
        }
    }

    #[test]
    fn test_mode_sizes() {
        for (mode, size) in [
            (MessageId::WritingModeA, ImuData::SIZE_MODE_A),
            (MessageId::WritingModeB, ImuData::SIZE_MODE_B),
            (MessageId::WritingModeC, ImuData::SIZE_MODE_C),
        ] {
            let mut buf = BytesMut::new();
            sample().pack(mode, &mut buf).unwrap();
            assert_eq!(buf.len(), size, "mode {mode}");
        }
    }

    #[test]
    fn test_mode_b_keeps_everything() {
        let mut buf = BytesMut::new();
        sample().pack(MessageId::WritingModeB, &mut buf).unwrap();
        let back = ImuData::unpack(&buf, MessageId::WritingModeB).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_mode_c_magnetometer_only() {
        let mut buf = BytesMut::new();
        sample().pack(MessageId::WritingModeC, &mut buf).unwrap();
        let back = ImuData::unpack(&buf, MessageId::WritingModeC).unwrap();
        assert_eq!((back.mx, back.my, back.mz), (-250, 310, -i16::MAX));
        assert_eq!(back.ax, 0);
        assert_eq!(back.acc_factor, 0);
    }

    #[test]
    fn test_negative_axis_is_sign_magnitude() {
        let data = ImuData {
            ax: -1,
            ..Default::default()
        };
        let mut buf = BytesMut::new();
        data.pack(MessageId::WritingModeA, &mut buf).unwrap();
        assert_eq!(&buf[2..4], &[0x01, 0x80]);
    }
}
