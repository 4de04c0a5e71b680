//! Field-level wire primitives shared by the payload codecs.
//!
//! Unsigned fields are plain little-endian. Signed fields are sign-magnitude:
//! the magnitude is little-endian and the top bit of the most significant
//! byte carries the sign. Two's-complement minimums have no sign-magnitude
//! representation and saturate to `-(MAX)`.

use bytes::{Buf, BufMut};

use crate::error::{FrameError, Result};

const I16_SIGN: u16 = 0x8000;
const I32_SIGN: u32 = 0x8000_0000;

/// Unsigned 24-bit value, stored in three little-endian bytes on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct U24(u32);

impl U24 {
    pub const MAX: u32 = 0x00FF_FFFF;

    /// Returns `None` if `value` does not fit in 24 bits.
    pub const fn new(value: u32) -> Option<Self> {
        if value > Self::MAX {
            None
        } else {
            Some(Self(value))
        }
    }

    pub const fn saturating(value: u32) -> Self {
        if value > Self::MAX {
            Self(Self::MAX)
        } else {
            Self(value)
        }
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u16> for U24 {
    fn from(value: u16) -> Self {
        Self(u32::from(value))
    }
}

impl From<U24> for u32 {
    fn from(value: U24) -> Self {
        value.0
    }
}

/// Encode an `i16` as sign-magnitude bits.
pub fn i16_to_sign_magnitude(value: i16) -> u16 {
    let magnitude = value.unsigned_abs().min(i16::MAX as u16);
    if value < 0 {
        magnitude | I16_SIGN
    } else {
        magnitude
    }
}

/// Decode sign-magnitude bits into an `i16`. Negative zero decodes to 0.
pub fn i16_from_sign_magnitude(bits: u16) -> i16 {
    let magnitude = (bits & !I16_SIGN) as i16;
    if bits & I16_SIGN != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Encode an `i32` as sign-magnitude bits.
pub fn i32_to_sign_magnitude(value: i32) -> u32 {
    let magnitude = value.unsigned_abs().min(i32::MAX as u32);
    if value < 0 {
        magnitude | I32_SIGN
    } else {
        magnitude
    }
}

/// Decode sign-magnitude bits into an `i32`. Negative zero decodes to 0.
pub fn i32_from_sign_magnitude(bits: u32) -> i32 {
    let magnitude = (bits & !I32_SIGN) as i32;
    if bits & I32_SIGN != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Writers for the non-native field encodings.
pub trait PutWire: BufMut {
    fn put_i16_sm(&mut self, value: i16) {
        self.put_u16_le(i16_to_sign_magnitude(value));
    }

    fn put_i32_sm(&mut self, value: i32) {
        self.put_u32_le(i32_to_sign_magnitude(value));
    }

    fn put_u24_le(&mut self, value: U24) {
        self.put_uint_le(u64::from(value.get()), 3);
    }
}

impl<B: BufMut + ?Sized> PutWire for B {}

/// Readers for the non-native field encodings.
///
/// Like the `bytes` getters these panic on underflow; callers check the
/// payload length before reading.
pub trait GetWire: Buf {
    fn get_i16_sm(&mut self) -> i16 {
        i16_from_sign_magnitude(self.get_u16_le())
    }

    fn get_i32_sm(&mut self) -> i32 {
        i32_from_sign_magnitude(self.get_u32_le())
    }

    fn get_u24_le(&mut self) -> U24 {
        U24(self.get_uint_le(3) as u32)
    }
}

impl<B: Buf + ?Sized> GetWire for B {}

/// Fail with [`FrameError::PayloadLength`] unless `src` is exactly `expected` bytes.
pub fn expect_len(src: &[u8], expected: usize) -> Result<()> {
    if src.len() != expected {
        return Err(FrameError::PayloadLength {
            expected,
            actual: src.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_i16_sign_magnitude_layout() {
        assert_eq!(i16_to_sign_magnitude(5), 0x0005);
        assert_eq!(i16_to_sign_magnitude(-5), 0x8005);
        assert_eq!(i16_to_sign_magnitude(i16::MAX), 0x7FFF);

        let mut buf = BytesMut::new();
        buf.put_i16_sm(-300);
        // magnitude 300 = 0x012C, little-endian with sign on the high byte
        assert_eq!(buf.as_ref(), &[0x2C, 0x81]);
    }

    #[test]
    fn test_i16_min_saturates() {
        assert_eq!(i16_to_sign_magnitude(i16::MIN), 0xFFFF);
        assert_eq!(i16_from_sign_magnitude(0xFFFF), -i16::MAX);
    }

    #[test]
    fn test_negative_zero_decodes_to_zero() {
        assert_eq!(i16_from_sign_magnitude(0x8000), 0);
        assert_eq!(i32_from_sign_magnitude(0x8000_0000), 0);
    }

    #[test]
    fn test_i32_sign_magnitude() {
        assert_eq!(i32_to_sign_magnitude(-1), 0x8000_0001);
        assert_eq!(i32_from_sign_magnitude(0x8000_0001), -1);
        assert_eq!(i32_to_sign_magnitude(i32::MIN), 0xFFFF_FFFF);

        let mut buf = BytesMut::new();
        buf.put_i32_sm(-557_000_000);
        let mut src = &buf[..];
        assert_eq!(src.get_i32_sm(), -557_000_000);
    }

    #[test]
    fn test_u24_bounds() {
        assert_eq!(U24::new(U24::MAX).map(U24::get), Some(0x00FF_FFFF));
        assert!(U24::new(0x0100_0000).is_none());
        assert_eq!(U24::saturating(u32::MAX).get(), U24::MAX);

        let mut buf = BytesMut::new();
        buf.put_u24_le(U24::from(1000u16));
        assert_eq!(buf.as_ref(), &[0xE8, 0x03, 0x00]);
        let mut src = &buf[..];
        assert_eq!(src.get_u24_le().get(), 1000);
    }

    #[test]
    fn test_expect_len() {
        assert!(expect_len(&[0; 4], 4).is_ok());
        assert!(matches!(
            expect_len(&[0; 3], 4),
            Err(FrameError::PayloadLength {
                expected: 4,
                actual: 3
            })
        ));
    }
}
