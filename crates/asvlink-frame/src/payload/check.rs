use bytes::{Buf, BufMut, BytesMut};

use super::PayloadCodec;
use crate::error::Result;
use crate::ids::{MessageId, ModuleId};
use crate::wire::expect_len;

/// Synthetic link-test payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckData {
    pub value: u32,
}

impl CheckData {
    pub const SIZE: usize = 4;
}

impl PayloadCodec for CheckData {
    const MODULE: ModuleId = ModuleId::Check;

    fn pack(&self, mode: MessageId, dst: &mut BytesMut) -> Result<()> {
        if mode != MessageId::WritingModeA {
            return Err(Self::unsupported(mode));
        }
        dst.put_u32_le(self.value);
        Ok(())
    }

    fn unpack(mut src: &[u8], mode: MessageId) -> Result<Self> {
        if mode != MessageId::WritingModeA {
            return Err(Self::unsupported(mode));
        }
        expect_len(src, Self::SIZE)?;
        Ok(Self {
            value: src.get_u32_le(),
        })
    }
}
