use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::PayloadCodec;
use crate::error::{FrameError, Result};
use crate::ids::{MessageId, ModuleId};
use crate::wire::{expect_len, GetWire, PutWire};

/// Camera orientation, 1e-4 degree units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Orientation {
    pub yaw: i16,
    pub pitch: i16,
    pub roll: i16,
}

impl Orientation {
    pub const SIZE: usize = 6;
}

/// One slice of an encoded image; chunk counters are 1-based.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageChunk {
    pub current_chunk: u8,
    pub total_chunks: u8,
    pub raw_bytes: Bytes,
}

impl ImageChunk {
    /// Counter bytes preceding the raw image slice.
    pub const HEADER_SIZE: usize = 2;

    /// A whole image that fits in one frame.
    pub fn single(raw_bytes: impl Into<Bytes>) -> Self {
        Self {
            current_chunk: 1,
            total_chunks: 1,
            raw_bytes: raw_bytes.into(),
        }
    }

    pub fn is_last(&self) -> bool {
        self.current_chunk == self.total_chunks
    }
}

/// Camera payload: orientation in mode A, an image chunk in mode B.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraData {
    Orientation(Orientation),
    Image(ImageChunk),
}

impl fmt::Display for CameraData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraData::Orientation(o) => write!(
                f,
                "{{yaw:{},pitch:{},roll:{}}}",
                o.yaw, o.pitch, o.roll
            ),
            CameraData::Image(chunk) => write!(
                f,
                "{{chunk:{}/{},image_len:{}}}",
                chunk.current_chunk,
                chunk.total_chunks,
                chunk.raw_bytes.len()
            ),
        }
    }
}

impl PayloadCodec for CameraData {
    const MODULE: ModuleId = ModuleId::Camera;

    fn pack(&self, mode: MessageId, dst: &mut BytesMut) -> Result<()> {
        match (mode, self) {
            (MessageId::WritingModeA, CameraData::Orientation(o)) => {
                dst.put_i16_sm(o.yaw);
                dst.put_i16_sm(o.pitch);
                dst.put_i16_sm(o.roll);
                Ok(())
            }
            (MessageId::WritingModeB, CameraData::Image(chunk)) => {
                dst.reserve(ImageChunk::HEADER_SIZE + chunk.raw_bytes.len());
                dst.put_u8(chunk.current_chunk);
                dst.put_u8(chunk.total_chunks);
                dst.put_slice(&chunk.raw_bytes);
                Ok(())
            }
            (MessageId::WritingModeA | MessageId::WritingModeB, _) => {
                Err(FrameError::PayloadMismatch {
                    module: Self::MODULE.as_u8(),
                    msg_id: mode.as_u8(),
                })
            }
            _ => Err(Self::unsupported(mode)),
        }
    }

    fn unpack(mut src: &[u8], mode: MessageId) -> Result<Self> {
        match mode {
            MessageId::WritingModeA => {
                expect_len(src, Orientation::SIZE)?;
                Ok(CameraData::Orientation(Orientation {
                    yaw: src.get_i16_sm(),
                    pitch: src.get_i16_sm(),
                    roll: src.get_i16_sm(),
                }))
            }
            MessageId::WritingModeB => {
                if src.len() < ImageChunk::HEADER_SIZE {
                    return Err(FrameError::PayloadLength {
                        expected: ImageChunk::HEADER_SIZE,
                        actual: src.len(),
                    });
                }
                let current_chunk = src.get_u8();
                let total_chunks = src.get_u8();
                Ok(CameraData::Image(ImageChunk {
                    current_chunk,
                    total_chunks,
                    raw_bytes: Bytes::copy_from_slice(src),
                }))
            }
            _ => Err(Self::unsupported(mode)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation_roundtrip() {
        let data = CameraData::Orientation(Orientation {
            yaw: -1800,
            pitch: 25,
            roll: -3,
        });
        let mut buf = BytesMut::new();
        data.pack(MessageId::WritingModeA, &mut buf).unwrap();
        assert_eq!(buf.len(), Orientation::SIZE);
        assert_eq!(CameraData::unpack(&buf, MessageId::WritingModeA).unwrap(), data);
    }

    #[test]
    fn test_image_chunk_layout() {
        let data = CameraData::Image(ImageChunk {
            current_chunk: 2,
            total_chunks: 3,
            raw_bytes: Bytes::from_static(&[0xFF, 0xD8, 0xFF]),
        });
        let mut buf = BytesMut::new();
        data.pack(MessageId::WritingModeB, &mut buf).unwrap();
        assert_eq!(buf.as_ref(), &[2, 3, 0xFF, 0xD8, 0xFF]);
        assert_eq!(CameraData::unpack(&buf, MessageId::WritingModeB).unwrap(), data);
    }

    #[test]
    fn test_empty_image_chunk() {
        let back = CameraData::unpack(&[1, 1], MessageId::WritingModeB).unwrap();
        assert_eq!(back, CameraData::Image(ImageChunk::single(Bytes::new())));
        assert!(matches!(
            CameraData::unpack(&[1], MessageId::WritingModeB),
            Err(FrameError::PayloadLength { .. })
        ));
    }

    #[test]
    fn test_variant_must_match_mode() {
        let data = CameraData::Image(ImageChunk::single(vec![1, 2, 3]));
        let mut buf = BytesMut::new();
        assert!(matches!(
            data.pack(MessageId::WritingModeA, &mut buf),
            Err(FrameError::PayloadMismatch { .. })
        ));
        assert!(matches!(
            data.pack(MessageId::WritingModeC, &mut buf),
            Err(FrameError::UnknownMode { .. })
        ));
    }

    #[test]
    fn test_display_summarizes_image() {
        let data = CameraData::Image(ImageChunk {
            current_chunk: 1,
            total_chunks: 4,
            raw_bytes: Bytes::from(vec![0u8; 250]),
        });
        assert_eq!(data.to_string(), "{chunk:1/4,image_len:250}");
    }
}
