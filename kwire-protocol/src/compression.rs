use std::io::{Read, Write};

use bytes::Bytes;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::error::{DecodeError, EncodeError};

/// Attribute bits 0-2 of a message
pub const COMPRESSION_MASK: i8 = 0x07;

/// Header written by the xerial snappy stream framing used by JVM producers.
const XERIAL_MAGIC: &[u8] = &[0x82, b'S', b'N', b'A', b'P', b'P', b'Y', 0];
const XERIAL_HEADER_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i8)]
pub enum CompressionType {
    #[default]
    None = 0,
    Gzip = 1,
    Snappy = 2,
    Lz4 = 3,
}

impl CompressionType {
    pub fn from_id(id: i8) -> Option<Self> {
        match id {
            0 => Some(Self::None),
            1 => Some(Self::Gzip),
            2 => Some(Self::Snappy),
            3 => Some(Self::Lz4),
            _ => None,
        }
    }

    /// Reads the codec out of a message's attribute byte.
    pub fn from_attributes(attributes: i8) -> Result<Self, DecodeError> {
        let id = attributes & COMPRESSION_MASK;
        Self::from_id(id).ok_or(DecodeError::UnknownCompression(id))
    }

    pub fn compress(&self, data: &[u8]) -> Result<Bytes, EncodeError> {
        let failed = |e: std::io::Error| EncodeError::Compression(format!("{:?}: {}", self, e));
        match self {
            Self::None => Ok(Bytes::copy_from_slice(data)),
            Self::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(data).map_err(failed)?;
                Ok(Bytes::from(encoder.finish().map_err(failed)?))
            }
            Self::Snappy => {
                let compressed = snap::raw::Encoder::new()
                    .compress_vec(data)
                    .map_err(|e| EncodeError::Compression(format!("Snappy: {}", e)))?;
                Ok(Bytes::from(compressed))
            }
            Self::Lz4 => {
                let mut encoder = lz4_flex::frame::FrameEncoder::new(Vec::new());
                encoder.write_all(data).map_err(failed)?;
                let compressed = encoder
                    .finish()
                    .map_err(|e| EncodeError::Compression(format!("Lz4: {}", e)))?;
                Ok(Bytes::from(compressed))
            }
        }
    }

    pub fn decompress(&self, data: &[u8]) -> Result<Bytes, DecodeError> {
        let failed = |e: std::io::Error| DecodeError::Decompression(format!("{:?}: {}", self, e));
        match self {
            Self::None => Ok(Bytes::copy_from_slice(data)),
            Self::Gzip => {
                let mut buffer = Vec::new();
                GzDecoder::new(data)
                    .read_to_end(&mut buffer)
                    .map_err(failed)?;
                Ok(Bytes::from(buffer))
            }
            Self::Snappy => snappy_decompress(data).map(Bytes::from),
            Self::Lz4 => {
                let mut buffer = Vec::new();
                lz4_flex::frame::FrameDecoder::new(data)
                    .read_to_end(&mut buffer)
                    .map_err(failed)?;
                Ok(Bytes::from(buffer))
            }
        }
    }
}

fn snappy_raw(block: &[u8]) -> Result<Vec<u8>, DecodeError> {
    snap::raw::Decoder::new()
        .decompress_vec(block)
        .map_err(|e| DecodeError::Decompression(format!("Snappy: {}", e)))
}

/// Accepts both a bare snappy block and the xerial framing: a 16-byte
/// header followed by `length:i32 block` chunks.
fn snappy_decompress(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    if !data.starts_with(XERIAL_MAGIC) {
        return snappy_raw(data);
    }
    let mut rest = data.get(XERIAL_HEADER_LEN..).unwrap_or_default();
    let mut out = Vec::new();
    while !rest.is_empty() {
        if rest.len() < 4 {
            return Err(DecodeError::Decompression(
                "Snappy: truncated xerial chunk length".to_string(),
            ));
        }
        let len = i32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]);
        let len = usize::try_from(len).map_err(|_| DecodeError::InvalidLength(len))?;
        let chunk = rest.get(4..4 + len).ok_or_else(|| {
            DecodeError::Decompression("Snappy: truncated xerial chunk".to_string())
        })?;
        out.extend_from_slice(&snappy_raw(chunk)?);
        rest = &rest[4 + len..];
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> Vec<u8> {
        b"value1".repeat(100)
    }

    #[test]
    fn test_gzip_roundtrip() {
        let compressed = CompressionType::Gzip.compress(&payload()).unwrap();
        assert!(compressed.len() < payload().len());
        let decompressed = CompressionType::Gzip.decompress(&compressed).unwrap();
        assert_eq!(decompressed.as_ref(), payload().as_slice());
    }

    #[test]
    fn test_snappy_roundtrip() {
        let compressed = CompressionType::Snappy.compress(&payload()).unwrap();
        let decompressed = CompressionType::Snappy.decompress(&compressed).unwrap();
        assert_eq!(decompressed.as_ref(), payload().as_slice());
    }

    #[test]
    fn test_snappy_xerial_framing() {
        let first = snap::raw::Encoder::new().compress_vec(b"hello ").unwrap();
        let second = snap::raw::Encoder::new().compress_vec(b"world").unwrap();

        let mut framed = XERIAL_MAGIC.to_vec();
        framed.extend_from_slice(&1i32.to_be_bytes());
        framed.extend_from_slice(&1i32.to_be_bytes());
        for chunk in [&first, &second] {
            framed.extend_from_slice(&(chunk.len() as i32).to_be_bytes());
            framed.extend_from_slice(chunk);
        }

        let decompressed = CompressionType::Snappy.decompress(&framed).unwrap();
        assert_eq!(decompressed.as_ref(), b"hello world");
    }

    #[test]
    fn test_lz4_roundtrip() {
        let compressed = CompressionType::Lz4.compress(&payload()).unwrap();
        let decompressed = CompressionType::Lz4.decompress(&compressed).unwrap();
        assert_eq!(decompressed.as_ref(), payload().as_slice());
    }

    #[test]
    fn test_corrupt_gzip_is_an_error() {
        let err = CompressionType::Gzip.decompress(b"not gzip").unwrap_err();
        assert!(matches!(err, DecodeError::Decompression(_)));
    }

    #[test]
    fn test_attribute_bits() {
        assert_eq!(
            CompressionType::from_attributes(0x08 | 0x01).unwrap(),
            CompressionType::Gzip
        );
        assert_eq!(
            CompressionType::from_attributes(0x05),
            Err(DecodeError::UnknownCompression(5))
        );
    }
}
