//! The map-chunk bulk payload: the one packet whose body cannot be derived
//! from a field list. The raw voxel arrays are zlib-compressed behind an
//! `i32` length prefix, and the decompressed size must agree with the
//! declared extent.

use crate::packets::MapChunk;
use crate::{CodecError, Deserializable, Result, Serializable};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Raw voxel payload of one column in legacy order: block ids, then the
/// metadata, block-light and sky-light nibble arrays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPayload(pub Vec<u8>);

/// Bytes a column of the given extent occupies uncompressed: one byte per
/// block plus three half-byte arrays.
pub fn payload_len(size_x: u8, size_y: u8, size_z: u8) -> usize {
    let volume = (size_x as usize + 1) * (size_y as usize + 1) * (size_z as usize + 1);
    volume + 3 * (volume / 2)
}

impl Serializable for MapChunk {
    fn to_writer<W: Write>(&self, output: &mut W) -> Result<usize> {
        let expected = payload_len(self.size_x, self.size_y, self.size_z);
        if self.payload.0.len() != expected {
            return Err(CodecError::BadChunkSize {
                expected,
                actual: self.payload.0.len(),
            });
        }

        let mut sum = 0;
        sum += self.x.to_writer(output)?;
        sum += self.y.to_writer(output)?;
        sum += self.z.to_writer(output)?;
        sum += self.size_x.to_writer(output)?;
        sum += self.size_y.to_writer(output)?;
        sum += self.size_z.to_writer(output)?;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&self.payload.0)?;
        let compressed = encoder.finish()?;

        sum += (compressed.len() as i32).to_writer(output)?;
        output.write_all(&compressed)?;
        Ok(sum + compressed.len())
    }
}

impl Deserializable for MapChunk {
    fn from_reader<R: Read>(input: &mut R) -> Result<Self> {
        let x = i32::from_reader(input)?;
        let y = i16::from_reader(input)?;
        let z = i32::from_reader(input)?;
        let size_x = u8::from_reader(input)?;
        let size_y = u8::from_reader(input)?;
        let size_z = u8::from_reader(input)?;

        let compressed_len = i32::from_reader(input)?;
        if compressed_len < 0 {
            return Err(CodecError::NegativeLength);
        }
        let mut compressed = vec![0u8; compressed_len as usize];
        input.read_exact(&mut compressed)?;

        let mut raw = Vec::new();
        ZlibDecoder::new(&compressed[..]).read_to_end(&mut raw)?;

        let expected = payload_len(size_x, size_y, size_z);
        if raw.len() != expected {
            return Err(CodecError::BadChunkSize {
                expected,
                actual: raw.len(),
            });
        }

        Ok(MapChunk {
            x,
            y,
            z,
            size_x,
            size_y,
            size_z,
            payload: ChunkPayload(raw),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode;
    use std::io::Cursor;

    fn full_column() -> MapChunk {
        let len = payload_len(15, 127, 15);
        let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        MapChunk {
            x: -16,
            y: 0,
            z: 32,
            size_x: 15,
            size_y: 127,
            size_z: 15,
            payload: ChunkPayload(payload),
        }
    }

    #[test]
    fn full_column_payload_is_81920_bytes() {
        assert_eq!(payload_len(15, 127, 15), 81920);
    }

    #[test]
    fn round_trips_through_compression() {
        let packet = full_column();
        let bytes = encode(&packet).unwrap();
        let mut cursor = Cursor::new(&bytes[..]);
        let back = MapChunk::from_reader(&mut cursor).unwrap();
        assert_eq!(back, packet);
        assert_eq!(cursor.position() as usize, bytes.len());
    }

    #[test]
    fn undersized_payload_is_rejected_on_encode() {
        let mut packet = full_column();
        packet.payload.0.truncate(100);
        let mut buf = Vec::new();
        assert!(matches!(
            packet.to_writer(&mut buf),
            Err(CodecError::BadChunkSize { expected: 81920, actual: 100 })
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn size_mismatch_is_rejected_on_decode() {
        // declared extent says 81920 bytes, but the stream compresses 100
        let mut bytes = Vec::new();
        (-16i32).to_writer(&mut bytes).unwrap();
        0i16.to_writer(&mut bytes).unwrap();
        32i32.to_writer(&mut bytes).unwrap();
        15u8.to_writer(&mut bytes).unwrap();
        127u8.to_writer(&mut bytes).unwrap();
        15u8.to_writer(&mut bytes).unwrap();
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&[0u8; 100]).unwrap();
        let compressed = encoder.finish().unwrap();
        (compressed.len() as i32).to_writer(&mut bytes).unwrap();
        bytes.extend_from_slice(&compressed);

        let mut cursor = Cursor::new(&bytes[..]);
        assert!(matches!(
            MapChunk::from_reader(&mut cursor),
            Err(CodecError::BadChunkSize { expected: 81920, actual: 100 })
        ));
    }

    #[test]
    fn negative_compressed_length_is_rejected() {
        let mut bytes = Vec::new();
        0i32.to_writer(&mut bytes).unwrap();
        0i16.to_writer(&mut bytes).unwrap();
        0i32.to_writer(&mut bytes).unwrap();
        bytes.extend_from_slice(&[15, 127, 15]);
        (-1i32).to_writer(&mut bytes).unwrap();

        let mut cursor = Cursor::new(&bytes[..]);
        assert!(matches!(
            MapChunk::from_reader(&mut cursor),
            Err(CodecError::NegativeLength)
        ));
    }
}
