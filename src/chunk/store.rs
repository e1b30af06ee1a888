//! External chunk sources. The manager only ever asks a store to open a
//! reader over one column's raw payload; decoding stays on this side.

use super::{BLOCK_COUNT, NIBBLE_COUNT, SIZE_X, SIZE_Y, SIZE_Z};
use crate::block;
use std::io::{self, Cursor, Read};

/// Where chunk payloads come from. File-backed stores, generators and test
/// stubs all look the same to the manager.
pub trait ChunkStore: Send + Sync {
    /// Opens a reader over the raw payload for the column at `(cx, cz)`, in
    /// the legacy on-disk order.
    fn load(&self, cx: i32, cz: i32) -> io::Result<Box<dyn Read + Send>>;
}

/// Deterministic flat terrain: bedrock floor, stone, three layers of dirt
/// and a grass surface, with full sky light above ground. Lets the server
/// run with no world on disk, and keeps tests reproducible.
pub struct FlatWorldStore {
    ground_level: i32,
}

impl FlatWorldStore {
    pub fn new() -> Self {
        Self { ground_level: 64 }
    }

    fn generate(&self) -> Vec<u8> {
        let mut blocks = vec![0u8; BLOCK_COUNT];
        let mut sky_light = vec![0u8; NIBBLE_COUNT];
        for x in 0..SIZE_X {
            for z in 0..SIZE_Z {
                for y in 0..SIZE_Y {
                    let index = (y + z * SIZE_Y + x * SIZE_Y * SIZE_Z) as usize;
                    blocks[index] = if y == 0 {
                        block::BEDROCK
                    } else if y < self.ground_level - 3 {
                        block::STONE
                    } else if y < self.ground_level {
                        block::DIRT
                    } else if y == self.ground_level {
                        block::GRASS
                    } else {
                        block::AIR
                    };
                    if y > self.ground_level {
                        let byte = &mut sky_light[index / 2];
                        if index % 2 == 0 {
                            *byte |= 0x0F;
                        } else {
                            *byte |= 0xF0;
                        }
                    }
                }
            }
        }

        let mut payload = blocks;
        payload.extend_from_slice(&vec![0u8; NIBBLE_COUNT]); // metadata
        payload.extend_from_slice(&vec![0u8; NIBBLE_COUNT]); // block light
        payload.extend_from_slice(&sky_light);
        payload
    }
}

impl Default for FlatWorldStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkStore for FlatWorldStore {
    fn load(&self, _cx: i32, _cz: i32) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(self.generate())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{ChunkData, PAYLOAD_LEN};

    #[test]
    fn generated_columns_have_the_expected_strata() {
        let store = FlatWorldStore::new();
        let mut reader = store.load(3, -7).unwrap();
        let data = ChunkData::from_reader(&mut reader).unwrap();
        assert_eq!(data.block_at(8, 0, 8), Some(block::BEDROCK));
        assert_eq!(data.block_at(8, 30, 8), Some(block::STONE));
        assert_eq!(data.block_at(8, 62, 8), Some(block::DIRT));
        assert_eq!(data.block_at(8, 64, 8), Some(block::GRASS));
        assert_eq!(data.block_at(8, 65, 8), Some(block::AIR));
    }

    #[test]
    fn generated_payload_has_the_wire_length() {
        let store = FlatWorldStore::new();
        let mut reader = store.load(0, 0).unwrap();
        let mut payload = Vec::new();
        reader.read_to_end(&mut payload).unwrap();
        assert_eq!(payload.len(), PAYLOAD_LEN);
    }
}
