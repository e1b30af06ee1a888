//! Chunks: 16×128×16 voxel columns, each owning a serial work stream.

pub mod manager;
pub mod store;

use crate::actor::{self, Stopped};
use protocol::packets::{ChunkPayload, MapChunk};
use std::io::{self, Read};
use std::sync::{Arc, Weak};

pub const SIZE_X: i32 = 16;
pub const SIZE_Y: i32 = 128;
pub const SIZE_Z: i32 = 16;

/// One byte per block plus three nibble arrays.
pub const BLOCK_COUNT: usize = (SIZE_X * SIZE_Y * SIZE_Z) as usize;
pub const NIBBLE_COUNT: usize = BLOCK_COUNT / 2;
pub const PAYLOAD_LEN: usize = BLOCK_COUNT + 3 * NIBBLE_COUNT;

/// Chunk-column coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkXz {
    pub x: i32,
    pub z: i32,
}

impl ChunkXz {
    /// Stable 64-bit key used for the chunk map.
    pub fn key(self) -> u64 {
        ((self.x as u32 as u64) << 32) | self.z as u32 as u64
    }

    /// The column containing a world-unit position.
    pub fn of_position(x: f64, z: f64) -> Self {
        Self::of_block(x.floor() as i32, z.floor() as i32)
    }

    /// The column containing a block coordinate.
    pub fn of_block(x: i32, z: i32) -> Self {
        Self {
            x: x.div_euclid(SIZE_X),
            z: z.div_euclid(SIZE_Z),
        }
    }

    pub fn offset(self, side: Side) -> Self {
        let (dx, dz) = side.delta();
        Self {
            x: self.x + dx,
            z: self.z + dz,
        }
    }
}

/// The four cardinal neighbours of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    North,
    East,
    South,
    West,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::North, Side::East, Side::South, Side::West];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Side::North => (0, -1),
            Side::East => (1, 0),
            Side::South => (0, 1),
            Side::West => (-1, 0),
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::North => Side::South,
            Side::East => Side::West,
            Side::South => Side::North,
            Side::West => Side::East,
        }
    }

    fn index(self) -> usize {
        match self {
            Side::North => 0,
            Side::East => 1,
            Side::South => 2,
            Side::West => 3,
        }
    }
}

/// Raw voxel arrays for one column, in the legacy store order: block ids,
/// metadata, block light, sky light.
pub struct ChunkData {
    blocks: Vec<u8>,
    metadata: Vec<u8>,
    block_light: Vec<u8>,
    sky_light: Vec<u8>,
}

impl ChunkData {
    /// Reads the arrays exactly as a store reader yields them.
    pub fn from_reader<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        let mut blocks = vec![0u8; BLOCK_COUNT];
        reader.read_exact(&mut blocks)?;
        let mut metadata = vec![0u8; NIBBLE_COUNT];
        reader.read_exact(&mut metadata)?;
        let mut block_light = vec![0u8; NIBBLE_COUNT];
        reader.read_exact(&mut block_light)?;
        let mut sky_light = vec![0u8; NIBBLE_COUNT];
        reader.read_exact(&mut sky_light)?;
        Ok(Self {
            blocks,
            metadata,
            block_light,
            sky_light,
        })
    }

    fn index(x: i32, y: i32, z: i32) -> Option<usize> {
        if !(0..SIZE_X).contains(&x) || !(0..SIZE_Y).contains(&y) || !(0..SIZE_Z).contains(&z) {
            return None;
        }
        Some((y + z * SIZE_Y + x * SIZE_Y * SIZE_Z) as usize)
    }

    /// Block id at column-local coordinates, if in bounds.
    pub fn block_at(&self, x: i32, y: i32, z: i32) -> Option<u8> {
        Self::index(x, y, z).map(|i| self.blocks[i])
    }

    /// Writes a block id and its metadata nibble. Returns false when the
    /// coordinates fall outside the column.
    pub fn set_block(&mut self, x: i32, y: i32, z: i32, id: u8, meta: u8) -> bool {
        let Some(i) = Self::index(x, y, z) else {
            return false;
        };
        self.blocks[i] = id;
        set_nibble(&mut self.metadata, i, meta);
        true
    }

    /// The concatenated arrays, as the map-chunk packet wants them.
    pub fn to_wire(&self) -> ChunkPayload {
        let mut out = Vec::with_capacity(PAYLOAD_LEN);
        out.extend_from_slice(&self.blocks);
        out.extend_from_slice(&self.metadata);
        out.extend_from_slice(&self.block_light);
        out.extend_from_slice(&self.sky_light);
        ChunkPayload(out)
    }
}

fn set_nibble(arr: &mut [u8], index: usize, value: u8) {
    let byte = &mut arr[index / 2];
    if index % 2 == 0 {
        *byte = (*byte & 0xF0) | (value & 0x0F);
    } else {
        *byte = (*byte & 0x0F) | (value << 4);
    }
}

/// State owned by a chunk's work stream. Neighbour slots are weak handles
/// resolved through the chunk-manager map, so cross-links never form
/// ownership cycles.
pub struct ChunkState {
    pub data: ChunkData,
    neighbours: [Option<Weak<Chunk>>; 4],
}

impl ChunkState {
    pub fn neighbour(&self, side: Side) -> Option<Arc<Chunk>> {
        self.neighbours[side.index()].as_ref()?.upgrade()
    }

    pub fn set_neighbour(&mut self, side: Side, chunk: &Arc<Chunk>) {
        self.neighbours[side.index()] = Some(Arc::downgrade(chunk));
    }
}

/// One loaded column: its coordinate plus the work stream owning its voxels.
pub struct Chunk {
    pub coord: ChunkXz,
    work: actor::Handle<ChunkState>,
}

impl Chunk {
    pub fn new(coord: ChunkXz, data: ChunkData) -> Arc<Chunk> {
        let work = actor::spawn(
            &format!("chunk ({}, {})", coord.x, coord.z),
            ChunkState {
                data,
                neighbours: Default::default(),
            },
        );
        Arc::new(Chunk { coord, work })
    }

    /// Enqueues a mutation into this chunk's work stream.
    pub fn submit(&self, work: impl FnOnce(&mut ChunkState) + Send + 'static) -> Result<(), Stopped> {
        self.work.submit(work)
    }

    /// Runs a read against this chunk's state and returns the result.
    pub async fn query<R, F>(&self, f: F) -> Result<R, Stopped>
    where
        F: FnOnce(&mut ChunkState) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.work.query(f).await
    }

    /// Snapshot of this column as a map-chunk packet.
    pub async fn map_chunk(&self) -> Result<MapChunk, Stopped> {
        let coord = self.coord;
        self.query(move |state| MapChunk {
            x: coord.x * SIZE_X,
            y: 0,
            z: coord.z * SIZE_Z,
            size_x: (SIZE_X - 1) as u8,
            size_y: (SIZE_Y - 1) as u8,
            size_z: (SIZE_Z - 1) as u8,
            payload: state.data.to_wire(),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn blank_data() -> ChunkData {
        ChunkData::from_reader(&mut Cursor::new(vec![0u8; PAYLOAD_LEN])).unwrap()
    }

    #[test]
    fn key_packs_both_coordinates() {
        assert_eq!(ChunkXz { x: 0, z: 0 }.key(), 0);
        assert_eq!(ChunkXz { x: 1, z: 2 }.key(), (1 << 32) | 2);
        assert_eq!(ChunkXz { x: -1, z: -1 }.key(), u64::MAX);
        assert_ne!(
            ChunkXz { x: -1, z: 0 }.key(),
            ChunkXz { x: 0, z: -1 }.key()
        );
    }

    #[test]
    fn of_position_floors_toward_negative_infinity() {
        assert_eq!(ChunkXz::of_position(8.5, 8.5), ChunkXz { x: 0, z: 0 });
        assert_eq!(ChunkXz::of_position(-0.1, 16.0), ChunkXz { x: -1, z: 1 });
        assert_eq!(ChunkXz::of_block(-1, -16), ChunkXz { x: -1, z: -1 });
        assert_eq!(ChunkXz::of_block(-17, 31), ChunkXz { x: -2, z: 1 });
    }

    #[test]
    fn sides_are_symmetric() {
        for side in Side::ALL {
            assert_eq!(side.opposite().opposite(), side);
            let (dx, dz) = side.delta();
            let (ox, oz) = side.opposite().delta();
            assert_eq!((dx + ox, dz + oz), (0, 0));
        }
    }

    #[test]
    fn set_block_round_trips_and_checks_bounds() {
        let mut data = blank_data();
        assert!(data.set_block(8, 64, 8, 4, 0));
        assert_eq!(data.block_at(8, 64, 8), Some(4));
        assert_eq!(data.block_at(8, 63, 8), Some(0));
        assert!(!data.set_block(16, 0, 0, 1, 0));
        assert!(!data.set_block(0, 128, 0, 1, 0));
        assert!(!data.set_block(0, -1, 0, 1, 0));
        assert_eq!(data.block_at(-1, 0, 0), None);
    }

    #[test]
    fn wire_payload_concatenates_all_arrays() {
        let mut data = blank_data();
        data.set_block(0, 0, 0, 7, 3);
        let payload = data.to_wire();
        assert_eq!(payload.0.len(), PAYLOAD_LEN);
        assert_eq!(payload.0[0], 7);
        // metadata nibble for index 0 sits in the low half of its byte
        assert_eq!(payload.0[BLOCK_COUNT], 3);
    }
}
