//! Packet bodies and the opcode tables for both directions.

use crate::{Deserializable, Result, Serializable};
use std::io::{Read, Write};

pub use crate::chunk_payload::{payload_len, ChunkPayload};
pub use crate::window_items::Slot;

/// The client protocol generation this server speaks.
pub const PROTOCOL_VERSION: i32 = 14;

/// The player's main 36-slot inventory.
pub const WINDOW_MAIN: i32 = -1;
/// The four crafting-grid slots.
pub const WINDOW_CRAFTING: i32 = -2;
/// The four armour slots.
pub const WINDOW_ARMOUR: i32 = -3;

/// Keep-alives carry no body at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlive;

impl Serializable for KeepAlive {
    fn to_writer<W: Write>(&self, _output: &mut W) -> Result<usize> {
        Ok(0)
    }
}

impl Deserializable for KeepAlive {
    fn from_reader<R: Read>(_input: &mut R) -> Result<Self> {
        Ok(KeepAlive)
    }
}

packet! {
    /// Client credentials and protocol generation, sent after the handshake.
    LoginRequest {
        protocol_version: i32,
        username: String,
        map_seed: i64,
        dimension: i8,
    }
}

packet! {
    /// Admission reply; `entity_id` is the identity the game assigned.
    LoginResponse {
        entity_id: i32,
        server_name: String,
        map_seed: i64,
        dimension: i8,
    }
}

packet! {
    /// First packet of a connection.
    Handshake {
        username: String,
    }
}

packet! {
    /// Server handshake reply; a hash of `"-"` selects offline mode.
    HandshakeReply {
        connection_hash: String,
    }
}

packet! {
    ChatMessage {
        message: String,
    }
}

packet! {
    /// World clock broadcast, in ticks.
    TimeUpdate {
        time: i64,
    }
}

packet! {
    /// Where beds point compasses; block coordinates.
    SpawnPosition {
        x: i32,
        y: i32,
        z: i32,
    }
}

packet! {
    Flying {
        on_ground: bool,
    }
}

packet! {
    /// Feet position plus the eye-height `stance`, which is validated
    /// against `y` but never stored.
    PlayerPosition {
        x: f64,
        y: f64,
        stance: f64,
        z: f64,
        on_ground: bool,
    }
}

packet! {
    PlayerLook {
        yaw: f32,
        pitch: f32,
        on_ground: bool,
    }
}

packet! {
    PlayerPositionLook {
        x: f64,
        y: f64,
        stance: f64,
        z: f64,
        yaw: f32,
        pitch: f32,
        on_ground: bool,
    }
}

packet! {
    PlayerDigging {
        status: i8,
        x: i32,
        y: i8,
        z: i32,
        face: i8,
    }
}

packet! {
    PlayerBlockPlacement {
        block_id: i16,
        x: i32,
        y: i8,
        z: i32,
        direction: i8,
    }
}

packet! {
    /// Announces a column before its payload arrives; `mode` false tells the
    /// client to unload it instead.
    PreChunk {
        cx: i32,
        cz: i32,
        mode: bool,
    }
}

/// A column's voxel payload. `x`/`z` are block coordinates of the column
/// origin; the sizes are extents minus one. Codec lives in `chunk_payload`.
#[derive(Debug, Clone, PartialEq)]
pub struct MapChunk {
    pub x: i32,
    pub y: i16,
    pub z: i32,
    pub size_x: u8,
    pub size_y: u8,
    pub size_z: u8,
    pub payload: ChunkPayload,
}

/// An inventory window snapshot. Codec lives in `window_items`.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowItems {
    pub window: i32,
    pub slots: Vec<Slot>,
}

packet! {
    Disconnect {
        reason: String,
    }
}

packet_enum! {
    /// Everything a client may send.
    ServerBound {
        0x00 => KeepAlive(KeepAlive),
        0x01 => Login(LoginRequest),
        0x02 => Handshake(Handshake),
        0x03 => ChatMessage(ChatMessage),
        0x0A => Flying(Flying),
        0x0B => PlayerPosition(PlayerPosition),
        0x0C => PlayerLook(PlayerLook),
        0x0D => PlayerPositionLook(PlayerPositionLook),
        0x0E => PlayerDigging(PlayerDigging),
        0x0F => PlayerBlockPlacement(PlayerBlockPlacement),
        0xFF => Disconnect(Disconnect),
    }
}

packet_enum! {
    /// Everything the server may send.
    ClientBound {
        0x00 => KeepAlive(KeepAlive),
        0x01 => Login(LoginResponse),
        0x02 => Handshake(HandshakeReply),
        0x03 => ChatMessage(ChatMessage),
        0x04 => TimeUpdate(TimeUpdate),
        0x05 => WindowItems(WindowItems),
        0x06 => SpawnPosition(SpawnPosition),
        0x0D => PlayerPositionLook(PlayerPositionLook),
        0x32 => PreChunk(PreChunk),
        0x33 => MapChunk(MapChunk),
        0xFF => Disconnect(Disconnect),
    }
}
