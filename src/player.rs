//! Per-player session state and the post-login streaming sequence.

use crate::chunk::manager::ChunkManager;
use crate::chunk::ChunkXz;
use crate::game::{EntityId, Orientation, Position, START_POSITION};
use log::{debug, warn};
use protocol::packets::{
    ClientBound, PlayerPositionLook, PreChunk, Slot, SpawnPosition, WindowItems, WINDOW_ARMOUR,
    WINDOW_CRAFTING, WINDOW_MAIN,
};
use protocol::Serializable;
use tokio::sync::mpsc;

/// Offset between feet and eyes, the stance the client expects back.
pub const EYE_HEIGHT: f64 = 1.62;

/// Bounded transmit queue feeding one connection's writer task. Every slice
/// pushed is a whole packet stream, so the writer never splits a packet
/// across writes.
#[derive(Clone)]
pub struct TxQueue(mpsc::Sender<Vec<u8>>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushError {
    /// The queue is at capacity; the producer's overflow policy applies.
    Full,
    /// The writer task is gone.
    Closed,
}

impl TxQueue {
    pub fn new(depth: usize) -> (TxQueue, mpsc::Receiver<Vec<u8>>) {
        let (tx, rx) = mpsc::channel(depth);
        (TxQueue(tx), rx)
    }

    /// Non-blocking enqueue, for producers that must never stall — the game
    /// loop above all.
    pub fn try_push(&self, bytes: Vec<u8>) -> Result<(), PushError> {
        self.0.try_send(bytes).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => PushError::Full,
            mpsc::error::TrySendError::Closed(_) => PushError::Closed,
        })
    }

    /// Blocking enqueue. Only for tasks outside the game loop, which may
    /// wait for a slow client to drain.
    pub async fn push(&self, bytes: Vec<u8>) -> Result<(), PushError> {
        self.0.send(bytes).await.map_err(|_| PushError::Closed)
    }
}

/// Everything the game loop tracks per connection. All fields are mutated
/// on the loop only; other tasks reach the player through submitted work.
pub struct Player {
    pub id: EntityId,
    pub username: String,
    pub position: Position,
    pub orientation: Orientation,
    pub on_ground: bool,
    pub tx: TxQueue,
}

impl Player {
    pub fn new(id: EntityId, username: String, tx: TxQueue) -> Player {
        Player {
            id,
            username,
            position: START_POSITION,
            orientation: Orientation {
                yaw: 0.0,
                pitch: 0.0,
            },
            on_ground: false,
            tx,
        }
    }
}

/// Streams everything the client needs after login as one transmit slice:
/// the spawn point, the chunk window announcements and payloads, the empty
/// inventory, and last the authoritative position that releases the client
/// to move.
pub async fn stream_login_window(
    chunks: ChunkManager,
    radius: i32,
    id: EntityId,
    position: Position,
    orientation: Orientation,
    tx: TxQueue,
) {
    let mut buf = Vec::new();
    let center = ChunkXz::of_position(position.x, position.z);
    if let Err(e) = write_login_window(&mut buf, &chunks, radius, center, position, orientation).await
    {
        warn!("assembling login stream for entity {}: {}", id, e);
        return;
    }
    if tx.push(buf).await.is_err() {
        debug!("entity {} left before its login stream was queued", id);
    }
}

async fn write_login_window(
    buf: &mut Vec<u8>,
    chunks: &ChunkManager,
    radius: i32,
    center: ChunkXz,
    position: Position,
    orientation: Orientation,
) -> protocol::Result<()> {
    ClientBound::SpawnPosition(SpawnPosition {
        x: position.x.floor() as i32,
        y: position.y.floor() as i32,
        z: position.z.floor() as i32,
    })
    .to_writer(buf)?;

    // announce the whole window before any payload arrives, same order
    for cz in (center.z - radius)..=(center.z + radius) {
        for cx in (center.x - radius)..=(center.x + radius) {
            ClientBound::PreChunk(PreChunk {
                cx,
                cz,
                mode: true,
            })
            .to_writer(buf)?;
        }
    }

    for chunk in chunks.chunks_in_radius(center, radius).await {
        match chunk.map_chunk().await {
            Ok(packet) => {
                ClientBound::MapChunk(packet).to_writer(buf)?;
            }
            Err(_) => warn!(
                "chunk ({}, {}) stopped while being streamed",
                chunk.coord.x, chunk.coord.z
            ),
        }
    }

    for (window, size) in [
        (WINDOW_MAIN, 36),
        (WINDOW_ARMOUR, 4),
        (WINDOW_CRAFTING, 4),
    ] {
        ClientBound::WindowItems(WindowItems {
            window,
            slots: vec![Slot::EMPTY; size],
        })
        .to_writer(buf)?;
    }

    ClientBound::PlayerPositionLook(PlayerPositionLook {
        x: position.x,
        y: position.y,
        stance: position.y + EYE_HEIGHT,
        z: position.z,
        yaw: orientation.yaw,
        pitch: orientation.pitch,
        on_ground: false,
    })
    .to_writer(buf)?;

    Ok(())
}
