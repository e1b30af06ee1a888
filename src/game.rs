//! The single-writer game loop. Every world mutation arrives here as a work
//! item; connection workers and the ticker only ever submit closures, so no
//! lock guards any of this state.

use crate::actor::{self, Stopped};
use crate::block;
use crate::chunk::manager::ChunkManager;
use crate::chunk::{ChunkXz, SIZE_X, SIZE_Z};
use crate::config::ServerConfig;
use crate::player::{stream_login_window, Player, PushError, TxQueue};
use log::{debug, error, info, warn};
use protocol::packets::{ClientBound, Disconnect, TimeUpdate};
use std::collections::HashMap;
use tokio::time::{interval, MissedTickBehavior};

pub type EntityId = i32;

/// World-unit position; `y` is the feet coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Yaw and pitch in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    pub yaw: f32,
    pub pitch: f32,
}

/// Where new players appear: on the grass of the flat world's origin chunk.
pub const START_POSITION: Position = Position {
    x: 8.5,
    y: 65.0,
    z: 8.5,
};

/// Digging status reported when the block actually broke.
const DIG_STATUS_BROKEN: i8 = 3;

pub struct GameState {
    next_entity_id: EntityId,
    players: HashMap<EntityId, Player>,
    time: i64,
    chunks: ChunkManager,
    config: ServerConfig,
}

/// Cloneable handle to the game loop.
#[derive(Clone)]
pub struct Game {
    work: actor::Handle<GameState>,
}

impl Game {
    /// Starts the game loop and its ticker.
    pub fn spawn(config: ServerConfig, chunks: ChunkManager) -> Game {
        let tick_period = config.tick_period;
        let state = GameState {
            next_entity_id: 1,
            players: HashMap::new(),
            time: 0,
            chunks,
            config,
        };
        let game = Game {
            work: actor::spawn("game loop", state),
        };

        let work = game.work.clone();
        tokio::spawn(async move {
            let mut timer = interval(tick_period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                timer.tick().await;
                if work.submit(GameState::tick).is_err() {
                    break;
                }
            }
        });

        game
    }

    /// Enqueues a work item onto the loop.
    pub fn submit(&self, work: impl FnOnce(&mut GameState) + Send + 'static) -> Result<(), Stopped> {
        self.work.submit(work)
    }

    /// Submits a work item and waits for its result.
    pub async fn query<R, F>(&self, f: F) -> Result<R, Stopped>
    where
        F: FnOnce(&mut GameState) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.work.query(f).await
    }

    /// Admits a logged-in player and returns the entity id the loop
    /// assigned. The login window starts streaming in the background.
    pub async fn add_player(&self, username: String, tx: TxQueue) -> Result<EntityId, Stopped> {
        self.query(move |game| game.add_player(username, tx)).await
    }

    pub async fn player_count(&self) -> usize {
        self.query(|game: &mut GameState| GameState::player_count(game)).await.unwrap_or(0)
    }

    /// Drains outstanding work, disconnects everyone, and stops the loop.
    /// Further submissions are rejected from this point on.
    pub fn stop(&self) {
        let _ = self.submit(GameState::shutdown);
        self.work.stop();
    }
}

impl GameState {
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// The last position the loop accepted for a player.
    pub fn player_position(&self, id: EntityId) -> Option<Position> {
        self.players.get(&id).map(|p| p.position)
    }

    /// One world tick: advance the clock, broadcast it to every player.
    pub(crate) fn tick(&mut self) {
        self.time += 1;
        let packet = match protocol::encode(&ClientBound::TimeUpdate(TimeUpdate {
            time: self.time,
        })) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("encoding time update: {}", e);
                return;
            }
        };

        let mut dead: Vec<(EntityId, &'static str)> = Vec::new();
        for (&id, player) in &self.players {
            match player.tx.try_push(packet.clone()) {
                Ok(()) => {}
                Err(PushError::Full) => dead.push((id, "overflow")),
                Err(PushError::Closed) => dead.push((id, "connection lost")),
            }
        }
        for (id, reason) in dead {
            self.remove_player(id, reason);
        }
    }

    fn add_player(&mut self, username: String, tx: TxQueue) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;

        let player = Player::new(id, username, tx);
        info!("{} joined as entity {}", player.username, id);

        tokio::spawn(stream_login_window(
            self.chunks.clone(),
            self.config.chunk_radius,
            id,
            player.position,
            player.orientation,
            player.tx.clone(),
        ));

        self.players.insert(id, player);
        id
    }

    /// Drops the player and closes their transmit queue, which lets the
    /// writer task drain and exit. Safe to call twice.
    pub(crate) fn remove_player(&mut self, id: EntityId, reason: &str) {
        let Some(player) = self.players.remove(&id) else {
            return;
        };
        info!("removing entity {} ({}): {}", id, player.username, reason);
        // best-effort farewell; the queue may be full or already closed
        if let Ok(bytes) = protocol::encode(&ClientBound::Disconnect(Disconnect {
            reason: reason.to_string(),
        })) {
            let _ = player.tx.try_push(bytes);
        }
    }

    pub(crate) fn handle_chat(&mut self, id: EntityId, message: String) {
        let Some(player) = self.players.get(&id) else {
            return;
        };
        // TODO: fan the message out to connected players
        info!("<{}> {}", player.username, message);
    }

    pub(crate) fn handle_flying(&mut self, id: EntityId, on_ground: bool) {
        if let Some(player) = self.players.get_mut(&id) {
            player.on_ground = on_ground;
        }
    }

    pub(crate) fn handle_position(
        &mut self,
        id: EntityId,
        x: f64,
        y: f64,
        stance: f64,
        z: f64,
        on_ground: bool,
    ) {
        if !stance_is_legal(y, stance) {
            warn!("entity {} sent stance {} at y {}", id, stance, y);
            self.remove_player(id, "illegal stance");
            return;
        }
        if let Some(player) = self.players.get_mut(&id) {
            player.position = Position { x, y, z };
            player.on_ground = on_ground;
            debug!("entity {} moved to ({:.2}, {:.2}, {:.2})", id, x, y, z);
        }
    }

    pub(crate) fn handle_look(&mut self, id: EntityId, yaw: f32, pitch: f32, on_ground: bool) {
        if let Some(player) = self.players.get_mut(&id) {
            player.orientation = Orientation {
                yaw: yaw.rem_euclid(360.0),
                pitch: pitch.clamp(-90.0, 90.0),
            };
            player.on_ground = on_ground;
        }
    }

    pub(crate) fn handle_position_look(
        &mut self,
        id: EntityId,
        x: f64,
        y: f64,
        stance: f64,
        z: f64,
        yaw: f32,
        pitch: f32,
        on_ground: bool,
    ) {
        self.handle_position(id, x, y, stance, z, on_ground);
        self.handle_look(id, yaw, pitch, on_ground);
    }

    pub(crate) fn handle_digging(
        &mut self,
        id: EntityId,
        status: i8,
        x: i32,
        y: i8,
        z: i32,
        face: i8,
    ) {
        if !(0..=4).contains(&status) || !(0..=5).contains(&face) {
            self.remove_player(id, "malformed dig");
            return;
        }
        debug!(
            "entity {} digging status={} at ({}, {}, {}) face={}",
            id, status, x, y, z, face
        );
        if status == DIG_STATUS_BROKEN {
            self.set_block(x, y as i32, z, block::AIR, 0);
        }
    }

    pub(crate) fn handle_placement(
        &mut self,
        id: EntityId,
        block_id: i16,
        x: i32,
        y: i8,
        z: i32,
        direction: i8,
    ) {
        // a -1 id is a bare item use against the block, nothing to place
        if block_id == -1 {
            return;
        }
        let Some(offset) = face_offset(direction) else {
            self.remove_player(id, "malformed block placement");
            return;
        };
        if !(0..=255).contains(&block_id) {
            debug!("entity {} placed non-block item {}", id, block_id);
            return;
        }
        let Some(block_type) = self.config.block_types.get(block_id as u8) else {
            warn!("entity {} placed unknown block id {}", id, block_id);
            return;
        };
        debug!(
            "entity {} placing {} against ({}, {}, {})",
            id, block_type.name, x, y, z
        );
        let (dx, dy, dz) = offset;
        self.set_block(x + dx, y as i32 + dy, z + dz, block_id as u8, 0);
    }

    /// Routes a block write into the owning chunk's work stream.
    fn set_block(&self, x: i32, y: i32, z: i32, id: u8, meta: u8) {
        let coord = ChunkXz::of_block(x, z);
        let chunks = self.chunks.clone();
        tokio::spawn(async move {
            let Some(chunk) = chunks.get(coord).await else {
                return;
            };
            let (lx, lz) = (x - coord.x * SIZE_X, z - coord.z * SIZE_Z);
            let _ = chunk.submit(move |state| {
                if !state.data.set_block(lx, y, lz, id, meta) {
                    warn!("block write out of bounds at ({}, {}, {})", x, y, z);
                }
            });
        });
    }

    /// Final work item of a shutdown: everyone out, then log what was loaded.
    fn shutdown(&mut self) {
        let ids: Vec<EntityId> = self.players.keys().copied().collect();
        for id in ids {
            self.remove_player(id, "server shutting down");
        }
        let chunks = self.chunks.clone();
        tokio::spawn(async move {
            info!(
                "{} chunks were active at shutdown",
                chunks.chunks_active().await.len()
            );
        });
    }
}

fn stance_is_legal(y: f64, stance: f64) -> bool {
    let eye = stance - y;
    eye > 0.1 && eye <= 1.65
}

/// Offset of the block touching the given face, 0 through 5 in the order
/// -Y, +Y, -Z, +Z, -X, +X.
fn face_offset(face: i8) -> Option<(i32, i32, i32)> {
    match face {
        0 => Some((0, -1, 0)),
        1 => Some((0, 1, 0)),
        2 => Some((0, 0, -1)),
        3 => Some((0, 0, 1)),
        4 => Some((-1, 0, 0)),
        5 => Some((1, 0, 0)),
        _ => None,
    }
}
