use crate::block::BlockTypeTable;
use crate::chunk::store::ChunkStore;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// World ticks 20 times a second.
pub const TICK_PERIOD: Duration = Duration::from_millis(50);

/// Half-side of the chunk window streamed around every player.
pub const CHUNK_RADIUS: i32 = 10;

/// Slices the per-connection transmit queue holds before the overflow
/// policy kicks in.
pub const TX_QUEUE_DEPTH: usize = 128;

/// Pre-built configuration record the server core runs from. CLI and
/// environment parsing happen in `main`, not here.
#[derive(Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub tick_period: Duration,
    pub chunk_radius: i32,
    pub tx_queue_depth: usize,
    pub store: Arc<dyn ChunkStore>,
    pub block_types: Arc<BlockTypeTable>,
}

impl ServerConfig {
    pub fn new(
        addr: SocketAddr,
        store: Arc<dyn ChunkStore>,
        block_types: Arc<BlockTypeTable>,
    ) -> Self {
        Self {
            addr,
            tick_period: TICK_PERIOD,
            chunk_radius: CHUNK_RADIUS,
            tx_queue_depth: TX_QUEUE_DEPTH,
            store,
            block_types,
        }
    }
}
