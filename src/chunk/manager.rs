//! Lazy chunk loading and lookup. The chunk map is owned by the manager's
//! own work stream, so loads are serialised: two racing `get` calls for the
//! same column hit the store at most once.

use super::store::ChunkStore;
use super::{Chunk, ChunkData, ChunkXz, Side};
use crate::actor;
use log::warn;
use std::collections::HashMap;
use std::sync::Arc;

struct ManagerState {
    store: Arc<dyn ChunkStore>,
    chunks: HashMap<u64, Arc<Chunk>>,
}

/// Cloneable handle to the chunk map.
#[derive(Clone)]
pub struct ChunkManager {
    work: actor::Handle<ManagerState>,
}

impl ChunkManager {
    pub fn new(store: Arc<dyn ChunkStore>) -> Self {
        ChunkManager {
            work: actor::spawn(
                "chunk manager",
                ManagerState {
                    store,
                    chunks: HashMap::new(),
                },
            ),
        }
    }

    /// The loaded chunk at `coord`, loading it on a miss. A load failure is
    /// logged and surfaces as `None`; it is never cached, so the next call
    /// retries.
    pub async fn get(&self, coord: ChunkXz) -> Option<Arc<Chunk>> {
        self.work
            .query(move |state| state.get(coord))
            .await
            .ok()
            .flatten()
    }

    /// Every currently loaded chunk, each exactly once, in unspecified
    /// order. The snapshot is consistent: it is taken inside the work stream
    /// that owns the map.
    pub async fn chunks_active(&self) -> Vec<Arc<Chunk>> {
        self.work
            .query(|state| state.chunks.values().cloned().collect())
            .await
            .unwrap_or_default()
    }

    /// Every chunk within `radius` of `center`, row-major in z then x,
    /// loading the missing ones. Columns whose load fails are skipped.
    pub async fn chunks_in_radius(&self, center: ChunkXz, radius: i32) -> Vec<Arc<Chunk>> {
        self.work
            .query(move |state| {
                let mut out = Vec::new();
                for z in (center.z - radius)..=(center.z + radius) {
                    for x in (center.x - radius)..=(center.x + radius) {
                        if let Some(chunk) = state.get(ChunkXz { x, z }) {
                            out.push(chunk);
                        }
                    }
                }
                out
            })
            .await
            .unwrap_or_default()
    }
}

impl ManagerState {
    fn get(&mut self, coord: ChunkXz) -> Option<Arc<Chunk>> {
        if let Some(chunk) = self.chunks.get(&coord.key()) {
            return Some(chunk.clone());
        }

        let mut reader = match self.store.load(coord.x, coord.z) {
            Ok(reader) => reader,
            Err(e) => {
                warn!("loading chunk ({}, {}): {}", coord.x, coord.z, e);
                return None;
            }
        };
        let data = match ChunkData::from_reader(&mut *reader) {
            Ok(data) => data,
            Err(e) => {
                warn!("reading chunk ({}, {}): {}", coord.x, coord.z, e);
                return None;
            }
        };

        let chunk = Chunk::new(coord, data);
        self.link_neighbours(&chunk);
        self.chunks.insert(coord.key(), chunk.clone());
        Some(chunk)
    }

    /// Wires both sides of every link through the affected chunks' own work
    /// streams; nothing here touches chunk state directly.
    fn link_neighbours(&self, chunk: &Arc<Chunk>) {
        for side in Side::ALL {
            let Some(neighbour) = self.chunks.get(&chunk.coord.offset(side).key()) else {
                continue;
            };
            let opposite = side.opposite();

            let link = neighbour.clone();
            let _ = chunk.submit(move |state| state.set_neighbour(side, &link));

            let link = chunk.clone();
            let _ = neighbour.submit(move |state| state.set_neighbour(opposite, &link));
        }
    }
}
