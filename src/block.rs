//! Static block attributes. Built once at startup and shared read-only;
//! any task may consult the table without going through the game loop.

use std::collections::HashMap;

pub const AIR: u8 = 0;
pub const STONE: u8 = 1;
pub const GRASS: u8 = 2;
pub const DIRT: u8 = 3;
pub const COBBLESTONE: u8 = 4;
pub const PLANKS: u8 = 5;
pub const BEDROCK: u8 = 7;
pub const SAND: u8 = 12;
pub const LOG: u8 = 17;
pub const GLASS: u8 = 20;
pub const TORCH: u8 = 50;

#[derive(Debug, Clone)]
pub struct BlockType {
    pub name: &'static str,
    pub solid: bool,
    /// 0 is fully transparent, 15 fully opaque.
    pub opacity: u8,
    /// Block id dropped when dug, if any.
    pub dropped: Option<u8>,
}

pub struct BlockTypeTable {
    types: HashMap<u8, BlockType>,
}

impl BlockTypeTable {
    /// The vanilla subset this server knows how to serve.
    pub fn standard() -> Self {
        let mut types = HashMap::new();
        let mut def = |id, name, solid, opacity, dropped| {
            types.insert(
                id,
                BlockType {
                    name,
                    solid,
                    opacity,
                    dropped,
                },
            );
        };
        def(AIR, "air", false, 0, None);
        def(STONE, "stone", true, 15, Some(COBBLESTONE));
        def(GRASS, "grass", true, 15, Some(DIRT));
        def(DIRT, "dirt", true, 15, Some(DIRT));
        def(COBBLESTONE, "cobblestone", true, 15, Some(COBBLESTONE));
        def(PLANKS, "planks", true, 15, Some(PLANKS));
        def(BEDROCK, "bedrock", true, 15, None);
        def(SAND, "sand", true, 15, Some(SAND));
        def(LOG, "log", true, 15, Some(LOG));
        def(GLASS, "glass", true, 0, None);
        def(TORCH, "torch", false, 0, Some(TORCH));
        Self { types }
    }

    pub fn get(&self, id: u8) -> Option<&BlockType> {
        self.types.get(&id)
    }

    pub fn is_solid(&self, id: u8) -> bool {
        self.types.get(&id).map_or(false, |t| t.solid)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
