//! Serialisable read-only view of the world.
//!
//! Snapshots sort every entity by id so two runs fed the same inputs produce
//! equal values (and byte-identical JSON).

use glam::{Quat, Vec3};
use serde::Serialize;

use crate::entity::{Entity, EntityId, GridCoord, TileMaterial};
use crate::game_state::GameState;

/// Character state at the last tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacterSnapshot {
    /// Character id.
    pub id: EntityId,
    /// Authoritative position.
    pub position: Vec3,
    /// Travel destination; equals `position` when idle.
    pub destination: Vec3,
    /// Facing.
    pub rotation: Quat,
    /// Whether the character is travelling.
    pub moving: bool,
    /// Remaining mana.
    pub mana: f32,
}

/// Ground tile state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileSnapshot {
    /// Tile id.
    pub id: EntityId,
    /// Grid cell.
    pub coord: GridCoord,
    /// World-space origin.
    pub position: Vec3,
    /// Surface tag.
    pub material: TileMaterial,
}

/// Whole-world snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldSnapshot {
    /// Ticks run so far.
    pub frame: u64,
    /// Simulated seconds.
    pub time: f64,
    /// Seconds since the last tick.
    pub time_since_tick: f32,
    /// Characters sorted by id.
    pub characters: Vec<CharacterSnapshot>,
    /// Ground tiles sorted by id.
    pub tiles: Vec<TileSnapshot>,
}

impl WorldSnapshot {
    /// Captures the current state of `state`.
    #[must_use]
    pub fn capture(state: &GameState) -> Self {
        let mut characters = Vec::new();
        let mut tiles = Vec::new();
        for (id, entity) in state.registry().iter() {
            match entity {
                Entity::Character(character) => characters.push(CharacterSnapshot {
                    id,
                    position: character.motion.position,
                    destination: character.motion.destination,
                    rotation: character.motion.rotation,
                    moving: character.motion.moving,
                    mana: character.mana,
                }),
                Entity::GroundTile(tile) => tiles.push(TileSnapshot {
                    id,
                    coord: tile.coord,
                    position: tile.position,
                    material: tile.material,
                }),
            }
        }
        characters.sort_by_key(|c| c.id);
        tiles.sort_by_key(|t| t.id);
        Self {
            frame: state.frame(),
            time: state.time(),
            time_since_tick: state.time_since_tick(),
            characters,
            tiles,
        }
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    /// Propagates serialisation failures from `serde_json`.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl From<&GameState> for WorldSnapshot {
    fn from(state: &GameState) -> Self {
        Self::capture(state)
    }
}
