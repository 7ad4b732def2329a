//! Entity identities and the closed set of entity variants.
//!
//! Every simulated object is an [`Entity`] owned by the
//! [`EntityRegistry`](crate::registry::EntityRegistry). Adding a new kind of
//! entity means adding a variant here, which every exhaustive `match` in the
//! scheduler and the presentation layer then has to handle.

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::ability::{Ability, ShardSpell};
use crate::config::SimConfig;
use crate::kinematics::MovableObject;

/// Process-unique entity identifier. `0` is never allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Returns the raw identifier value.
    #[must_use]
    pub const fn into_inner(self) -> u64 {
        self.0
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Integer cell coordinate in the ground-tile grid.
///
/// `y` indexes the world Z axis; the grid lies in the horizontal plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridCoord {
    /// Column along world X.
    pub x: i32,
    /// Row along world Z.
    pub y: i32,
}

impl GridCoord {
    /// Creates a grid coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for GridCoord {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// Discriminant of an [`Entity`], used for diffing and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A controllable actor.
    Character,
    /// A streamed terrain cell.
    GroundTile,
}

/// Surface tag carried by a ground tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileMaterial {
    /// Tiles whose coordinate sum is even.
    Light,
    /// Tiles whose coordinate sum is odd.
    Dark,
}

impl TileMaterial {
    /// Checkerboard material for a grid coordinate.
    #[must_use]
    pub const fn for_coord(coord: GridCoord) -> Self {
        if (coord.x.wrapping_add(coord.y)) & 1 == 0 {
            Self::Light
        } else {
            Self::Dark
        }
    }
}

/// A controllable actor with mana and an ordered list of abilities.
#[derive(Debug)]
pub struct Character {
    /// Identity allocated by the registry.
    pub id: EntityId,
    /// Position, destination and orientation state.
    pub motion: MovableObject,
    /// Resource spent by abilities.
    pub mana: f32,
    /// Equipped abilities, addressed by index from `Ability` commands.
    pub abilities: Vec<Box<dyn Ability>>,
}

impl Character {
    /// Creates a character at the origin with no abilities.
    #[must_use]
    pub fn new(id: EntityId, speed: f32, mana: f32) -> Self {
        Self {
            id,
            motion: MovableObject::new(Vec3::ZERO, speed),
            mana,
            abilities: Vec::new(),
        }
    }

    /// Creates a character from configuration, equipped with one
    /// [`ShardSpell`].
    #[must_use]
    pub fn spawn(id: EntityId, config: &SimConfig) -> Self {
        Self::new(id, config.character_speed, config.starting_mana)
            .with_ability(Box::new(ShardSpell::default()))
    }

    /// Appends an ability to the equipped list.
    #[must_use]
    pub fn with_ability(mut self, ability: Box<dyn Ability>) -> Self {
        self.abilities.push(ability);
        self
    }

    /// Places the character at `position`, clearing any movement.
    #[must_use]
    pub fn at(mut self, position: Vec3) -> Self {
        self.motion.position = position;
        self.motion.stop();
        self
    }
}

/// A terrain cell created by tile streaming. Tiles never move.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroundTile {
    /// Identity allocated by the registry.
    pub id: EntityId,
    /// Grid cell this tile occupies.
    pub coord: GridCoord,
    /// World-space origin of the tile.
    pub position: Vec3,
    /// Whether the cell blocks movement. Always `false` for streamed tiles.
    pub blocked: bool,
    /// Surface tag used by the display.
    pub material: TileMaterial,
}

/// Closed set of simulated entities.
#[derive(Debug)]
pub enum Entity {
    /// See [`Character`].
    Character(Character),
    /// See [`GroundTile`].
    GroundTile(GroundTile),
}

impl Entity {
    /// Identity of the wrapped entity.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        match self {
            Self::Character(character) => character.id,
            Self::GroundTile(tile) => tile.id,
        }
    }

    /// Kind of the wrapped entity.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Character(_) => EntityKind::Character,
            Self::GroundTile(_) => EntityKind::GroundTile,
        }
    }

    /// Authoritative world position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        match self {
            Self::Character(character) => character.motion.position,
            Self::GroundTile(tile) => tile.position,
        }
    }

    /// Borrows the character, if this is one.
    #[must_use]
    pub const fn as_character(&self) -> Option<&Character> {
        match self {
            Self::Character(character) => Some(character),
            Self::GroundTile(_) => None,
        }
    }

    /// Mutably borrows the character, if this is one.
    pub fn as_character_mut(&mut self) -> Option<&mut Character> {
        match self {
            Self::Character(character) => Some(character),
            Self::GroundTile(_) => None,
        }
    }

    /// Borrows the ground tile, if this is one.
    #[must_use]
    pub const fn as_ground_tile(&self) -> Option<&GroundTile> {
        match self {
            Self::GroundTile(tile) => Some(tile),
            Self::Character(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(GridCoord::new(0, 0), TileMaterial::Light)]
    #[case(GridCoord::new(1, 0), TileMaterial::Dark)]
    #[case(GridCoord::new(-1, 0), TileMaterial::Dark)]
    #[case(GridCoord::new(-1, -1), TileMaterial::Light)]
    fn checkerboard_material(#[case] coord: GridCoord, #[case] expected: TileMaterial) {
        assert_eq!(TileMaterial::for_coord(coord), expected);
    }

    #[rstest]
    fn spawned_character_carries_one_ability() {
        let config = SimConfig::default();
        let character = Character::spawn(EntityId(7), &config);
        assert_eq!(character.abilities.len(), 1);
        assert!(!character.motion.moving);
        approx::assert_relative_eq!(character.motion.speed, config.character_speed);
        approx::assert_relative_eq!(character.mana, config.starting_mana);
    }

    #[rstest]
    fn entity_accessors_follow_variant() {
        let tile = Entity::GroundTile(GroundTile {
            id: EntityId(3),
            coord: GridCoord::new(1, 2),
            position: Vec3::new(10.0, 0.0, 20.0),
            blocked: false,
            material: TileMaterial::Dark,
        });
        assert_eq!(tile.id(), EntityId(3));
        assert_eq!(tile.kind(), EntityKind::GroundTile);
        assert_eq!(tile.position(), Vec3::new(10.0, 0.0, 20.0));
        assert!(tile.as_character().is_none());
        assert!(tile.as_ground_tile().is_some());
    }

    #[rstest]
    fn entity_id_displays_with_hash() {
        assert_eq!(EntityId(42).to_string(), "#42");
        assert_eq!(EntityId::from(9).into_inner(), 9);
    }
}
