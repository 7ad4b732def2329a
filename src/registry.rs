//! Entity identity allocation and the id-to-entity map.
//!
//! Ids are allocated monotonically from 1 and never reused, even after an
//! entity is removed. The registry is the sole owner of every entity; the
//! character and tile lists kept by the scheduler only hold ids.

use hashbrown::HashMap;
use thiserror::Error;

use crate::entity::{Character, Entity, EntityId};

/// Invariant violations detected by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// An entity was inserted under an id already present.
    #[error("entity {0} is already registered")]
    DuplicateId(EntityId),
    /// An entity was inserted under an id other than its own.
    #[error("entity {entity} inserted under mismatched id {key}")]
    MismatchedId {
        /// Id used as the map key.
        key: EntityId,
        /// Id carried by the entity.
        entity: EntityId,
    },
}

/// Owns every entity of one simulation instance.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    last_id: u64,
    entities: HashMap<EntityId, Entity>,
}

impl EntityRegistry {
    /// Creates an empty registry whose first id will be `1`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next id.
    ///
    /// ```
    /// use shardfall::registry::EntityRegistry;
    /// let mut registry = EntityRegistry::new();
    /// assert_eq!(registry.new_id().into_inner(), 1);
    /// assert_eq!(registry.new_id().into_inner(), 2);
    /// ```
    pub fn new_id(&mut self) -> EntityId {
        self.last_id += 1;
        EntityId(self.last_id)
    }

    /// Registers `entity` under `id`.
    ///
    /// # Errors
    /// Returns [`RegistryError::DuplicateId`] if `id` is taken and
    /// [`RegistryError::MismatchedId`] if `entity` carries a different id.
    pub fn insert(&mut self, id: EntityId, entity: Entity) -> Result<(), RegistryError> {
        if entity.id() != id {
            return Err(RegistryError::MismatchedId {
                key: id,
                entity: entity.id(),
            });
        }
        if self.entities.contains_key(&id) {
            return Err(RegistryError::DuplicateId(id));
        }
        self.entities.insert(id, entity);
        Ok(())
    }

    /// Removes and returns the entity registered under `id`.
    ///
    /// The id stays retired.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    /// Looks up an entity.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Looks up an entity mutably.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Looks up a character.
    #[must_use]
    pub fn character(&self, id: EntityId) -> Option<&Character> {
        self.get(id).and_then(Entity::as_character)
    }

    /// Looks up a character mutably.
    pub fn character_mut(&mut self, id: EntityId) -> Option<&mut Character> {
        self.get_mut(id).and_then(Entity::as_character_mut)
    }

    /// Whether `id` is registered.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Number of registered entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the registry holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterates over every registered entity in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities.iter().map(|(id, entity)| (*id, entity))
    }

    /// Highest id handed out so far.
    #[must_use]
    pub const fn last_id(&self) -> EntityId {
        EntityId(self.last_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{GridCoord, GroundTile, TileMaterial};
    use glam::Vec3;
    use rstest::rstest;

    fn tile(id: EntityId) -> Entity {
        Entity::GroundTile(GroundTile {
            id,
            coord: GridCoord::new(0, 0),
            position: Vec3::ZERO,
            blocked: false,
            material: TileMaterial::Light,
        })
    }

    #[rstest]
    fn ids_start_at_one_and_increase() {
        let mut registry = EntityRegistry::new();
        let ids: Vec<u64> = (0..4).map(|_| registry.new_id().into_inner()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(registry.last_id(), EntityId(4));
    }

    #[rstest]
    fn duplicate_insert_is_rejected() {
        let mut registry = EntityRegistry::new();
        let id = registry.new_id();
        registry.insert(id, tile(id)).expect("first insert");
        assert_eq!(
            registry.insert(id, tile(id)),
            Err(RegistryError::DuplicateId(id))
        );
        assert_eq!(registry.len(), 1);
    }

    #[rstest]
    fn mismatched_insert_is_rejected() {
        let mut registry = EntityRegistry::new();
        let id = registry.new_id();
        let result = registry.insert(id, tile(EntityId(99)));
        assert!(matches!(result, Err(RegistryError::MismatchedId { .. })));
        assert!(registry.is_empty());
    }

    #[rstest]
    fn removed_ids_are_not_reused() {
        let mut registry = EntityRegistry::new();
        let first = registry.new_id();
        registry.insert(first, tile(first)).expect("insert");
        assert!(registry.remove(first).is_some());
        assert!(!registry.contains(first));
        assert_eq!(registry.new_id(), EntityId(2));
    }

    #[rstest]
    fn character_lookup_filters_tiles() {
        let mut registry = EntityRegistry::new();
        let id = registry.new_id();
        registry.insert(id, tile(id)).expect("insert");
        assert!(registry.get(id).is_some());
        assert!(registry.character(id).is_none());
        assert!(registry.character_mut(id).is_none());
    }
}
