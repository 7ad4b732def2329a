//! Ground tile streaming around characters.
//!
//! Each tick the scheduler asks for a [`TileWindow`] around every character's
//! tick-start position and calls [`TileField::stream_window`], which creates
//! any missing tile in that window. [`TileField::evict_outside`] then removes
//! tiles that no current window covers, keeping memory bounded as characters
//! roam.

use glam::Vec3;
use hashbrown::{HashMap, HashSet};
use log::debug;

use crate::entity::{Entity, EntityId, GridCoord, GroundTile, TileMaterial};
use crate::numeric::{cell_origin, world_to_cell};
use crate::registry::{EntityRegistry, RegistryError};

/// Half-open rectangle of grid cells: `min` inclusive, `max_exclusive`
/// exclusive on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileWindow {
    /// First covered cell.
    pub min: GridCoord,
    /// One past the last covered cell on each axis.
    pub max_exclusive: GridCoord,
}

impl TileWindow {
    /// Whether `coord` lies inside the window.
    #[must_use]
    pub const fn contains(&self, coord: GridCoord) -> bool {
        coord.x >= self.min.x
            && coord.x < self.max_exclusive.x
            && coord.y >= self.min.y
            && coord.y < self.max_exclusive.y
    }

    /// Number of cells covered.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        let width = i64::from(self.max_exclusive.x) - i64::from(self.min.x);
        let depth = i64::from(self.max_exclusive.y) - i64::from(self.min.y);
        usize::try_from(width.max(0) * depth.max(0)).unwrap_or(usize::MAX)
    }

    /// Covered cells, column by column.
    pub fn coords(&self) -> impl Iterator<Item = GridCoord> {
        let (min, max) = (self.min, self.max_exclusive);
        (min.x..max.x).flat_map(move |x| (min.y..max.y).map(move |y| GridCoord::new(x, y)))
    }
}

/// Window of `tile_size * (2 * half_extent + 1)` world units centred on
/// `center`.
///
/// Both corners go through ceiling division by `tile_size`; the resulting
/// range is half-open.
///
/// ```
/// use glam::Vec3;
/// use shardfall::entity::GridCoord;
/// use shardfall::tiles::window_around;
///
/// let window = window_around(Vec3::ZERO, 10.0, 0.5);
/// assert_eq!(window.min, GridCoord::new(-1, -1));
/// assert_eq!(window.max_exclusive, GridCoord::new(1, 1));
/// ```
#[must_use]
pub fn window_around(center: Vec3, tile_size: f32, half_extent: f32) -> TileWindow {
    let half_span = tile_size * (2.0 * half_extent + 1.0) / 2.0;
    TileWindow {
        min: GridCoord::new(
            world_to_cell(center.x - half_span, tile_size),
            world_to_cell(center.z - half_span, tile_size),
        ),
        max_exclusive: GridCoord::new(
            world_to_cell(center.x + half_span, tile_size),
            world_to_cell(center.z + half_span, tile_size),
        ),
    }
}

/// World-space origin of the tile at `coord`.
#[must_use]
pub fn tile_origin(coord: GridCoord, tile_size: f32) -> Vec3 {
    Vec3::new(
        cell_origin(coord.x, tile_size),
        0.0,
        cell_origin(coord.y, tile_size),
    )
}

/// The streamed tiles of one simulation and their grid lookup.
///
/// `tiles` and `lookup` always hold the same ids; the entities themselves
/// live in the registry.
#[derive(Debug, Clone)]
pub struct TileField {
    tile_size: f32,
    half_extent: f32,
    tiles: Vec<EntityId>,
    lookup: HashMap<GridCoord, EntityId>,
}

impl TileField {
    /// Creates an empty field.
    #[must_use]
    pub fn new(tile_size: f32, half_extent: f32) -> Self {
        Self {
            tile_size,
            half_extent,
            tiles: Vec::new(),
            lookup: HashMap::new(),
        }
    }

    /// Window this field streams around `center`.
    #[must_use]
    pub fn window_for(&self, center: Vec3) -> TileWindow {
        window_around(center, self.tile_size, self.half_extent)
    }

    /// Tile ids in creation order.
    #[must_use]
    pub fn tiles(&self) -> &[EntityId] {
        &self.tiles
    }

    /// Grid coordinate to tile id lookup.
    #[must_use]
    pub const fn lookup(&self) -> &HashMap<GridCoord, EntityId> {
        &self.lookup
    }

    /// Tile at `coord`, if streamed.
    #[must_use]
    pub fn tile_at(&self, coord: GridCoord) -> Option<EntityId> {
        self.lookup.get(&coord).copied()
    }

    /// Number of live tiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether no tile is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Creates every tile of `window` that does not exist yet.
    ///
    /// Returns the number of tiles created. Re-streaming a covered window is
    /// a no-op.
    ///
    /// # Errors
    /// Propagates [`RegistryError`] if the registry rejects a new tile.
    pub fn stream_window(
        &mut self,
        registry: &mut EntityRegistry,
        window: &TileWindow,
    ) -> Result<usize, RegistryError> {
        let mut created = 0;
        for coord in window.coords() {
            if self.lookup.contains_key(&coord) {
                continue;
            }
            let id = registry.new_id();
            registry.insert(
                id,
                Entity::GroundTile(GroundTile {
                    id,
                    coord,
                    position: tile_origin(coord, self.tile_size),
                    blocked: false,
                    material: TileMaterial::for_coord(coord),
                }),
            )?;
            self.tiles.push(id);
            self.lookup.insert(coord, id);
            created += 1;
        }
        if created > 0 {
            debug!("streamed {created} tiles for window {window:?}");
        }
        Ok(created)
    }

    /// Removes the tile at `coord` from the field and the registry.
    pub fn remove_tile(
        &mut self,
        registry: &mut EntityRegistry,
        coord: GridCoord,
    ) -> Option<GroundTile> {
        let id = self.lookup.remove(&coord)?;
        self.tiles.retain(|tile| *tile != id);
        match registry.remove(id) {
            Some(Entity::GroundTile(tile)) => Some(tile),
            Some(Entity::Character(_)) | None => None,
        }
    }

    /// Removes every tile outside the union of `windows`.
    ///
    /// Returns the number of tiles removed.
    pub fn evict_outside(&mut self, registry: &mut EntityRegistry, windows: &[TileWindow]) -> usize {
        let mut evicted = HashSet::new();
        self.lookup.retain(|coord, id| {
            let keep = windows.iter().any(|window| window.contains(*coord));
            if !keep {
                registry.remove(*id);
                evicted.insert(*id);
            }
            keep
        });
        if evicted.is_empty() {
            return 0;
        }
        self.tiles.retain(|id| !evicted.contains(id));
        debug!("evicted {} tiles", evicted.len());
        evicted.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn field() -> TileField {
        TileField::new(10.0, 0.5)
    }

    #[rstest]
    #[case::origin(Vec3::ZERO, (-1, -1), (1, 1))]
    #[case::inside_cell(Vec3::new(4.0, 0.0, 4.0), (0, 0), (2, 2))]
    #[case::negative(Vec3::new(-25.0, 0.0, 0.0), (-3, -1), (-1, 1))]
    fn window_corners_use_ceiling_division(
        #[case] center: Vec3,
        #[case] min: (i32, i32),
        #[case] max: (i32, i32),
    ) {
        let window = window_around(center, 10.0, 0.5);
        assert_eq!(window.min, GridCoord::from(min));
        assert_eq!(window.max_exclusive, GridCoord::from(max));
        assert_eq!(window.cell_count(), 4);
    }

    #[rstest]
    fn window_contains_is_half_open() {
        let window = window_around(Vec3::ZERO, 10.0, 0.5);
        assert!(window.contains(GridCoord::new(-1, 0)));
        assert!(window.contains(GridCoord::new(0, -1)));
        assert!(!window.contains(GridCoord::new(1, 0)));
        assert!(!window.contains(GridCoord::new(0, -2)));
    }

    #[rstest]
    fn coords_are_column_major() {
        let window = TileWindow {
            min: GridCoord::new(0, 0),
            max_exclusive: GridCoord::new(2, 2),
        };
        let coords: Vec<_> = window.coords().collect();
        assert_eq!(
            coords,
            vec![
                GridCoord::new(0, 0),
                GridCoord::new(0, 1),
                GridCoord::new(1, 0),
                GridCoord::new(1, 1),
            ]
        );
    }

    #[rstest]
    fn streaming_creates_each_cell_once(mut field: TileField) {
        let mut registry = EntityRegistry::new();
        let window = field.window_for(Vec3::ZERO);
        assert_eq!(field.stream_window(&mut registry, &window), Ok(4));
        assert_eq!(field.stream_window(&mut registry, &window), Ok(0));
        assert_eq!(field.len(), 4);
        assert_eq!(registry.len(), 4);
        assert_eq!(field.lookup().len(), 4);
    }

    #[rstest]
    fn streamed_tile_sits_at_cell_origin(mut field: TileField) {
        let mut registry = EntityRegistry::new();
        let window = field.window_for(Vec3::ZERO);
        field.stream_window(&mut registry, &window).expect("stream");
        let id = field.tile_at(GridCoord::new(-1, 0)).expect("tile present");
        let tile = registry
            .get(id)
            .and_then(Entity::as_ground_tile)
            .expect("ground tile");
        assert_eq!(tile.position, Vec3::new(-10.0, 0.0, 0.0));
        assert!(!tile.blocked);
        assert_eq!(tile.material, TileMaterial::Dark);
    }

    #[rstest]
    fn eviction_keeps_union_of_windows(mut field: TileField) {
        let mut registry = EntityRegistry::new();
        let here = field.window_for(Vec3::ZERO);
        let there = field.window_for(Vec3::new(40.0, 0.0, 0.0));
        field.stream_window(&mut registry, &here).expect("stream");
        field.stream_window(&mut registry, &there).expect("stream");
        assert_eq!(field.len(), 8);

        assert_eq!(field.evict_outside(&mut registry, &[here, there]), 0);
        assert_eq!(field.evict_outside(&mut registry, &[there]), 4);
        assert_eq!(field.len(), 4);
        assert_eq!(registry.len(), 4);
        assert!(field.tiles().iter().all(|id| registry.contains(*id)));
        assert!(field.tile_at(GridCoord::new(0, 0)).is_none());
    }

    #[rstest]
    fn remove_tile_clears_every_index(mut field: TileField) {
        let mut registry = EntityRegistry::new();
        let window = field.window_for(Vec3::ZERO);
        field.stream_window(&mut registry, &window).expect("stream");
        let removed = field
            .remove_tile(&mut registry, GridCoord::new(0, 0))
            .expect("tile removed");
        assert_eq!(removed.coord, GridCoord::new(0, 0));
        assert!(!registry.contains(removed.id));
        assert!(!field.tiles().contains(&removed.id));
        assert!(field.remove_tile(&mut registry, GridCoord::new(0, 0)).is_none());
    }

    #[rstest]
    fn re_streamed_tiles_get_fresh_ids(mut field: TileField) {
        let mut registry = EntityRegistry::new();
        let window = field.window_for(Vec3::ZERO);
        field.stream_window(&mut registry, &window).expect("stream");
        let old = field.tile_at(GridCoord::new(0, 0)).expect("tile");
        field.evict_outside(&mut registry, &[]);
        field.stream_window(&mut registry, &window).expect("stream");
        let new = field.tile_at(GridCoord::new(0, 0)).expect("tile");
        assert!(new > old);
    }
}
