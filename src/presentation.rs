//! Display-side bookkeeping for the simulation.
//!
//! The presentation layer never mutates the simulation. Once per frame the
//! runner hands it a [`FrameView`] of the world and an explicitly owned
//! [`RenderContext`]; a [`DisplaySink`] such as [`DisplayManager`] diffs the
//! entity map against its drawables, creating, updating and disposing them so
//! that exactly one drawable exists per live entity.
//!
//! Positions are extrapolated across the fractional time since the last tick
//! and rotations are smoothed at a fixed angular speed, so motion on screen
//! stays fluid no matter how coarse the tick rate is.

use glam::{Quat, Vec3};
use hashbrown::HashMap;
use log::debug;

use crate::config::SimConfig;
use crate::constants::RUN_CYCLE_SECONDS;
use crate::entity::{Character, Entity, EntityId, EntityKind, GridCoord, GroundTile, TileMaterial};
use crate::game_state::GameState;
use crate::kinematics::RotationSmoother;
use crate::registry::EntityRegistry;

/// Ground covered by one run animation cycle, in world units.
const RUN_CYCLE_STRIDE: f32 = 0.25;

/// Display settings and camera state owned by whoever composes the frame.
///
/// The context is created once and passed to the display sink every frame;
/// nothing about it is process-global.
///
/// # Examples
///
/// ```
/// use shardfall::config::SimConfig;
/// use shardfall::presentation::RenderContext;
///
/// let context = RenderContext::from_config(&SimConfig::default());
/// assert!(context.follow_target().is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RenderContext {
    /// Angular speed of displayed rotations, degrees per second.
    pub turn_speed_degrees: f32,
    /// Seconds the run animation takes to loop once.
    pub run_cycle_seconds: f32,
    follow_target: Option<EntityId>,
}

impl RenderContext {
    /// Creates a context with no camera target.
    #[must_use]
    pub const fn new(turn_speed_degrees: f32, run_cycle_seconds: f32) -> Self {
        Self {
            turn_speed_degrees,
            run_cycle_seconds,
            follow_target: None,
        }
    }

    /// Creates a context using the configured turn speed.
    #[must_use]
    pub const fn from_config(config: &SimConfig) -> Self {
        Self::new(config.turn_speed_degrees, RUN_CYCLE_SECONDS)
    }

    /// Entity the camera follows.
    #[must_use]
    pub const fn follow_target(&self) -> Option<EntityId> {
        self.follow_target
    }

    /// Points the camera at `target`.
    pub fn set_follow_target(&mut self, target: Option<EntityId>) {
        self.follow_target = target;
    }

    /// Playback rate of the run animation for a character moving at `speed`.
    #[must_use]
    pub fn run_animation_rate(&self, speed: f32) -> f32 {
        if self.run_cycle_seconds > 0.0 {
            speed * RUN_CYCLE_STRIDE / self.run_cycle_seconds
        } else {
            0.0
        }
    }
}

/// Read-only view of the world handed to the display once per frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    /// Every entity, for create and dispose diffing.
    pub registry: &'a EntityRegistry,
    /// Character ids in spawn order.
    pub characters: &'a [EntityId],
    /// Ground tile ids in creation order.
    pub ground_tiles: &'a [EntityId],
    /// Grid lookup of ground tiles.
    pub tile_lookup: &'a HashMap<GridCoord, EntityId>,
    /// Seconds since the last tick, for position extrapolation.
    pub time_since_tick: f32,
    /// Wall-clock seconds since the previous frame, for rotation smoothing.
    pub wall_elapsed: f32,
    /// Frame counter, diagnostic only.
    pub frame: u64,
    /// Locally controlled character.
    pub local_player: Option<EntityId>,
}

impl<'a> FrameView<'a> {
    /// Builds the view of `state` after a step of `wall_elapsed` seconds.
    #[must_use]
    pub fn new(state: &'a GameState, wall_elapsed: f32, local_player: Option<EntityId>) -> Self {
        Self {
            registry: state.registry(),
            characters: state.characters(),
            ground_tiles: state.ground_tiles(),
            tile_lookup: state.tile_lookup(),
            time_since_tick: state.time_since_tick(),
            wall_elapsed,
            frame: state.frame(),
            local_player,
        }
    }
}

/// Counts reported by one refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    /// Drawables created for newly seen entities.
    pub created: usize,
    /// Drawables updated in place.
    pub updated: usize,
    /// Drawables disposed because their entity is gone.
    pub removed: usize,
    /// Drawables alive after the refresh.
    pub live: usize,
}

/// Anything that displays the world.
pub trait DisplaySink {
    /// Synchronises the display with `view`.
    fn refresh(&mut self, view: &FrameView<'_>, context: &mut RenderContext) -> RefreshStats;
}

/// Displayed state of a character.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterDrawable {
    /// Extrapolated position shown this frame.
    pub position: Vec3,
    /// Smoothed orientation shown this frame.
    pub rotation: Quat,
    /// Whether the shown position changed since last frame.
    pub moving: bool,
    /// Run animation playback rate.
    pub animation_rate: f32,
    smoother: RotationSmoother,
    last_seen: Vec3,
}

impl CharacterDrawable {
    fn new(context: &RenderContext) -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            moving: false,
            animation_rate: 0.0,
            smoother: RotationSmoother::new(context.turn_speed_degrees),
            last_seen: Vec3::ZERO,
        }
    }

    fn update(&mut self, character: &Character, view: &FrameView<'_>, context: &RenderContext) {
        let shown = character.motion.extrapolate_position(view.time_since_tick);
        self.rotation = self
            .smoother
            .advance(character.motion.rotation, view.wall_elapsed);
        self.moving = shown.distance(self.last_seen) > 0.0;
        self.animation_rate = context.run_animation_rate(character.motion.speed);
        self.position = shown;
        self.last_seen = shown;
    }
}

/// Displayed state of a ground tile. Tiles are static once placed.
#[derive(Debug, Clone, PartialEq)]
pub struct TileDrawable {
    /// Grid cell of the tile.
    pub coord: GridCoord,
    /// World-space origin.
    pub position: Vec3,
    /// Surface tag.
    pub material: TileMaterial,
}

impl From<&GroundTile> for TileDrawable {
    fn from(tile: &GroundTile) -> Self {
        Self {
            coord: tile.coord,
            position: tile.position,
            material: tile.material,
        }
    }
}

/// A drawable of any entity kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Drawable {
    /// See [`CharacterDrawable`].
    Character(CharacterDrawable),
    /// See [`TileDrawable`].
    GroundTile(TileDrawable),
}

impl Drawable {
    fn for_entity(entity: &Entity, context: &RenderContext) -> Self {
        match entity {
            Entity::Character(_) => Self::Character(CharacterDrawable::new(context)),
            Entity::GroundTile(tile) => Self::GroundTile(TileDrawable::from(tile)),
        }
    }

    /// Kind of entity this drawable shows.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Character(_) => EntityKind::Character,
            Self::GroundTile(_) => EntityKind::GroundTile,
        }
    }
}

/// Keeps one drawable per live entity.
///
/// # Examples
///
/// ```
/// use shardfall::command::NoInput;
/// use shardfall::config::SimConfig;
/// use shardfall::game_state::GameState;
/// use shardfall::presentation::{DisplayManager, DisplaySink, FrameView, RenderContext};
///
/// let mut state = GameState::new(SimConfig::default()).unwrap();
/// let player = state.add_character().unwrap();
/// state.step(0.04, &mut NoInput).unwrap();
///
/// let mut display = DisplayManager::default();
/// let mut context = RenderContext::from_config(state.config());
/// let stats = display.refresh(&FrameView::new(&state, 0.04, Some(player)), &mut context);
/// assert_eq!(stats.live, state.registry().len());
/// assert_eq!(context.follow_target(), Some(player));
/// ```
#[derive(Debug, Clone, Default)]
pub struct DisplayManager {
    drawables: HashMap<EntityId, Drawable>,
}

impl DisplayManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drawable shown for `id`.
    #[must_use]
    pub fn drawable(&self, id: EntityId) -> Option<&Drawable> {
        self.drawables.get(&id)
    }

    /// Character drawable shown for `id`.
    #[must_use]
    pub fn character(&self, id: EntityId) -> Option<&CharacterDrawable> {
        match self.drawables.get(&id) {
            Some(Drawable::Character(drawable)) => Some(drawable),
            Some(Drawable::GroundTile(_)) | None => None,
        }
    }

    /// Number of live drawables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.drawables.len()
    }

    /// Whether nothing is displayed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty()
    }
}

impl DisplaySink for DisplayManager {
    fn refresh(&mut self, view: &FrameView<'_>, context: &mut RenderContext) -> RefreshStats {
        let mut stats = RefreshStats::default();

        for (id, entity) in view.registry.iter() {
            if !self.drawables.contains_key(&id) {
                self.drawables.insert(id, Drawable::for_entity(entity, context));
                stats.created += 1;
            }
        }

        self.drawables
            .retain(|id, drawable| match (drawable, view.registry.get(*id)) {
                (Drawable::Character(shown), Some(Entity::Character(character))) => {
                    shown.update(character, view, context);
                    stats.updated += 1;
                    true
                }
                (Drawable::GroundTile(_), Some(Entity::GroundTile(_))) => {
                    stats.updated += 1;
                    true
                }
                (Drawable::Character(_) | Drawable::GroundTile(_), _) => {
                    stats.removed += 1;
                    false
                }
            });

        let target = view
            .local_player
            .filter(|id| self.drawables.contains_key(id));
        context.set_follow_target(target);

        stats.live = self.drawables.len();
        if stats.created > 0 || stats.removed > 0 {
            debug!(
                "frame {}: {} drawables created, {} disposed, {} live",
                view.frame, stats.created, stats.removed, stats.live
            );
        }
        stats
    }
}
