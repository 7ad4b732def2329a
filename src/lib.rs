#![cfg_attr(docsrs, feature(doc_cfg))]
//! Fixed-step simulation core for a small real-time action game.
//!
//! [`GameState`] drains variable frame times in fixed ticks, moving
//! characters, streaming ground tiles around them and dispatching player
//! [`Command`]s. [`GameRunner`] composes the scheduler with a command source
//! and a display sink once per frame. Rendering, camera control and raw input
//! capture stay with the host.
pub mod ability;
pub mod command;
pub mod config;
pub mod constants;
pub mod entity;
pub mod game_state;
pub mod input;
pub mod kinematics;
pub mod logging;
pub mod numeric;
pub mod presentation;
pub mod registry;
pub mod runner;
pub mod snapshot;
pub mod tiles;
pub mod vector_math;
pub use constants::*;

// Re-export commonly used items
pub use ability::{Ability, CastResult, Caster, ShardSpell};
pub use command::{
    dispatch, from_fn, Command, CommandError, CommandOutcome, CommandQueue, CommandSource,
    InputContext, NoInput,
};
pub use config::{ConfigError, SimConfig};
pub use entity::{Character, Entity, EntityId, EntityKind, GridCoord, GroundTile, TileMaterial};
pub use game_state::{GameState, SimError, StepReport};
pub use input::{LocalController, PointerState, Ray, ScriptedInput};
pub use kinematics::{extrapolate_rotation, MovableObject, RotationSmoother};
pub use logging::init as init_logging;
pub use presentation::{DisplayManager, DisplaySink, FrameView, RenderContext};
pub use registry::{EntityRegistry, RegistryError};
pub use runner::{FrameTimings, GameRunner};
pub use snapshot::WorldSnapshot;
pub use tiles::{window_around, TileField, TileWindow};

pub mod prelude {
    //! Prelude exports used in documentation examples.
    //!
    //! ```rust,no_run
    //! use shardfall::prelude::*;
    //! ```

    pub use crate::command::{Command, CommandSource, NoInput};
    pub use crate::config::SimConfig;
    pub use crate::entity::EntityId;
    pub use crate::game_state::GameState;
    pub use crate::presentation::{DisplayManager, DisplaySink};
    pub use crate::runner::GameRunner;
    pub use glam::Vec3;
}
