//! Default tuning values for the simulation.
//!
//! [`SimConfig::default`](crate::config::SimConfig) is assembled from these
//! values; change them there at runtime rather than here.

/// Duration of one simulation tick in seconds (25 ticks per second).
pub const TICK_SECONDS: f32 = 1.0 / 25.0;
/// Edge length of one ground tile in world units.
pub const TILE_SIZE: f32 = 10.0;
/// Margin, in tiles, streamed around each character on every side.
pub const TILE_HALF_EXTENT: f32 = 0.5;
/// Movement speed of a freshly spawned character in world units per second.
pub const CHARACTER_SPEED: f32 = 5.0;
/// Mana of a freshly spawned character.
pub const STARTING_MANA: f32 = 100.0;
/// Angular speed used by display-side rotation smoothing, in degrees per second.
pub const CHARACTER_TURN_SPEED_DEGREES: f32 = 360.0 * 2.0;
/// Offsets shorter than this are treated as zero-length move commands.
pub const MOVE_EPSILON: f32 = f32::EPSILON;

/// Mana spent by one shard cast.
pub const SHARD_MANA_COST: f32 = 10.0;
/// Frames a shard ability stays on cooldown after a successful cast.
pub const SHARD_COOLDOWN_FRAMES: u64 = 25;

/// Number of recent frame updates averaged by the runner diagnostics.
pub const FRAME_TIMING_WINDOW: usize = 120;
/// Minimum update duration, in seconds, before a frame can count as a spike.
pub const SPIKE_THRESHOLD_SECONDS: f32 = 1.0 / 60.0;
/// A frame is a spike when it exceeds the rolling average by this factor.
pub const SPIKE_FACTOR: f32 = 2.0;
/// Seconds one run animation cycle covers at the reference speed.
pub const RUN_CYCLE_SECONDS: f32 = 1.0;
