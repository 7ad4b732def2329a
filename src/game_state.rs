//! Fixed-step scheduler driving the authoritative simulation.
//!
//! [`GameState::step`] consumes variable wall-clock deltas and drains them in
//! whole ticks of [`SimConfig::tick_seconds`]. Each tick moves every
//! character, streams (and optionally evicts) ground tiles around the
//! characters' tick-start positions, then dispatches the queued commands in
//! order. The remainder left in the accumulator is what the display layer
//! extrapolates across.

use glam::Vec3;
use hashbrown::HashMap;
use log::{trace, warn};
use serde::Serialize;
use thiserror::Error;

use crate::command::{
    dispatch, log_cast, log_command_error, CastRecord, Command, CommandError, CommandOutcome,
    CommandQueue, CommandSource, InputContext,
};
use crate::config::{ConfigError, SimConfig};
use crate::entity::{Character, Entity, EntityId, GridCoord};
use crate::numeric::{seconds_to_f32, whole_steps};
use crate::registry::{EntityRegistry, RegistryError};
use crate::tiles::{TileField, TileWindow};

/// Failures that stop a `step` call.
#[derive(Debug, Error)]
pub enum SimError {
    /// The registry detected an invariant violation.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// The configuration cannot drive the scheduler.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A command that was dropped during dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedCommand {
    /// Frame the command was dispatched on.
    pub frame: u64,
    /// The rejected command.
    pub command: Command,
    /// Why it was rejected.
    pub error: CommandError,
}

/// What one `step` call did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StepReport {
    /// Ticks drained.
    pub ticks: u32,
    /// Frame counter after the call.
    pub frame: u64,
    /// Every ability cast dispatched, in order.
    pub casts: Vec<CastRecord>,
    /// Every command dropped, in order.
    pub command_errors: Vec<DroppedCommand>,
    /// Tiles created by streaming.
    pub tiles_created: usize,
    /// Tiles removed by eviction.
    pub tiles_evicted: usize,
    /// Backlog discarded by the tick clamp, in seconds.
    pub dropped_backlog: Option<f32>,
}

/// The authoritative world and its fixed-step clock.
#[derive(Debug)]
pub struct GameState {
    config: SimConfig,
    time: f64,
    frame: u64,
    registry: EntityRegistry,
    characters: Vec<EntityId>,
    tiles: TileField,
    accumulator: f64,
    last_elapsed: f32,
    pending: CommandQueue,
}

fn sanitise_elapsed(elapsed: f32) -> f32 {
    if elapsed.is_finite() && elapsed >= 0.0 {
        elapsed
    } else {
        warn!("ignoring invalid elapsed time {elapsed}");
        0.0
    }
}

impl GameState {
    /// Validates `config` and creates an empty world at frame zero.
    ///
    /// # Errors
    /// Returns [`SimError::Config`] when the configuration cannot drive the
    /// scheduler, e.g. a tick that is not strictly positive.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        let tiles = TileField::new(config.tile_size, config.tile_half_extent);
        Ok(Self {
            config,
            time: 0.0,
            frame: 0,
            registry: EntityRegistry::new(),
            characters: Vec::new(),
            tiles,
            accumulator: 0.0,
            last_elapsed: 0.0,
            pending: CommandQueue::new(),
        })
    }

    /// Spawns a default character at the origin.
    ///
    /// # Errors
    /// Returns [`SimError::Registry`] if the new id is already registered.
    pub fn add_character(&mut self) -> Result<EntityId, SimError> {
        self.add_character_at(Vec3::ZERO)
    }

    /// Spawns a default character at `position`.
    ///
    /// # Errors
    /// Returns [`SimError::Registry`] if the new id is already registered.
    pub fn add_character_at(&mut self, position: Vec3) -> Result<EntityId, SimError> {
        let id = self.registry.new_id();
        let character = Character::spawn(id, &self.config).at(position);
        self.registry.insert(id, Entity::Character(character))?;
        self.characters.push(id);
        Ok(id)
    }

    /// Advances the world by `elapsed` wall-clock seconds.
    ///
    /// Input is collected once before any tick and again before a tick whose
    /// queue is empty. Negative or non-finite `elapsed` values are treated as
    /// zero.
    ///
    /// # Errors
    /// Returns [`SimError::Registry`] if tile streaming breaks a registry
    /// invariant. Command failures never abort the call; they are reported in
    /// [`StepReport::command_errors`].
    pub fn step<S>(&mut self, elapsed: f32, source: &mut S) -> Result<StepReport, SimError>
    where
        S: CommandSource + ?Sized,
    {
        let elapsed = sanitise_elapsed(elapsed);
        self.accumulator += f64::from(elapsed);
        self.last_elapsed = elapsed;
        self.collect_input(source);

        let tick = f64::from(self.config.tick_seconds);
        let owed = whole_steps(self.accumulator, tick);
        let runnable = self
            .config
            .max_ticks_per_step
            .map_or(owed, |max| owed.min(max));

        let mut report = StepReport::default();
        for _ in 0..runnable {
            self.accumulator -= tick;
            self.time += tick;
            self.run_tick(source, &mut report)?;
            report.ticks += 1;
        }
        self.accumulator = self.accumulator.max(0.0);

        if runnable < owed {
            warn!(
                "tick clamp reached after {} ticks; dropping {:.3}s of backlog",
                report.ticks, self.accumulator
            );
            report.dropped_backlog = Some(seconds_to_f32(self.accumulator));
            self.accumulator = 0.0;
        }
        report.frame = self.frame;
        Ok(report)
    }

    fn collect_input<S>(&mut self, source: &mut S)
    where
        S: CommandSource + ?Sized,
    {
        let context = InputContext::new(&self.registry, self.frame);
        source.collect_commands(&context, &mut self.pending);
    }

    fn run_tick<S>(&mut self, source: &mut S, report: &mut StepReport) -> Result<(), SimError>
    where
        S: CommandSource + ?Sized,
    {
        let tick = self.config.tick_seconds;
        let frame = self.frame;
        trace!("tick {frame} at t={:.3}", self.time);

        let mut windows: Vec<TileWindow> = Vec::with_capacity(self.characters.len());
        for id in &self.characters {
            if let Some(character) = self.registry.character_mut(*id) {
                windows.push(self.tiles.window_for(character.motion.position));
                character.motion.step(tick);
            }
        }

        for window in &windows {
            report.tiles_created += self.tiles.stream_window(&mut self.registry, window)?;
        }
        if self.config.evict_tiles {
            report.tiles_evicted += self.tiles.evict_outside(&mut self.registry, &windows);
        }

        if self.pending.is_empty() {
            self.collect_input(source);
        }
        for command in self.pending.drain() {
            match dispatch(&command, &mut self.registry, frame, tick) {
                Ok(CommandOutcome::Cast(record)) => {
                    log_cast(&record);
                    report.casts.push(record);
                }
                Ok(CommandOutcome::Moved { .. }) => {}
                Err(error) => {
                    log_command_error(frame, &command, &error);
                    report.command_errors.push(DroppedCommand {
                        frame,
                        command,
                        error,
                    });
                }
            }
        }
        self.pending.clear();
        self.frame += 1;
        Ok(())
    }

    /// Configuration the world runs with.
    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Simulated seconds elapsed.
    #[must_use]
    pub const fn time(&self) -> f64 {
        self.time
    }

    /// Ticks run so far.
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Seconds accumulated since the last tick, for extrapolation.
    #[must_use]
    pub fn time_since_tick(&self) -> f32 {
        seconds_to_f32(self.accumulator)
    }

    /// Raw elapsed value passed to the most recent `step`.
    #[must_use]
    pub const fn last_elapsed(&self) -> f32 {
        self.last_elapsed
    }

    /// Every entity, keyed by id.
    #[must_use]
    pub const fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Character ids in spawn order.
    #[must_use]
    pub fn characters(&self) -> &[EntityId] {
        &self.characters
    }

    /// Ground tile ids in creation order.
    #[must_use]
    pub fn ground_tiles(&self) -> &[EntityId] {
        self.tiles.tiles()
    }

    /// Grid coordinate to tile lookup.
    #[must_use]
    pub const fn tile_lookup(&self) -> &HashMap<GridCoord, EntityId> {
        self.tiles.lookup()
    }

    /// Commands waiting for the next tick.
    #[must_use]
    pub const fn pending(&self) -> &CommandQueue {
        &self.pending
    }

    /// Looks up a character.
    #[must_use]
    pub fn character(&self, id: EntityId) -> Option<&Character> {
        self.registry.character(id)
    }

    /// Looks up a character mutably, e.g. to equip extra abilities.
    pub fn character_mut(&mut self, id: EntityId) -> Option<&mut Character> {
        self.registry.character_mut(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{from_fn, NoInput};
    use approx::assert_relative_eq;
    use rstest::{fixture, rstest};

    static_assertions::assert_impl_all!(GameState: Send);

    #[fixture]
    fn state() -> GameState {
        GameState::new(SimConfig {
            tick_seconds: 0.1,
            ..SimConfig::default()
        })
        .expect("valid config")
    }

    #[rstest]
    fn drains_whole_ticks_and_keeps_remainder(mut state: GameState) {
        let report = state.step(0.25, &mut NoInput).expect("step");
        assert_eq!(report.ticks, 2);
        assert_eq!(state.frame(), 2);
        assert_relative_eq!(state.time_since_tick(), 0.05, epsilon = 1e-6);
        assert_relative_eq!(state.last_elapsed(), 0.25);
        assert_relative_eq!(state.time(), 0.2, epsilon = 1e-6);
    }

    #[rstest]
    fn short_frames_accumulate(mut state: GameState) {
        assert_eq!(state.step(0.06, &mut NoInput).expect("step").ticks, 0);
        assert_eq!(state.step(0.06, &mut NoInput).expect("step").ticks, 1);
        assert_eq!(state.frame(), 1);
    }

    #[rstest]
    #[case(f32::NAN)]
    #[case(-1.0)]
    #[case(f32::INFINITY)]
    fn invalid_elapsed_counts_as_zero(mut state: GameState, #[case] elapsed: f32) {
        let report = state.step(elapsed, &mut NoInput).expect("step");
        assert_eq!(report.ticks, 0);
        assert_eq!(state.time_since_tick(), 0.0);
    }

    #[rstest]
    fn clamp_drops_backlog() {
        let mut state = GameState::new(SimConfig {
            tick_seconds: 0.1,
            max_ticks_per_step: Some(3),
            ..SimConfig::default()
        })
        .expect("valid config");
        let report = state.step(1.05, &mut NoInput).expect("step");
        assert_eq!(report.ticks, 3);
        let dropped = report.dropped_backlog.expect("backlog dropped");
        assert_relative_eq!(dropped, 0.75, epsilon = 1e-5);
        assert_eq!(state.time_since_tick(), 0.0);
    }

    #[rstest]
    fn long_stall_drains_every_owed_tick() {
        let mut state = GameState::new(SimConfig {
            tick_seconds: 0.5,
            ..SimConfig::default()
        })
        .expect("valid config");
        let report = state.step(40_000.0, &mut NoInput).expect("step");
        assert_eq!(report.ticks, 80_000);
        assert_eq!(state.frame(), 80_000);
        assert_eq!(report.dropped_backlog, None);
        assert!(state.time_since_tick() < 0.5);
        assert_relative_eq!(state.time(), 40_000.0, epsilon = 1e-6);
    }

    #[rstest]
    fn clamped_stall_beyond_f32_resolution_still_progresses() {
        let mut state = GameState::new(SimConfig {
            max_ticks_per_step: Some(1_000),
            ..SimConfig::default()
        })
        .expect("valid config");
        let report = state.step(3.0e6, &mut NoInput).expect("step");
        assert_eq!(report.ticks, 1_000);
        let dropped = report.dropped_backlog.expect("backlog dropped");
        assert_relative_eq!(dropped, 2_999_960.0, epsilon = 1.0);
        assert_relative_eq!(state.time(), 40.0, epsilon = 1e-3);

        let next = state
            .step(state.config().tick_seconds, &mut NoInput)
            .expect("step");
        assert_eq!(next.ticks, 1);
        assert_eq!(next.dropped_backlog, None);
    }

    #[rstest]
    #[case::zero(0.0)]
    #[case::negative(-0.1)]
    #[case::not_a_number(f32::NAN)]
    fn unusable_tick_is_rejected_at_construction(#[case] tick_seconds: f32) {
        let result = GameState::new(SimConfig {
            tick_seconds,
            ..SimConfig::default()
        });
        assert!(matches!(result, Err(SimError::Config(_))));
    }

    #[rstest]
    fn input_is_collected_before_and_between_ticks(mut state: GameState) {
        let mut calls = 0;
        let mut source = from_fn(|_context: &InputContext<'_>, _queue: &mut CommandQueue| {
            calls += 1;
        });
        state.step(0.25, &mut source).expect("step");
        assert_eq!(calls, 3);
    }

    #[rstest]
    fn commands_dispatch_on_the_next_tick(mut state: GameState) {
        let id = state.add_character().expect("spawn");
        let mut source = from_fn(move |context: &InputContext<'_>, queue: &mut CommandQueue| {
            if context.frame() == 0 {
                queue.push(Command::Move {
                    entity_id: id,
                    offset: Vec3::new(3.0, 0.0, 0.0),
                });
            }
        });
        state.step(0.05, &mut source).expect("step");
        assert!(!state.character(id).expect("character").motion.moving);
        assert_eq!(state.pending().len(), 1);

        state.step(0.05, &mut source).expect("step");
        let character = state.character(id).expect("character");
        assert!(character.motion.moving);
        assert_eq!(character.motion.position, Vec3::ZERO);
        assert!(state.pending().is_empty());
    }

    #[rstest]
    fn dropped_commands_are_reported(mut state: GameState) {
        let id = state.add_character().expect("spawn");
        let mut source = from_fn(move |_context: &InputContext<'_>, queue: &mut CommandQueue| {
            queue.push(Command::Ability {
                entity_id: id,
                destination: Vec3::ZERO,
                ability_index: 99,
            });
            queue.push(Command::Unsupported);
        });
        let report = state.step(0.1, &mut source).expect("step");
        assert_eq!(report.command_errors.len(), 2);
        assert_eq!(report.command_errors[1].error, CommandError::Unsupported);
        assert!(state.pending().is_empty());
    }

    #[rstest]
    fn tiles_stream_around_characters(mut state: GameState) {
        state.add_character().expect("spawn");
        let report = state.step(0.1, &mut NoInput).expect("step");
        assert_eq!(report.tiles_created, 4);
        assert_eq!(state.ground_tiles().len(), 4);
        assert_eq!(state.tile_lookup().len(), 4);
        assert_eq!(state.registry().len(), 5);
    }
}
