//! Per-frame composition of the simulation, input and display.
//!
//! [`GameRunner::update`] is what a host calls once per rendered frame: it
//! steps the [`GameState`] with the frame's elapsed time, lets the display
//! sink catch up with the result, and measures how long both took.

use std::collections::VecDeque;
use std::time::Instant;

use log::warn;

use crate::command::CommandSource;
use crate::config::SimConfig;
use crate::constants::{FRAME_TIMING_WINDOW, SPIKE_FACTOR, SPIKE_THRESHOLD_SECONDS};
use crate::entity::EntityId;
use crate::game_state::{GameState, SimError, StepReport};
use crate::presentation::{DisplaySink, FrameView, RefreshStats, RenderContext};

/// An update that took far longer than usual.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spike {
    /// Duration of the offending update, in seconds.
    pub duration: f32,
    /// Rolling average at the time, in seconds.
    pub average: f32,
}

impl Spike {
    /// How far the update overran the average, in seconds.
    #[must_use]
    pub fn excess(&self) -> f32 {
        self.duration - self.average
    }
}

/// Rolling statistics over recent update durations.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameTimings {
    samples: VecDeque<f32>,
    capacity: usize,
    average: f32,
    threshold: f32,
}

impl Default for FrameTimings {
    fn default() -> Self {
        Self::new(FRAME_TIMING_WINDOW, SPIKE_THRESHOLD_SECONDS)
    }
}

impl FrameTimings {
    /// Averages over at most `capacity` samples; spikes must also exceed
    /// `threshold` seconds.
    #[must_use]
    pub fn new(capacity: usize, threshold: f32) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            average: 0.0,
            threshold,
        }
    }

    /// Current rolling average, in seconds.
    #[must_use]
    pub const fn average(&self) -> f32 {
        self.average
    }

    /// Number of samples in the window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no sample has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Records one update duration and reports it if it was a spike.
    #[expect(
        clippy::cast_precision_loss,
        reason = "The sample window holds far fewer than 2^24 entries."
    )]
    pub fn record(&mut self, duration: f32) -> Option<Spike> {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(duration);
        self.average = self.samples.iter().sum::<f32>() / self.samples.len() as f32;

        let spike = duration > self.average * SPIKE_FACTOR && duration > self.threshold;
        spike.then_some(Spike {
            duration,
            average: self.average,
        })
    }
}

/// Everything one frame produced.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// What the scheduler did.
    pub step: StepReport,
    /// What the display did.
    pub refresh: RefreshStats,
    /// Wall-clock seconds spent in the update.
    pub update_seconds: f32,
    /// Set when the update was a timing spike.
    pub spike: Option<Spike>,
}

/// Owns the world, the local player selection and the render context.
#[derive(Debug)]
pub struct GameRunner {
    state: GameState,
    local_player: EntityId,
    context: RenderContext,
    timings: FrameTimings,
    total_elapsed: f64,
}

impl GameRunner {
    /// Validates `config`, creates the world and spawns the local character.
    ///
    /// # Errors
    /// Returns [`SimError::Config`] for an invalid configuration and
    /// [`SimError::Registry`] if the character cannot be registered.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        let mut state = GameState::new(config)?;
        let local_player = state.add_character()?;
        let context = RenderContext::from_config(state.config());
        Ok(Self {
            state,
            local_player,
            context,
            timings: FrameTimings::default(),
            total_elapsed: 0.0,
        })
    }

    /// Runs one frame: step the world by `elapsed`, then refresh `display`.
    ///
    /// # Errors
    /// Propagates [`SimError`] from [`GameState::step`].
    pub fn update<S, D>(
        &mut self,
        elapsed: f32,
        source: &mut S,
        display: &mut D,
    ) -> Result<FrameReport, SimError>
    where
        S: CommandSource + ?Sized,
        D: DisplaySink + ?Sized,
    {
        let started = Instant::now();
        let step = self.state.step(elapsed, source)?;
        let view = FrameView::new(&self.state, self.state.last_elapsed(), Some(self.local_player));
        let refresh = display.refresh(&view, &mut self.context);
        self.total_elapsed += f64::from(self.state.last_elapsed());

        let update_seconds = started.elapsed().as_secs_f32();
        let spike = self.timings.record(update_seconds);
        if let Some(spike) = spike {
            warn!(
                "frame {}: {:.1} ms spike (average {:.1} ms)",
                step.frame,
                spike.excess() * 1000.0,
                spike.average * 1000.0
            );
        }
        Ok(FrameReport {
            step,
            refresh,
            update_seconds,
            spike,
        })
    }

    /// Hands control to the next character, wrapping at the end.
    pub fn select_next_character(&mut self) -> EntityId {
        let characters = self.state.characters();
        if let Some(index) = self.local_index() {
            if let Some(next) = characters.get((index + 1) % characters.len()) {
                self.local_player = *next;
            }
        } else if let Some(first) = characters.first() {
            self.local_player = *first;
        }
        self.local_player
    }

    /// Hands control to the previous character, stopping at the first.
    pub fn select_previous_character(&mut self) -> EntityId {
        let characters = self.state.characters();
        let index = self.local_index().map_or(0, |index| index.saturating_sub(1));
        if let Some(previous) = characters.get(index) {
            self.local_player = *previous;
        }
        self.local_player
    }

    fn local_index(&self) -> Option<usize> {
        self.state
            .characters()
            .iter()
            .position(|id| *id == self.local_player)
    }

    /// Locally controlled character.
    #[must_use]
    pub const fn local_player(&self) -> EntityId {
        self.local_player
    }

    /// The simulated world.
    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    /// The simulated world, mutably, e.g. to spawn more characters.
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    /// Camera and display settings.
    #[must_use]
    pub const fn render_context(&self) -> &RenderContext {
        &self.context
    }

    /// Update timing statistics.
    #[must_use]
    pub const fn timings(&self) -> &FrameTimings {
        &self.timings
    }

    /// Wall-clock seconds fed to the simulation so far.
    #[must_use]
    pub const fn total_elapsed(&self) -> f64 {
        self.total_elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::NoInput;
    use crate::config::ConfigError;
    use crate::presentation::DisplayManager;
    use rstest::rstest;

    #[rstest]
    fn runner_spawns_the_local_player() {
        let runner = GameRunner::new(SimConfig::default()).expect("runner");
        assert_eq!(runner.state().characters(), &[runner.local_player()]);
    }

    #[rstest]
    fn invalid_config_is_rejected() {
        let config = SimConfig {
            tick_seconds: 0.0,
            ..SimConfig::default()
        };
        assert!(matches!(
            GameRunner::new(config),
            Err(SimError::Config(ConfigError::Invalid { field: "tick_seconds", .. }))
        ));
    }

    #[rstest]
    fn update_steps_and_refreshes() {
        let mut runner = GameRunner::new(SimConfig::default()).expect("runner");
        let mut display = DisplayManager::new();
        let report = runner
            .update(0.1, &mut NoInput, &mut display)
            .expect("update");
        assert_eq!(report.step.ticks, 2);
        assert_eq!(report.refresh.live, runner.state().registry().len());
        assert_eq!(
            runner.render_context().follow_target(),
            Some(runner.local_player())
        );
        assert_eq!(runner.timings().len(), 1);
    }

    #[rstest]
    fn selection_wraps_forward_and_stops_backward() {
        let mut runner = GameRunner::new(SimConfig::default()).expect("runner");
        let first = runner.local_player();
        let second = runner.state_mut().add_character().expect("spawn");
        let third = runner.state_mut().add_character().expect("spawn");

        assert_eq!(runner.select_next_character(), second);
        assert_eq!(runner.select_next_character(), third);
        assert_eq!(runner.select_next_character(), first);
        assert_eq!(runner.select_previous_character(), first);
        runner.select_next_character();
        assert_eq!(runner.select_previous_character(), first);
    }

    #[rstest]
    fn steady_timings_have_no_spikes() {
        let mut timings = FrameTimings::new(4, 0.001);
        for _ in 0..10 {
            assert_eq!(timings.record(0.01), None);
        }
        assert_eq!(timings.len(), 4);
        approx::assert_relative_eq!(timings.average(), 0.01, epsilon = 1e-6);
    }

    #[rstest]
    #[case::large_jump(0.1, true)]
    #[case::under_threshold(0.015, false)]
    fn spikes_need_ratio_and_threshold(#[case] duration: f32, #[case] expected: bool) {
        let mut timings = FrameTimings::new(8, SPIKE_THRESHOLD_SECONDS);
        for _ in 0..7 {
            timings.record(0.002);
        }
        assert_eq!(timings.record(duration).is_some(), expected);
    }
}
