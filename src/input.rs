//! Command sources that feed the scheduler.
//!
//! [`LocalController`] turns pointer state captured by the host into `Move`
//! and `Ability` commands for the locally controlled character.
//! [`ScriptedInput`] replays a JSON list of frame-stamped commands, which is
//! how headless runs and tests drive the simulation.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec3;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::command::{Command, CommandQueue, CommandSource, InputContext};
use crate::entity::EntityId;

/// Half-line used for picking points on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    /// Start of the ray.
    pub origin: Vec3,
    /// Direction of travel; need not be normalised.
    pub direction: Vec3,
}

impl Ray {
    /// Creates a ray.
    #[must_use]
    pub const fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Point `distance` direction-lengths along the ray.
    #[must_use]
    pub fn point_at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }
}

/// Where `ray` meets the horizontal plane `y = 0`.
///
/// Rays parallel to the plane or pointing away from it miss.
///
/// ```
/// use glam::Vec3;
/// use shardfall::input::{ray_ground_intersection, Ray};
///
/// let ray = Ray::new(Vec3::new(1.0, 10.0, 2.0), Vec3::NEG_Y);
/// assert_eq!(ray_ground_intersection(&ray), Some(Vec3::new(1.0, 0.0, 2.0)));
/// ```
#[must_use]
pub fn ray_ground_intersection(ray: &Ray) -> Option<Vec3> {
    let denominator = ray.direction.y;
    if !denominator.is_finite() || denominator.abs() <= f32::EPSILON {
        return None;
    }
    let distance = -ray.origin.y / denominator;
    if !distance.is_finite() || distance < 0.0 {
        return None;
    }
    let mut hit = ray.point_at(distance);
    hit.y = 0.0;
    Some(hit)
}

/// Pointer and key state sampled by the host each frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerState {
    /// Camera ray through the cursor, if the cursor is over the view.
    pub cursor_ray: Option<Ray>,
    /// Camera ray through the centre of the screen.
    pub centre_ray: Option<Ray>,
    /// Whether the move button is held.
    pub move_held: bool,
    /// Whether the ability key went down this frame.
    pub ability_pressed: bool,
}

/// Input adapter for the locally controlled character.
#[derive(Debug, Clone, Default)]
pub struct LocalController {
    player: Option<EntityId>,
    pointer: PointerState,
    cursor_target: Option<Vec3>,
    ability_index: usize,
}

impl LocalController {
    /// Creates a controller steering `player`.
    #[must_use]
    pub fn new(player: EntityId) -> Self {
        Self {
            player: Some(player),
            ..Self::default()
        }
    }

    /// Character currently steered.
    #[must_use]
    pub const fn player(&self) -> Option<EntityId> {
        self.player
    }

    /// Switches control to another character.
    pub fn set_player(&mut self, player: EntityId) {
        self.player = Some(player);
    }

    /// Selects which equipped ability the ability key casts.
    pub fn set_ability_index(&mut self, index: usize) {
        self.ability_index = index;
    }

    /// Replaces the sampled pointer state.
    pub fn update_pointer(&mut self, pointer: PointerState) {
        self.pointer = pointer;
    }

    /// Last ground point under the cursor.
    #[must_use]
    pub const fn cursor_target(&self) -> Option<Vec3> {
        self.cursor_target
    }

    fn move_offset(&self, context: &InputContext<'_>, player: EntityId) -> Option<Vec3> {
        let target = self.pointer.cursor_ray.as_ref().and_then(ray_ground_intersection)?;
        let centre = self.pointer.centre_ray.as_ref().and_then(ray_ground_intersection)?;
        let origin = context.position_of(player).unwrap_or(centre);
        Some(target - origin)
    }
}

impl CommandSource for LocalController {
    fn collect_commands(&mut self, context: &InputContext<'_>, queue: &mut CommandQueue) {
        if let Some(hit) = self.pointer.cursor_ray.as_ref().and_then(ray_ground_intersection) {
            self.cursor_target = Some(hit);
        }
        let Some(player) = self.player else {
            return;
        };

        if self.pointer.move_held {
            if let Some(offset) = self.move_offset(context, player) {
                queue.retain(|command| {
                    !matches!(command, Command::Move { .. }) || command.entity_id() != Some(player)
                });
                queue.push(Command::Move {
                    entity_id: player,
                    offset,
                });
            }
        }

        if std::mem::take(&mut self.pointer.ability_pressed) {
            if let Some(destination) = self.cursor_target {
                queue.push(Command::Ability {
                    entity_id: player,
                    destination,
                    ability_index: self.ability_index,
                });
            }
        }
    }
}

/// Errors raised while loading a command script.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The script file could not be read.
    #[error("failed to read script {path}: {source}")]
    Io {
        /// Path that failed to load.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The script is not a valid command list.
    #[error("failed to parse script: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A command stamped with the frame it should be dispatched on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedCommand {
    /// Frame at which the command is released.
    pub frame: u64,
    /// The command itself.
    pub command: Command,
}

/// Replays frame-stamped commands.
///
/// A command stamped with frame `n` is released by the first collection that
/// sees the frame counter at `n` or later, so it is dispatched on tick `n`
/// unless the simulation has already moved past it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptedInput {
    entries: VecDeque<ScriptedCommand>,
}

impl ScriptedInput {
    /// Builds a script; entries are ordered by frame, keeping the given order
    /// within a frame.
    #[must_use]
    pub fn new(mut entries: Vec<ScriptedCommand>) -> Self {
        entries.sort_by_key(|entry| entry.frame);
        Self {
            entries: entries.into(),
        }
    }

    /// Parses a JSON array of `{ "frame": .., "command": { "kind": .. } }`.
    ///
    /// # Errors
    /// Returns [`ScriptError::Parse`] for malformed documents.
    pub fn from_json_str(json: &str) -> Result<Self, ScriptError> {
        let entries: Vec<ScriptedCommand> = serde_json::from_str(json)?;
        Ok(Self::new(entries))
    }

    /// Reads and parses a script file.
    ///
    /// # Errors
    /// Returns [`ScriptError::Io`] when the file cannot be read, otherwise the
    /// errors of [`ScriptedInput::from_json_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Commands not yet released.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.entries.len()
    }

    /// Whether every command has been released.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CommandSource for ScriptedInput {
    fn collect_commands(&mut self, context: &InputContext<'_>, queue: &mut CommandQueue) {
        while self
            .entries
            .front()
            .is_some_and(|entry| entry.frame <= context.frame())
        {
            if let Some(entry) = self.entries.pop_front() {
                debug!("frame {}: releasing scripted {:?}", context.frame(), entry.command);
                queue.push(entry.command);
            }
        }
    }
}
