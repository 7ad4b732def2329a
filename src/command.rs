//! Player commands, the per-tick command queue, and dispatch.
//!
//! Command sources (local input today, scripted or networked feeds later)
//! append [`Command`]s to the [`CommandQueue`] through the
//! [`CommandSource`] contract. The scheduler dispatches the queue in order
//! once per tick and clears it afterwards, whatever the outcome of the
//! individual commands.

use glam::Vec3;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ability::{CastResult, Caster};
use crate::entity::{Character, EntityId};
use crate::registry::EntityRegistry;

/// A single player action for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Command {
    /// Travel to the entity's current position plus `offset`.
    Move {
        /// Issuing character.
        entity_id: EntityId,
        /// Displacement added to the current position.
        offset: Vec3,
    },
    /// Cast the ability at `ability_index` towards `destination`.
    Ability {
        /// Issuing character.
        entity_id: EntityId,
        /// World-space target of the cast.
        destination: Vec3,
        /// Index into the caster's equipped abilities.
        ability_index: usize,
    },
    /// A command whose tag this build does not understand.
    #[serde(other)]
    Unsupported,
}

impl Command {
    /// Issuing entity, if the command names one.
    #[must_use]
    pub const fn entity_id(&self) -> Option<EntityId> {
        match self {
            Self::Move { entity_id, .. } | Self::Ability { entity_id, .. } => Some(*entity_id),
            Self::Unsupported => None,
        }
    }
}

/// Reasons a command was dropped. None of them stop the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum CommandError {
    /// The command names an id that is not registered.
    #[error("entity {0} is not registered")]
    UnknownEntity(EntityId),
    /// The command names an entity that is not a character.
    #[error("entity {0} is not a character")]
    NotACharacter(EntityId),
    /// The ability index lies outside the caster's equipped abilities.
    #[error("entity {entity} has {equipped} abilities; index {index} is out of range")]
    AbilityIndexOutOfRange {
        /// Caster.
        entity: EntityId,
        /// Requested index.
        index: usize,
        /// Number of equipped abilities.
        equipped: usize,
    },
    /// The command tag is not supported.
    #[error("unsupported command")]
    Unsupported,
}

/// Result code of one ability cast, kept for the tick report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CastRecord {
    /// Frame the cast was dispatched on.
    pub frame: u64,
    /// Casting character.
    pub caster: EntityId,
    /// Index of the ability in the caster's list.
    pub ability_index: usize,
    /// Name reported by the ability.
    pub ability: String,
    /// Outcome reported by the ability.
    pub result: CastResult,
}

/// Effect of a successfully dispatched command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// A move command was applied; `moving` is `false` for zero-length moves.
    Moved {
        /// Moved character.
        entity: EntityId,
        /// Destination after the command.
        destination: Vec3,
        /// Whether the character is now travelling.
        moving: bool,
    },
    /// An ability handler was invoked.
    Cast(CastRecord),
}

/// Commands waiting for the next tick.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CommandQueue {
    commands: Vec<Command>,
}

impl CommandQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one command.
    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Appends several commands in order.
    pub fn extend<I>(&mut self, commands: I)
    where
        I: IntoIterator<Item = Command>,
    {
        self.commands.extend(commands);
    }

    /// Keeps only the commands for which `keep` returns `true`.
    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&Command) -> bool,
    {
        self.commands.retain(keep);
    }

    /// Removes every queued command, yielding them in queue order.
    pub fn drain(&mut self) -> std::vec::Drain<'_, Command> {
        self.commands.drain(..)
    }

    /// Drops every queued command.
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Queued commands in order.
    #[must_use]
    pub fn as_slice(&self) -> &[Command] {
        &self.commands
    }

    /// Number of queued commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Read-only view handed to command sources while they collect input.
#[derive(Debug, Clone, Copy)]
pub struct InputContext<'a> {
    registry: &'a EntityRegistry,
    frame: u64,
}

impl<'a> InputContext<'a> {
    /// Wraps the registry as seen at `frame`.
    #[must_use]
    pub const fn new(registry: &'a EntityRegistry, frame: u64) -> Self {
        Self { registry, frame }
    }

    /// Authoritative position of an entity.
    #[must_use]
    pub fn position_of(&self, id: EntityId) -> Option<Vec3> {
        self.registry.get(id).map(crate::entity::Entity::position)
    }

    /// Frame the next dispatched tick will carry.
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// The full registry, read-only.
    #[must_use]
    pub const fn registry(&self) -> &'a EntityRegistry {
        self.registry
    }
}

/// Anything that can feed commands into the scheduler.
///
/// Implementations append zero or more commands and must not mutate
/// simulation state. The scheduler calls this once per `step` before any
/// tick, and again before a tick whose queue is empty.
pub trait CommandSource {
    /// Appends newly available commands to `queue`.
    fn collect_commands(&mut self, context: &InputContext<'_>, queue: &mut CommandQueue);
}

/// A source that never produces commands.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInput;

impl CommandSource for NoInput {
    fn collect_commands(&mut self, _context: &InputContext<'_>, _queue: &mut CommandQueue) {}
}

/// Command source backed by a closure; see [`from_fn`].
#[derive(Debug, Clone)]
pub struct FromFn<F>(F);

/// Wraps a closure as a [`CommandSource`].
///
/// ```
/// use shardfall::command::{from_fn, Command};
/// use shardfall::entity::EntityId;
/// use glam::Vec3;
///
/// let mut source = from_fn(|_context, queue| {
///     queue.push(Command::Move { entity_id: EntityId(1), offset: Vec3::X });
/// });
/// # let _ = &mut source;
/// ```
pub fn from_fn<F>(collect: F) -> FromFn<F>
where
    F: FnMut(&InputContext<'_>, &mut CommandQueue),
{
    FromFn(collect)
}

impl<F> CommandSource for FromFn<F>
where
    F: FnMut(&InputContext<'_>, &mut CommandQueue),
{
    fn collect_commands(&mut self, context: &InputContext<'_>, queue: &mut CommandQueue) {
        (self.0)(context, queue);
    }
}

impl<S: CommandSource + ?Sized> CommandSource for &mut S {
    fn collect_commands(&mut self, context: &InputContext<'_>, queue: &mut CommandQueue) {
        (**self).collect_commands(context, queue);
    }
}

fn resolve_character(
    registry: &mut EntityRegistry,
    id: EntityId,
) -> Result<&mut Character, CommandError> {
    let entity = registry.get_mut(id).ok_or(CommandError::UnknownEntity(id))?;
    entity
        .as_character_mut()
        .ok_or(CommandError::NotACharacter(id))
}

/// Applies one command to the registry.
///
/// Move commands start travel with the given tick duration as the minimum
/// travel time. Ability commands invoke the handler and return its result
/// code; the handler owns any side effects.
///
/// # Errors
/// Returns a [`CommandError`] when the command cannot be applied. The
/// registry is left untouched in that case.
pub fn dispatch(
    command: &Command,
    registry: &mut EntityRegistry,
    frame: u64,
    tick_seconds: f32,
) -> Result<CommandOutcome, CommandError> {
    match *command {
        Command::Move { entity_id, offset } => {
            let character = resolve_character(registry, entity_id)?;
            character.motion.move_to(offset, tick_seconds);
            Ok(CommandOutcome::Moved {
                entity: entity_id,
                destination: character.motion.destination,
                moving: character.motion.moving,
            })
        }
        Command::Ability {
            entity_id,
            destination,
            ability_index,
        } => {
            let Character {
                motion,
                mana,
                abilities,
                ..
            } = resolve_character(registry, entity_id)?;
            let equipped = abilities.len();
            let ability = abilities
                .get_mut(ability_index)
                .ok_or(CommandError::AbilityIndexOutOfRange {
                    entity: entity_id,
                    index: ability_index,
                    equipped,
                })?;
            let result = ability.cast(
                Caster {
                    id: entity_id,
                    motion,
                    mana,
                    frame,
                },
                destination,
            );
            Ok(CommandOutcome::Cast(CastRecord {
                frame,
                caster: entity_id,
                ability_index,
                ability: ability.name().to_owned(),
                result,
            }))
        }
        Command::Unsupported => Err(CommandError::Unsupported),
    }
}

/// Logs a dispatch failure at the severity its category calls for.
pub fn log_command_error(frame: u64, command: &Command, err: &CommandError) {
    match err {
        CommandError::AbilityIndexOutOfRange { .. } => {
            warn!("frame {frame}: ignoring {command:?}: {err}");
        }
        CommandError::UnknownEntity(_)
        | CommandError::NotACharacter(_)
        | CommandError::Unsupported => {
            error!("frame {frame}: dropping {command:?}: {err}");
        }
    }
}

/// Logs a cast result code.
pub fn log_cast(record: &CastRecord) {
    info!(
        "frame {}: {} cast {} -> {}",
        record.frame, record.caster, record.ability, record.result
    );
}
