//! Ability handlers equipped by characters.
//!
//! The scheduler only locates the caster, checks the ability index and calls
//! [`Ability::cast`]. Everything a cast costs or changes (mana, cooldowns,
//! spawned effects) belongs to the handler.

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::constants::{SHARD_COOLDOWN_FRAMES, SHARD_MANA_COST};
use crate::entity::EntityId;
use crate::kinematics::MovableObject;

/// Outcome code reported by an ability handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CastResult {
    /// The ability fired.
    Success,
    /// The caster lacks the resource the ability costs.
    NoResource,
    /// The ability has not recovered from its previous use.
    Cooldown,
    /// The caster is occupied and cannot cast now.
    PlayerBusy,
    /// The cast was rejected for any other reason.
    Fail,
}

impl fmt::Display for CastResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Success => "success",
            Self::NoResource => "no resource",
            Self::Cooldown => "cooldown",
            Self::PlayerBusy => "player busy",
            Self::Fail => "fail",
        };
        f.write_str(label)
    }
}

/// The parts of a character an ability may inspect or spend during a cast.
///
/// The ability list itself is excluded so a handler can be borrowed mutably
/// alongside its caster.
#[derive(Debug)]
pub struct Caster<'a> {
    /// Identity of the casting character.
    pub id: EntityId,
    /// Kinematic state of the caster, read-only.
    pub motion: &'a MovableObject,
    /// Mana pool the ability may spend from.
    pub mana: &'a mut f32,
    /// Simulation frame the cast happens on.
    pub frame: u64,
}

/// Capability shared by every equipped ability.
pub trait Ability: fmt::Debug + Send {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Attempts to cast towards `destination` and reports the outcome.
    fn cast(&mut self, caster: Caster<'_>, destination: Vec3) -> CastResult;
}

/// Directed shard projectile: costs mana and has a frame-based cooldown.
#[derive(Debug, Clone, PartialEq)]
pub struct ShardSpell {
    /// Mana deducted by a successful cast.
    pub mana_cost: f32,
    /// Frames before the spell can fire again.
    pub cooldown_frames: u64,
    /// Whether a travelling caster is reported as busy.
    pub block_while_moving: bool,
    ready_at: u64,
    last_target: Option<Vec3>,
}

impl Default for ShardSpell {
    fn default() -> Self {
        Self {
            mana_cost: SHARD_MANA_COST,
            cooldown_frames: SHARD_COOLDOWN_FRAMES,
            block_while_moving: false,
            ready_at: 0,
            last_target: None,
        }
    }
}

impl ShardSpell {
    /// Destination of the most recent successful cast.
    #[must_use]
    pub const fn last_target(&self) -> Option<Vec3> {
        self.last_target
    }
}

impl Ability for ShardSpell {
    fn name(&self) -> &str {
        "shard"
    }

    fn cast(&mut self, caster: Caster<'_>, destination: Vec3) -> CastResult {
        if !destination.is_finite() {
            return CastResult::Fail;
        }
        if self.block_while_moving && caster.motion.moving {
            return CastResult::PlayerBusy;
        }
        if caster.frame < self.ready_at {
            return CastResult::Cooldown;
        }
        if *caster.mana < self.mana_cost {
            return CastResult::NoResource;
        }

        *caster.mana -= self.mana_cost;
        self.ready_at = caster.frame.saturating_add(self.cooldown_frames);
        self.last_target = Some(destination);
        CastResult::Success
    }
}
