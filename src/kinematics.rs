//! Movement kinematics for movable entities.
//!
//! Objects travel in a straight line at constant speed towards a destination.
//! Arrival is detected by the horizontal sign-flip test in
//! [`horizontal_sign_flipped`]: once the vector towards the destination
//! points against the movement vector on X or Z, the object snaps to the
//! destination exactly. The same test clamps the render-side extrapolation,
//! so a displayed object never runs past the point the simulation will stop
//! at.

use glam::{Quat, Vec3};
use serde::Serialize;

use crate::constants::MOVE_EPSILON;
use crate::vector_math::{horizontal_sign_flipped, look_rotation, rotate_towards};

/// Kinematic state shared by everything that can travel.
///
/// While `moving` is `false`, `destination` equals `position` and `movement`
/// only records the last direction of travel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovableObject {
    /// Authoritative position at the last tick.
    pub position: Vec3,
    /// Point the object is travelling to.
    pub destination: Vec3,
    /// Unit direction of travel.
    pub movement: Vec3,
    /// Orientation looking along `movement`.
    pub rotation: Quat,
    /// Whether the object is travelling.
    pub moving: bool,
    /// Travel speed in world units per second.
    pub speed: f32,
}

impl MovableObject {
    /// Creates a stationary object at `position`.
    #[must_use]
    pub fn new(position: Vec3, speed: f32) -> Self {
        Self {
            position,
            destination: position,
            movement: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            moving: false,
            speed,
        }
    }

    /// Starts travel towards `position + offset`.
    ///
    /// Zero-length offsets are ignored. Requests shorter than one tick of
    /// travel are extended along the same direction to exactly
    /// `speed * tick_seconds`, so every move spans at least one tick.
    pub fn move_to(&mut self, offset: Vec3, tick_seconds: f32) {
        let mut destination = self.position + offset;
        let distance = self.position.distance(destination);
        if !distance.is_finite() || distance < MOVE_EPSILON {
            return;
        }

        let min_distance = self.speed * tick_seconds;
        if distance < min_distance {
            destination = self.position + (destination - self.position).normalize() * min_distance;
        }

        self.moving = true;
        self.destination = destination;
        self.movement = (destination - self.position).normalize();
        self.rotation = look_rotation(self.movement);
    }

    /// Halts travel where the object stands.
    pub fn stop(&mut self) {
        self.moving = false;
        self.destination = self.position;
    }

    /// Advances a moving object by one tick, snapping to the destination once
    /// it has been reached or passed.
    pub fn step(&mut self, tick_seconds: f32) {
        if !self.moving {
            return;
        }

        self.position += self.movement * self.speed * tick_seconds;

        if horizontal_sign_flipped(self.movement, self.destination - self.position) {
            self.position = self.destination;
            self.moving = false;
        }
    }

    /// Position projected `elapsed_since_tick` seconds past the last tick,
    /// clamped to the destination.
    ///
    /// Pure: repeated calls with the same input return the same value.
    #[must_use]
    pub fn extrapolate_position(&self, elapsed_since_tick: f32) -> Vec3 {
        if !self.moving {
            return self.position;
        }

        let projected = self.position + self.movement * self.speed * elapsed_since_tick;
        if horizontal_sign_flipped(self.movement, self.destination - projected) {
            self.destination
        } else {
            projected
        }
    }
}

/// Rotates `last_seen` towards `target` at `turn_speed_degrees` per second
/// of wall-clock `elapsed` time.
#[must_use]
pub fn extrapolate_rotation(
    last_seen: Quat,
    target: Quat,
    turn_speed_degrees: f32,
    elapsed: f32,
) -> Quat {
    let max_step = turn_speed_degrees.to_radians() * elapsed.max(0.0);
    rotate_towards(last_seen, target, max_step)
}

/// Display-side rotation smoothing.
///
/// Holds the orientation shown last frame and turns it towards the
/// simulation's orientation at a fixed angular speed, independent of the
/// tick rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationSmoother {
    shown: Quat,
    turn_speed_degrees: f32,
}

impl RotationSmoother {
    /// Starts from the identity orientation.
    #[must_use]
    pub const fn new(turn_speed_degrees: f32) -> Self {
        Self {
            shown: Quat::IDENTITY,
            turn_speed_degrees,
        }
    }

    /// Orientation shown last frame.
    #[must_use]
    pub const fn shown(&self) -> Quat {
        self.shown
    }

    /// Advances the shown orientation towards `target` and returns it.
    pub fn advance(&mut self, target: Quat, elapsed: f32) -> Quat {
        self.shown = extrapolate_rotation(self.shown, target, self.turn_speed_degrees, elapsed);
        self.shown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use rstest::rstest;

    const TICK: f32 = 0.04;

    fn walker() -> MovableObject {
        MovableObject::new(Vec3::ZERO, 5.0)
    }

    #[rstest]
    fn zero_offset_is_ignored() {
        let mut object = walker();
        object.move_to(Vec3::ZERO, TICK);
        assert!(!object.moving);
        assert_eq!(object.destination, Vec3::ZERO);
    }

    #[rstest]
    fn short_offset_extends_to_one_tick() {
        let mut object = walker();
        object.move_to(Vec3::new(0.05, 0.0, 0.0), TICK);
        assert!(object.moving);
        assert_relative_eq!(object.destination.x, 0.2, epsilon = 1e-6);
        assert_relative_eq!(object.movement.x, 1.0, epsilon = 1e-6);
        assert_eq!(object.destination.z, 0.0);
    }

    #[rstest]
    fn short_diagonal_offset_keeps_direction() {
        let mut object = walker();
        object.move_to(Vec3::new(0.03, 0.0, 0.04), TICK);
        assert_relative_eq!(object.destination.length(), 0.2, epsilon = 1e-6);
        assert_relative_eq!(object.movement.x, 0.6, epsilon = 1e-6);
        assert_relative_eq!(object.movement.z, 0.8, epsilon = 1e-6);
    }

    #[rstest]
    fn move_sets_facing_rotation() {
        let mut object = walker();
        object.move_to(Vec3::new(-3.0, 0.0, 0.0), TICK);
        let facing = object.rotation * Vec3::Z;
        assert_abs_diff_eq!(facing.x, -1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(facing.z, 0.0, epsilon = 1e-5);
    }

    #[rstest]
    fn step_advances_one_tick_of_travel() {
        let mut object = walker();
        object.move_to(Vec3::new(10.0, 0.0, 0.0), TICK);
        object.step(TICK);
        assert_relative_eq!(object.position.x, 0.2, epsilon = 1e-6);
        assert!(object.moving);
    }

    #[rstest]
    #[case::axis_aligned(Vec3::new(1.0, 0.0, 0.0))]
    #[case::diagonal(Vec3::new(-1.3, 0.0, 2.7))]
    #[case::uneven(Vec3::new(0.77, 0.0, -0.31))]
    fn step_snaps_exactly_to_destination(#[case] offset: Vec3) {
        let mut object = walker();
        object.move_to(offset, TICK);
        let destination = object.destination;
        let mut ticks = 0;
        while object.moving {
            object.step(TICK);
            ticks += 1;
            assert!(ticks < 1_000, "object never arrived");
        }
        assert_eq!(object.position, destination);
    }

    #[rstest]
    fn stop_clears_destination() {
        let mut object = walker();
        object.move_to(Vec3::new(5.0, 0.0, 0.0), TICK);
        object.step(TICK);
        object.stop();
        assert!(!object.moving);
        assert_eq!(object.destination, object.position);
    }

    #[rstest]
    fn extrapolation_projects_and_is_pure() {
        let mut object = walker();
        object.move_to(Vec3::new(10.0, 0.0, 0.0), TICK);
        let first = object.extrapolate_position(0.02);
        let second = object.extrapolate_position(0.02);
        assert_eq!(first, second);
        assert_relative_eq!(first.x, 0.1, epsilon = 1e-6);
        assert_eq!(object.position, Vec3::ZERO);
    }

    #[rstest]
    fn extrapolation_clamps_to_destination() {
        let mut object = walker();
        object.move_to(Vec3::new(0.3, 0.0, 0.0), TICK);
        assert_eq!(object.extrapolate_position(10.0), object.destination);
    }

    #[rstest]
    fn stationary_extrapolation_stays_put() {
        let object = walker();
        assert_eq!(object.extrapolate_position(0.5), Vec3::ZERO);
    }

    #[rstest]
    fn rotation_turns_at_fixed_rate() {
        let target = Quat::from_rotation_y(std::f32::consts::PI * 0.75);
        let turned = extrapolate_rotation(Quat::IDENTITY, target, 90.0, 0.5);
        assert_abs_diff_eq!(
            Quat::IDENTITY.angle_between(turned),
            45.0_f32.to_radians(),
            epsilon = 1e-4
        );
    }

    #[rstest]
    fn smoother_converges_on_target() {
        let target = Quat::from_rotation_y(1.0);
        let mut smoother = RotationSmoother::new(720.0);
        for _ in 0..10 {
            smoother.advance(target, 0.016);
        }
        assert_eq!(smoother.shown(), target);
    }
}
