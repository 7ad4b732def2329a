//! Basic vector math helper functions.
//! Sign tests, look rotations and bounded rotation steps shared by the
//! kinematics and presentation code.
use glam::{EulerRot, Quat, Vec3};

/// Sign of an axis component, treating zero (of either sign) as positive.
///
/// # Examples
/// ```
/// use shardfall::vector_math::axis_sign;
/// assert_eq!(axis_sign(3.0), 1.0);
/// assert_eq!(axis_sign(0.0), 1.0);
/// assert_eq!(axis_sign(-0.0), 1.0);
/// assert_eq!(axis_sign(-2.0), -1.0);
/// ```
#[must_use]
pub fn axis_sign(component: f32) -> f32 {
    if component >= 0.0 {
        1.0
    } else {
        -1.0
    }
}

/// Returns `true` when `to_target` points against `movement` on the X or Z
/// axis.
///
/// An object advancing along `movement` has reached or passed its target as
/// soon as either horizontal component of the vector towards the target
/// changes sign. The vertical axis is ignored.
#[must_use]
pub fn horizontal_sign_flipped(movement: Vec3, to_target: Vec3) -> bool {
    let to_target = to_target.normalize_or_zero();
    axis_sign(movement.x) != axis_sign(to_target.x) || axis_sign(movement.z) != axis_sign(to_target.z)
}

/// Orientation that looks along `forward` with +Y as up.
///
/// The identity rotation faces +Z. A zero or non-finite `forward` yields the
/// identity.
#[must_use]
pub fn look_rotation(forward: Vec3) -> Quat {
    let Some(direction) = forward.try_normalize() else {
        return Quat::IDENTITY;
    };
    let yaw = direction.x.atan2(direction.z);
    let pitch = -direction.y.clamp(-1.0, 1.0).asin();
    Quat::from_euler(EulerRot::YXZ, yaw, pitch, 0.0)
}

/// Rotates `from` towards `to` by at most `max_radians`.
///
/// Returns `to` once it lies within the allowed step.
#[must_use]
pub fn rotate_towards(from: Quat, to: Quat, max_radians: f32) -> Quat {
    let angle = from.angle_between(to);
    if angle <= max_radians.max(0.0) || angle <= f32::EPSILON {
        return to;
    }
    from.slerp(to, max_radians.max(0.0) / angle)
}
