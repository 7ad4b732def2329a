//! Numeric conversion helpers for the tile grid and the tick clock.
//!
//! World coordinates are `f32`; grid coordinates are `i32`. These helpers
//! guard the conversion so that huge or non-finite positions saturate instead
//! of wrapping. The scheduler keeps its clock in `f64` seconds and counts
//! ticks as integers.

/// Ceil the value and clamp it into the `i32` domain.
///
/// Non-finite input maps to `0`.
#[expect(
    clippy::cast_possible_truncation,
    reason = "The value is clamped to the i32 bounds before casting."
)]
#[must_use]
pub fn ceil_to_i32(value: f32) -> i32 {
    if !value.is_finite() {
        return 0;
    }
    let ceiled = f64::from(value).ceil();
    let clamped = ceiled.clamp(f64::from(i32::MIN), f64::from(i32::MAX));
    clamped as i32
}

/// Converts a world-space coordinate to its grid cell index by ceiling
/// division through `cell_size`.
///
/// ```
/// use shardfall::numeric::world_to_cell;
/// assert_eq!(world_to_cell(-15.0, 10.0), -1);
/// assert_eq!(world_to_cell(0.0, 10.0), 0);
/// assert_eq!(world_to_cell(0.5, 10.0), 1);
/// ```
#[must_use]
pub fn world_to_cell(coordinate: f32, cell_size: f32) -> i32 {
    ceil_to_i32(coordinate / cell_size)
}

/// World-space origin of a grid cell along one axis.
#[expect(
    clippy::cast_precision_loss,
    reason = "Grid indices stay far below the 2^24 limit of exact f32 integers."
)]
#[must_use]
pub fn cell_origin(index: i32, cell_size: f32) -> f32 {
    index as f32 * cell_size
}

/// Number of whole `step`s contained in `total`, saturating at `u32::MAX`.
///
/// Non-finite input, a non-positive `step` or a non-positive `total` yield
/// `0`.
///
/// ```
/// use shardfall::numeric::whole_steps;
/// assert_eq!(whole_steps(0.25, 0.1), 2);
/// assert_eq!(whole_steps(1.0, 0.0), 0);
/// ```
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "The quotient is floored and clamped to the u32 domain before casting."
)]
#[must_use]
pub fn whole_steps(total: f64, step: f64) -> u32 {
    if !(total.is_finite() && step.is_finite()) || total <= 0.0 || step <= 0.0 {
        return 0;
    }
    let count = (total / step).floor();
    count.min(f64::from(u32::MAX)) as u32
}

/// Narrows a clock value in seconds to `f32`.
#[expect(
    clippy::cast_possible_truncation,
    reason = "Clock remainders stay below one tick, well inside the f32 range."
)]
#[must_use]
pub fn seconds_to_f32(seconds: f64) -> f32 {
    seconds as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 0)]
    #[case(0.1, 1)]
    #[case(1.0, 1)]
    #[case(-0.1, 0)]
    #[case(-1.5, -1)]
    #[case(1.0e12, i32::MAX)]
    #[case(-1.0e12, i32::MIN)]
    #[case(f32::NAN, 0)]
    #[case(f32::INFINITY, 0)]
    fn ceil_saturates(#[case] value: f32, #[case] expected: i32) {
        assert_eq!(ceil_to_i32(value), expected);
    }

    #[rstest]
    #[case(0.25, 0.1, 2)]
    #[case(0.04, 0.04, 1)]
    #[case(0.0, 0.04, 0)]
    #[case(-1.0, 0.04, 0)]
    #[case(1.0, 0.0, 0)]
    #[case(1.0, -0.5, 0)]
    #[case(f64::NAN, 0.04, 0)]
    #[case(1.0e12, 1.0e-3, u32::MAX)]
    fn whole_steps_floors_and_saturates(
        #[case] total: f64,
        #[case] step: f64,
        #[case] expected: u32,
    ) {
        assert_eq!(whole_steps(total, step), expected);
    }

    #[rstest]
    fn whole_steps_counts_large_totals_exactly() {
        assert_eq!(whole_steps(3.0e6, 0.5), 6_000_000);
    }

    #[rstest]
    fn cell_origin_scales_index() {
        approx::assert_relative_eq!(cell_origin(-3, 10.0), -30.0);
        approx::assert_relative_eq!(cell_origin(2, 2.5), 5.0);
    }
}
