use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::ops::{Add, Mul, Sub};

/// Magnitude above which `normalize_angle` reduces with `rem_euclid` before
/// the add/subtract loop, so the loop stays short.
const LOOP_REDUCTION_LIMIT: f64 = 64.0 * TAU;

/// A simple 2D vector struct.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    /// Creates a new Vec2.
    pub fn new(x: f64, y: f64) -> Self {
        Vec2 { x, y }
    }

    /// Creates a zero vector.
    pub fn zero() -> Self {
        Vec2 { x: 0.0, y: 0.0 }
    }

    /// Calculates the squared length (magnitude) of the vector.
    pub fn length_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Calculates the length (magnitude) of the vector.
    pub fn length(&self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Calculates the squared distance to another vector (point).
    pub fn distance_squared(&self, other: Vec2) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Calculates the distance to another vector (point).
    pub fn distance(&self, other: Vec2) -> f64 {
        self.distance_squared(other).sqrt()
    }

    pub fn scale(&self, scalar: f64) -> Self {
        Vec2 { x: self.x * scalar, y: self.y * scalar }
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self { x: self.x + other.x, y: self.y + other.y }
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self { x: self.x - other.x, y: self.y - other.y }
    }
}

impl Mul<f64> for Vec2 {
    type Output = Self;
    fn mul(self, scalar: f64) -> Self {
        Self { x: self.x * scalar, y: self.y * scalar }
    }
}

/// Reduces any angle (radians) into `[0, 2π)`.
///
/// Values within a few turns are reduced by repeated add/subtract of `2π`,
/// which is exact for the excursions a single turning step produces.
/// Non-finite input yields NaN.
pub fn normalize_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return f64::NAN;
    }
    let mut a = if angle.abs() > LOOP_REDUCTION_LIMIT {
        angle.rem_euclid(TAU)
    } else {
        angle
    };
    // Negative side first: `-ε + 2π` may round up to exactly `2π`,
    // which the second loop then folds to zero.
    while a < 0.0 {
        a += TAU;
    }
    while a >= TAU {
        a -= TAU;
    }
    a
}

/// Direction of the offset `(dx, dy)` in `[0, 2π)`.
#[inline(always)]
pub fn angle_to(dx: f64, dy: f64) -> f64 {
    normalize_angle(dy.atan2(dx))
}

/// Converts an angle (in radians) to a unit vector.
#[inline(always)]
pub fn angle_to_vec(angle_rad: f64) -> Vec2 {
    Vec2::new(angle_rad.cos(), angle_rad.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn normalize_keeps_in_range_values() {
        assert_eq!(normalize_angle(0.0), 0.0);
        assert_eq!(normalize_angle(1.25), 1.25);
    }

    #[test]
    fn normalize_folds_full_turn_to_zero() {
        assert_eq!(normalize_angle(TAU), 0.0);
        assert_eq!(normalize_angle(-TAU), 0.0);
    }

    #[test]
    fn normalize_tiny_negative_stays_below_tau() {
        let a = normalize_angle(-1e-18);
        assert!(a >= 0.0 && a < TAU, "got {a}");
    }

    #[test]
    fn normalize_handles_several_turns() {
        assert_relative_eq!(normalize_angle(3.0 * TAU + 0.5), 0.5, epsilon = 1e-12);
        assert_relative_eq!(normalize_angle(-2.0 * TAU - 0.5), TAU - 0.5, epsilon = 1e-12);
    }

    #[test]
    fn angle_to_cardinal_directions() {
        assert_relative_eq!(angle_to(1.0, 0.0), 0.0);
        assert_relative_eq!(angle_to(0.0, 1.0), PI / 2.0);
        assert_relative_eq!(angle_to(-1.0, 0.0), PI);
        assert_relative_eq!(angle_to(0.0, -1.0), 3.0 * PI / 2.0);
    }

    #[test]
    fn distance_between_points() {
        let a = Vec2::new(2.0, 50.0);
        let b = Vec2::new(-5.0, 50.0);
        assert_relative_eq!(a.distance(b), 7.0);
        assert_relative_eq!((b - a).length(), 7.0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn normalized_angle_is_in_range(a in -1e6_f64..1e6) {
                let n = normalize_angle(a);
                prop_assert!((0.0..TAU).contains(&n), "normalize_angle({a}) = {n}");
            }

            #[test]
            fn normalization_is_idempotent(a in -1e6_f64..1e6) {
                let once = normalize_angle(a);
                prop_assert_eq!(normalize_angle(once), once);
            }

            #[test]
            fn angle_to_is_in_range(dx in -100.0_f64..100.0, dy in -100.0_f64..100.0) {
                let ang = angle_to(dx, dy);
                prop_assert!((0.0..TAU).contains(&ang));
            }
        }
    }
}
