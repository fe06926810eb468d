use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Sub};

/// Lengths at or below this are treated as zero-length vectors.
const ZERO_LENGTH: f32 = 1e-6;

/// A simple 2D vector, used for both positions and velocities.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    /// Creates a new Vec2.
    #[inline(always)]
    pub fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    /// Creates a zero vector.
    #[inline(always)]
    pub fn zero() -> Self {
        Self::ZERO
    }

    /// Calculates the length (magnitude) of the vector.
    /// Uses `hypot`, so finite vectors whose squared length overflows still get a finite length.
    #[inline(always)]
    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    /// Calculates the squared distance to another vector (point).
    #[inline(always)]
    pub fn distance_squared(self, other: Vec2) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Scales the vector by a scalar value.
    #[inline(always)]
    pub fn scale(self, scalar: f32) -> Self {
        Vec2::new(self.x * scalar, self.y * scalar)
    }

    /// Returns a unit vector in the same direction.
    /// Returns a zero vector if the original vector's length is zero or very small.
    pub fn normalize_or_zero(self) -> Self {
        let len = self.length();
        if len > ZERO_LENGTH {
            self.scale(1.0 / len)
        } else {
            Vec2::zero()
        }
    }

    /// Rescales the vector to `max_length` if it is longer, preserving direction.
    /// Vectors already within the limit, and zero-length vectors, are returned unchanged.
    pub fn clamp_length_max(self, max_length: f32) -> Self {
        let len = self.length();
        if len <= max_length || len <= ZERO_LENGTH {
            return self;
        }
        self.scale(max_length / len)
    }

    #[inline(always)]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self { x: self.x + other.x, y: self.y + other.y }
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self { x: self.x - other.x, y: self.y - other.y }
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, scalar: f32) -> Self {
        Self { x: self.x * scalar, y: self.y * scalar }
    }
}

impl Div<f32> for Vec2 {
    type Output = Self;
    // Callers guard against a zero divisor (empty neighbor sets never reach here).
    fn div(self, scalar: f32) -> Self {
        Self { x: self.x / scalar, y: self.y / scalar }
    }
}

/// Converts an angle (in radians) to a unit vector.
pub fn angle_to_vec(angle_rad: f32) -> Vec2 {
    Vec2::new(angle_rad.cos(), angle_rad.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_length_rescales_long_vectors() {
        let v = Vec2::new(3.0, 4.0).clamp_length_max(2.0);
        assert!((v.length() - 2.0).abs() < 1e-6);
        assert!((v.x - 1.2).abs() < 1e-6);
        assert!((v.y - 1.6).abs() < 1e-6);
    }

    #[test]
    fn clamp_length_leaves_short_and_zero_vectors() {
        let short = Vec2::new(0.5, 0.5);
        assert_eq!(short.clamp_length_max(2.0), short);
        assert_eq!(Vec2::zero().clamp_length_max(0.0), Vec2::zero());
    }

    #[test]
    fn clamp_length_handles_huge_finite_components() {
        let v = Vec2::new(1e20, 0.0).clamp_length_max(2.0);
        assert_eq!(v, Vec2::new(2.0, 0.0));

        let v = Vec2::new(3e19, -4e19).clamp_length_max(2.0);
        assert!((v.length() - 2.0).abs() < 1e-5, "{v:?}");
        assert!((v.x - 1.2).abs() < 1e-5 && (v.y + 1.6).abs() < 1e-5, "{v:?}");
    }

    #[test]
    fn normalize_handles_huge_finite_components() {
        let n = Vec2::new(0.0, -3e30).normalize_or_zero();
        assert_eq!(n, Vec2::new(0.0, -1.0));
    }

    #[test]
    fn clamp_to_zero_speed_collapses_vector() {
        let v = Vec2::new(1.0, -1.0).clamp_length_max(0.0);
        assert_eq!(v, Vec2::zero());
    }

    #[test]
    fn normalize_zero_is_zero() {
        assert_eq!(Vec2::zero().normalize_or_zero(), Vec2::zero());
        let n = Vec2::new(0.0, -5.0).normalize_or_zero();
        assert_eq!(n, Vec2::new(0.0, -1.0));
    }

    #[test]
    fn non_finite_detected() {
        assert!(!Vec2::new(f32::NAN, 0.0).is_finite());
        assert!(!Vec2::new(0.0, f32::INFINITY).is_finite());
        assert!(Vec2::new(1.0, 2.0).is_finite());
    }
}
