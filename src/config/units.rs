//! Unit types for physical quantities.
//!
//! Provides axis-indexed positions and type-safe feedrates so that mm/min
//! values from configuration are never handed to the motion layer unconverted.

use core::fmt;
use core::ops::{Add, Index, IndexMut, Mul, Sub};

use serde::Deserialize;

/// Linear feedrate in millimeters per minute (configuration unit).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize)]
#[serde(transparent)]
pub struct MmPerMin(pub f32);

impl MmPerMin {
    /// Create a new MmPerMin value.
    #[inline]
    pub const fn new(value: f32) -> Self {
        Self(value)
    }

    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> f32 {
        self.0
    }

    /// Convert to millimeters per second.
    #[inline]
    pub fn to_mm_per_sec(self) -> MmPerSec {
        MmPerSec(self.0 / 60.0)
    }
}

/// Linear feedrate in millimeters per second (motion unit).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize)]
#[serde(transparent)]
pub struct MmPerSec(pub f32);

impl MmPerSec {
    /// Create a new MmPerSec value.
    #[inline]
    pub const fn new(value: f32) -> Self {
        Self(value)
    }

    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> f32 {
        self.0
    }
}

impl Mul<f32> for MmPerSec {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self::Output {
        Self(self.0 * rhs)
    }
}

/// Cartesian machine axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Axis {
    /// X axis.
    X,
    /// Y axis.
    Y,
    /// Z axis.
    Z,
}

impl Axis {
    /// All axes in index order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Array index of the axis.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        };
        f.write_str(name)
    }
}

/// Direction of travel along an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Toward increasing coordinates.
    Positive,
    /// Toward decreasing coordinates.
    Negative,
}

impl Direction {
    /// Get the sign multiplier.
    #[inline]
    pub fn sign(self) -> f32 {
        match self {
            Direction::Positive => 1.0,
            Direction::Negative => -1.0,
        }
    }

    /// The opposite direction.
    #[inline]
    pub fn reversed(self) -> Self {
        match self {
            Direction::Positive => Direction::Negative,
            Direction::Negative => Direction::Positive,
        }
    }
}

/// A position (or per-axis quantity) in millimeters.
///
/// Deserializes from a three-element array, `[x, y, z]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(from = "[f32; 3]")]
pub struct XyzPos {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
    /// Z component.
    pub z: f32,
}

impl XyzPos {
    /// All components zero.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Create a new position.
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Copy with one axis replaced.
    #[inline]
    pub fn with(mut self, axis: Axis, value: f32) -> Self {
        self[axis] = value;
        self
    }

    /// Horizontal projection.
    #[inline]
    pub fn xy(self) -> XyPos {
        XyPos::new(self.x, self.y)
    }

    /// Clamp every component into `[min, max]`.
    pub fn clamp(self, min: XyzPos, max: XyzPos) -> Self {
        Self {
            x: self.x.clamp(min.x, max.x),
            y: self.y.clamp(min.y, max.y),
            z: self.z.clamp(min.z, max.z),
        }
    }
}

impl From<[f32; 3]> for XyzPos {
    fn from(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl Index<Axis> for XyzPos {
    type Output = f32;

    fn index(&self, axis: Axis) -> &f32 {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }
}

impl IndexMut<Axis> for XyzPos {
    fn index_mut(&mut self, axis: Axis) -> &mut f32 {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
            Axis::Z => &mut self.z,
        }
    }
}

impl Add for XyzPos {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for XyzPos {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for XyzPos {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// A horizontal bed position in millimeters, `[x, y]` in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(from = "[f32; 2]")]
pub struct XyPos {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
}

impl XyPos {
    /// Create a new position.
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance_to(self, other: XyPos) -> f32 {
        libm::hypotf(self.x - other.x, self.y - other.y)
    }
}

impl From<[f32; 2]> for XyPos {
    fn from(v: [f32; 2]) -> Self {
        Self::new(v[0], v[1])
    }
}

impl Add for XyPos {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for XyPos {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Extension trait for creating unit types from primitives.
pub trait UnitExt {
    /// Convert to MmPerMin.
    fn mm_per_min(self) -> MmPerMin;
    /// Convert to MmPerSec.
    fn mm_per_sec(self) -> MmPerSec;
}

impl UnitExt for f32 {
    #[inline]
    fn mm_per_min(self) -> MmPerMin {
        MmPerMin(self)
    }

    #[inline]
    fn mm_per_sec(self) -> MmPerSec {
        MmPerSec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedrate_conversion() {
        let f = 1200.0_f32.mm_per_min();
        assert!((f.to_mm_per_sec().value() - 20.0).abs() < 0.0001);
    }

    #[test]
    fn test_axis_indexing() {
        let mut p = XyzPos::new(1.0, 2.0, 3.0);
        assert_eq!(p[Axis::Y], 2.0);
        p[Axis::Z] += 1.0;
        assert_eq!(p.z, 4.0);
        assert_eq!(p.with(Axis::X, -1.0).x, -1.0);
    }

    #[test]
    fn test_direction_sign() {
        assert_eq!(Direction::Positive.sign(), 1.0);
        assert_eq!(Direction::Positive.reversed(), Direction::Negative);
        assert_eq!(Direction::Negative.sign(), -1.0);
    }

    #[test]
    fn test_clamp_to_bounds() {
        let p = XyzPos::new(-5.0, 250.0, 10.0);
        let c = p.clamp(XyzPos::ZERO, XyzPos::new(200.0, 200.0, 200.0));
        assert_eq!(c, XyzPos::new(0.0, 200.0, 10.0));
    }
}
