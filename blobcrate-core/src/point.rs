//! Point types, axis tags and field sources

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// One of the three lattice axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    #[default]
    Z,
}

impl Axis {
    /// All axes in coordinate order
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Coordinate index of this axis (x = 0, y = 1, z = 2)
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// A point source contributing `strength / distance²` to the field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalarSource {
    pub position: Point3f,
    pub strength: f32,
}

impl ScalarSource {
    /// Create a new source
    pub fn new(position: Point3f, strength: f32) -> Self {
        Self { position, strength }
    }
}

impl Default for ScalarSource {
    fn default() -> Self {
        Self {
            position: Point3f::origin(),
            strength: 1.0,
        }
    }
}
