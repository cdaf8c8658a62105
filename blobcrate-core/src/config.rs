//! Extraction configuration

use crate::error::{Error, Result};
use crate::point::Axis;
use serde::{Deserialize, Serialize};

/// Smallest vertex reservation made when no capacity is configured
pub const MIN_VERTEX_ESTIMATE: usize = 1024;

/// Smallest triangle reservation made when no capacity is configured
pub const MIN_TRIANGLE_ESTIMATE: usize = 2048;

/// How surface cubes are discovered each frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Traversal {
    /// Seed probe from every source followed by a 6-connected flood fill
    #[default]
    Tracked,
    /// Process every cube of the lattice once
    FullScan,
}

/// What happens when an output buffer reaches its reserved size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityPolicy {
    /// Grow the backing storage and keep going
    #[default]
    Grow,
    /// Refuse the write with `Error::CapacityExceeded`
    Fixed,
}

/// Coordinate space of emitted vertices and normals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputSpace {
    /// Lattice-local space, `[-0.5, 0.5]^3`
    #[default]
    Local,
    /// Mapped back through the local→world transform
    World,
}

/// Configuration for surface extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Cube counts along x, y and z
    pub cubes: [usize; 3],
    /// Corner is inside the surface iff its intensity is strictly greater
    pub threshold: f32,
    /// Axis walked by the seed probe
    pub probe_axis: Axis,
    /// Cube discovery strategy
    pub traversal: Traversal,
    /// Buffer overflow behaviour
    pub capacity: CapacityPolicy,
    /// Reserved vertex count (estimated from the lattice if unset)
    pub vertex_capacity: Option<usize>,
    /// Reserved triangle count (estimated from the lattice if unset)
    pub triangle_capacity: Option<usize>,
    /// Space in which vertices are emitted
    pub output_space: OutputSpace,
    /// Emit triangle indices in reverse table order
    pub reverse_winding: bool,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            cubes: [40, 40, 40],
            threshold: 8.0,
            probe_axis: Axis::Z,
            traversal: Traversal::Tracked,
            capacity: CapacityPolicy::Grow,
            vertex_capacity: None,
            triangle_capacity: None,
            output_space: OutputSpace::Local,
            reverse_winding: false,
        }
    }
}

impl SurfaceConfig {
    /// Lattice of `cubes` with the given threshold and defaults elsewhere
    pub fn new(cubes: [usize; 3], threshold: f32) -> Self {
        Self {
            cubes,
            threshold,
            ..Default::default()
        }
    }

    /// Total number of cubes in the lattice
    pub fn cube_count(&self) -> usize {
        self.cubes.iter().product()
    }

    /// Reserved vertex count
    pub fn vertex_budget(&self) -> usize {
        self.vertex_capacity
            .unwrap_or_else(|| (self.cube_count() / 7).max(MIN_VERTEX_ESTIMATE))
    }

    /// Reserved triangle count
    pub fn triangle_budget(&self) -> usize {
        self.triangle_capacity
            .unwrap_or_else(|| (self.cube_count() / 4).max(MIN_TRIANGLE_ESTIMATE))
    }

    /// Check the configuration for values the extractor cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.cubes.iter().any(|&n| n == 0) {
            return Err(Error::InvalidConfig(format!(
                "every lattice dimension must be at least one cube, got {:?}",
                self.cubes
            )));
        }
        let points: Option<usize> = self
            .cubes
            .iter()
            .try_fold(1usize, |acc, &n| n.checked_add(1).and_then(|m| acc.checked_mul(m)));
        match points {
            Some(n) if n <= u32::MAX as usize => {}
            _ => {
                return Err(Error::InvalidConfig(format!(
                    "lattice {:?} is too large to address",
                    self.cubes
                )))
            }
        }
        if !self.threshold.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "threshold must be finite, got {}",
                self.threshold
            )));
        }
        if self.capacity == CapacityPolicy::Fixed
            && (self.vertex_budget() == 0 || self.triangle_budget() == 0)
        {
            return Err(Error::InvalidConfig(
                "fixed capacity requires non-zero vertex and triangle budgets".to_string(),
            ));
        }
        Ok(())
    }
}
