//! Mapping between world space and lattice-local space

use crate::error::{Error, Result};
use crate::point::*;
use nalgebra::{Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// World ↔ lattice transform.
///
/// The lattice lives in a normalized local space spanning `[-0.5, 0.5]^3`.
/// Both directions are stored so that neither the per-source mapping nor the
/// per-vertex output mapping pays for an inversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalTransform {
    world_to_local: Matrix4<f32>,
    local_to_world: Matrix4<f32>,
}

impl LocalTransform {
    /// World space and lattice space coincide
    pub fn identity() -> Self {
        Self {
            world_to_local: Matrix4::identity(),
            local_to_world: Matrix4::identity(),
        }
    }

    /// Build from a world→local matrix
    pub fn from_world_to_local(world_to_local: Matrix4<f32>) -> Result<Self> {
        let local_to_world = world_to_local.try_inverse().ok_or_else(|| {
            Error::InvalidTransform("world-to-local matrix is singular".to_string())
        })?;
        Ok(Self {
            world_to_local,
            local_to_world,
        })
    }

    /// Build from a local→world matrix (the lattice object's placement)
    pub fn from_local_to_world(local_to_world: Matrix4<f32>) -> Result<Self> {
        let world_to_local = local_to_world.try_inverse().ok_or_else(|| {
            Error::InvalidTransform("local-to-world matrix is singular".to_string())
        })?;
        Ok(Self {
            world_to_local,
            local_to_world,
        })
    }

    /// Place the lattice as an axis-aligned box of `size` centered at `center`
    pub fn from_bounds(center: Point3f, size: Vector3f) -> Result<Self> {
        if size.iter().any(|s| !s.is_finite() || *s == 0.0) {
            return Err(Error::InvalidTransform(format!(
                "lattice box size must be finite and non-zero, got {:?}",
                size
            )));
        }
        let local_to_world =
            Matrix4::new_translation(&center.coords) * Matrix4::new_nonuniform_scaling(&size);
        Self::from_local_to_world(local_to_world)
    }

    /// Map a world-space point into lattice space
    pub fn to_local_point(&self, point: &Point3f) -> Point3f {
        Point3::from_homogeneous(self.world_to_local * point.to_homogeneous()).unwrap_or(*point)
    }

    /// Map a lattice-space point back into world space
    pub fn to_world_point(&self, point: &Point3f) -> Point3f {
        Point3::from_homogeneous(self.local_to_world * point.to_homogeneous()).unwrap_or(*point)
    }

    /// Map a lattice-space normal into world space (inverse transpose), renormalized
    pub fn to_world_normal(&self, normal: &Vector3f) -> Vector3f {
        let normal_matrix = self.world_to_local.fixed_view::<3, 3>(0, 0).transpose();
        (normal_matrix * normal)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::zeros)
    }

    pub fn world_to_local(&self) -> &Matrix4<f32> {
        &self.world_to_local
    }

    pub fn local_to_world(&self) -> &Matrix4<f32> {
        &self.local_to_world
    }
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bounds_round_trip() {
        let center = Point3f::new(10.0, 0.0, -4.0);
        let transform = LocalTransform::from_bounds(center, Vector3f::new(20.0, 4.0, 8.0)).unwrap();

        let local = transform.to_local_point(&Point3f::new(20.0, 2.0, 0.0));
        assert_relative_eq!(local, Point3f::new(0.5, 0.5, 0.5), epsilon = 1e-6);

        let world = transform.to_world_point(&Point3f::new(-0.5, 0.0, 0.0));
        assert_relative_eq!(world, Point3f::new(0.0, 0.0, -4.0), epsilon = 1e-5);
    }

    #[test]
    fn test_normals_stay_perpendicular_under_nonuniform_scale() {
        let transform =
            LocalTransform::from_bounds(Point3f::origin(), Vector3f::new(4.0, 1.0, 1.0)).unwrap();

        // A plane x + y = c in local space; its normal is (1, 1, 0)
        let normal = transform.to_world_normal(&Vector3f::new(1.0, 1.0, 0.0).normalize());
        let tangent = transform.local_to_world().fixed_view::<3, 3>(0, 0)
            * Vector3f::new(1.0, -1.0, 0.0);

        assert_relative_eq!(normal.dot(&tangent), 0.0, epsilon = 1e-5);
        assert_relative_eq!(normal.norm(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_degenerate_bounds_rejected() {
        let result = LocalTransform::from_bounds(Point3f::origin(), Vector3f::new(1.0, 0.0, 1.0));
        assert!(matches!(result, Err(Error::InvalidTransform(_))));
    }

    #[test]
    fn test_singular_matrix_rejected() {
        assert!(LocalTransform::from_world_to_local(Matrix4::zeros()).is_err());
    }
}
