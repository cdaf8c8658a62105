//! Inverse-square scalar field over a set of point sources

use blobcrate_core::{FieldSource, LocalTransform, Point3f, ScalarSource, Vector3f};
use nalgebra::Vector3;
use std::cell::Cell;

/// Field of `Σ strength / |p - position|²` in lattice space.
///
/// A point coinciding with a source evaluates to infinity; that point is
/// simply inside the surface.
#[derive(Debug)]
pub struct ScalarField<'a> {
    sources: &'a [ScalarSource],
    evaluations: Cell<usize>,
}

impl<'a> ScalarField<'a> {
    /// Field over sources already expressed in lattice space
    pub fn new(sources: &'a [ScalarSource]) -> Self {
        Self {
            sources,
            evaluations: Cell::new(0),
        }
    }

    pub fn sources(&self) -> &'a [ScalarSource] {
        self.sources
    }

    /// Field intensity at `point`
    pub fn intensity(&self, point: &Point3f) -> f32 {
        self.evaluations.set(self.evaluations.get() + 1);
        self.sources
            .iter()
            .map(|source| source.strength / (point - source.position).norm_squared())
            .sum()
    }

    /// Unit direction of steepest descent at `point`, pointing away from the sources.
    ///
    /// Recomputed on every call; crossing points are off-lattice and unique
    /// per edge. Returns the zero vector where contributions cancel.
    pub fn normal(&self, point: &Point3f) -> Vector3f {
        let direction = self
            .sources
            .iter()
            .fold(Vector3::zeros(), |acc: Vector3f, source| {
                let offset = point - source.position;
                acc + offset * (source.strength / offset.norm_squared())
            });
        direction
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::zeros)
    }

    /// Number of intensity evaluations made through this field
    pub fn evaluations(&self) -> usize {
        self.evaluations.get()
    }
}

/// Map world-space sources into lattice space, reusing `out`'s storage
pub fn localize_sources<S: FieldSource>(
    sources: &[S],
    transform: &LocalTransform,
    out: &mut Vec<ScalarSource>,
) {
    out.clear();
    out.extend(sources.iter().map(|source| {
        ScalarSource::new(transform.to_local_point(&source.position()), source.strength())
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_source_intensity() {
        let sources = [ScalarSource::new(Point3f::origin(), 1.0)];
        let field = ScalarField::new(&sources);

        assert_relative_eq!(field.intensity(&Point3f::new(0.5, 0.0, 0.0)), 4.0);
        assert_relative_eq!(field.intensity(&Point3f::new(0.0, 0.0, 2.0)), 0.25);
        assert_eq!(field.evaluations(), 2);
    }

    #[test]
    fn test_contributions_sum() {
        let sources = [
            ScalarSource::new(Point3f::new(-1.0, 0.0, 0.0), 1.0),
            ScalarSource::new(Point3f::new(1.0, 0.0, 0.0), 2.0),
        ];
        let field = ScalarField::new(&sources);
        assert_relative_eq!(field.intensity(&Point3f::origin()), 3.0);
    }

    #[test]
    fn test_singularity_is_infinite() {
        let sources = [ScalarSource::new(Point3f::new(0.25, 0.25, 0.25), 1.0)];
        let field = ScalarField::new(&sources);
        let value = field.intensity(&Point3f::new(0.25, 0.25, 0.25));
        assert!(value.is_infinite() && value > 0.0);
        assert!(value > 1.0e9);
    }

    #[test]
    fn test_empty_field_is_zero() {
        let field = ScalarField::new(&[]);
        assert_eq!(field.intensity(&Point3f::new(0.1, 0.2, 0.3)), 0.0);
        assert_eq!(field.normal(&Point3f::new(0.1, 0.2, 0.3)), Vector3f::zeros());
    }

    #[test]
    fn test_normal_points_away_from_source() {
        let center = Point3f::new(0.1, -0.2, 0.0);
        let sources = [ScalarSource::new(center, 1.5)];
        let field = ScalarField::new(&sources);
        let point = Point3f::new(0.4, 0.2, 0.0);

        let normal = field.normal(&point);
        assert_relative_eq!(normal.norm(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(normal, (point - center).normalize(), epsilon = 1e-6);
        assert_eq!(field.evaluations(), 0);
    }

    #[test]
    fn test_normal_cancels_between_equal_sources() {
        let sources = [
            ScalarSource::new(Point3f::new(-0.5, 0.0, 0.0), 1.0),
            ScalarSource::new(Point3f::new(0.5, 0.0, 0.0), 1.0),
        ];
        let field = ScalarField::new(&sources);
        assert_eq!(field.normal(&Point3f::origin()), Vector3f::zeros());
    }

    #[test]
    fn test_localize_sources_applies_transform() {
        let center = Point3f::new(5.0, 0.0, 0.0);
        let size = Vector3f::new(10.0, 10.0, 10.0);
        let transform = LocalTransform::from_bounds(center, size).unwrap();
        let world = [(Point3f::new(10.0, 5.0, 0.0), 3.0f32)];
        let mut local = vec![ScalarSource::default(); 4];

        localize_sources(&world, &transform, &mut local);

        assert_eq!(local.len(), 1);
        assert_relative_eq!(local[0].position, Point3f::new(0.5, 0.5, 0.0), epsilon = 1e-6);
        assert_eq!(local[0].strength, 3.0);
    }
}
