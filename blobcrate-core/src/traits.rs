//! Core traits for blobcrate

use crate::point::*;

/// Anything that can act as a field source for one frame.
///
/// Positions are read in world space; the extractor maps them into lattice
/// space once per frame.
pub trait FieldSource {
    /// World-space position of the source
    fn position(&self) -> Point3f;

    /// Strength (or radius) of the source
    fn strength(&self) -> f32;
}

impl FieldSource for ScalarSource {
    fn position(&self) -> Point3f {
        self.position
    }

    fn strength(&self) -> f32 {
        self.strength
    }
}

impl<T: FieldSource + ?Sized> FieldSource for &T {
    fn position(&self) -> Point3f {
        (**self).position()
    }

    fn strength(&self) -> f32 {
        (**self).strength()
    }
}

impl FieldSource for (Point3f, f32) {
    fn position(&self) -> Point3f {
        self.0
    }

    fn strength(&self) -> f32 {
        self.1
    }
}
