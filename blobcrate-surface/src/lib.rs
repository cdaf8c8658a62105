//! Frame-coherent metaball isosurface extraction
//!
//! This crate polygonizes the inverse-square field of a set of point sources
//! with marching cubes over a persistent lattice. Only the cubes the surface
//! passes through are classified: each source seeds a probe, and a flood fill
//! follows the surface from the first crossing it finds. Per-frame stamps on
//! lattice points, edges and cubes stand in for clearing caches between
//! frames.
//!
//! ```no_run
//! use blobcrate_core::{LocalTransform, Point3f, ScalarSource, SurfaceConfig};
//! use blobcrate_surface::SurfaceExtractor;
//!
//! let mut extractor = SurfaceExtractor::new(SurfaceConfig::new([32, 32, 32], 8.0))?;
//! let sources = [ScalarSource::new(Point3f::origin(), 0.1)];
//! let stats = extractor.extract(&sources, &LocalTransform::identity())?;
//! println!("{} triangles", stats.triangles);
//! # Ok::<(), blobcrate_core::Error>(())
//! ```

pub mod extractor;
pub mod field;
pub mod frame;
pub mod lattice;
pub mod marching_cubes;
pub mod tables;
pub mod tracker;

pub use extractor::*;
pub use field::*;
pub use frame::*;
pub use lattice::*;
pub use marching_cubes::*;
pub use tracker::*;
