//! Core data structures and traits for blobcrate
//!
//! This crate provides the boundary types shared by the surface extractor and
//! its callers: field sources, the world/lattice transform, the per-frame mesh
//! buffer, configuration and errors.

pub mod point;
pub mod mesh;
pub mod traits;
pub mod transform;
pub mod config;
pub mod error;

pub use point::*;
pub use mesh::*;
pub use traits::*;
pub use transform::*;
pub use config::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix4, Point3, Vector3};
