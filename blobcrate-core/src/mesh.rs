//! Per-frame mesh assembly

use crate::config::CapacityPolicy;
use crate::error::{BufferKind, Error, Result};
use crate::point::*;
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Interleaved vertex record for upload to a renderer
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// An owned triangle mesh with per-vertex normals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceMesh {
    pub vertices: Vec<Point3f>,
    pub normals: Vec<Vector3f>,
    pub faces: Vec<[u32; 3]>,
}

impl SurfaceMesh {
    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }
}

/// Growable vertex, normal and triangle storage reused across frames.
///
/// Contents live for one frame; `reset` truncates to zero length while the
/// backing allocation is kept. The reserved sizes are the budgets the
/// `CapacityPolicy` is enforced against.
#[derive(Debug, Clone)]
pub struct MeshBuffer {
    vertices: Vec<Point3f>,
    normals: Vec<Vector3f>,
    triangles: Vec<[u32; 3]>,
    vertex_limit: usize,
    triangle_limit: usize,
    policy: CapacityPolicy,
}

impl MeshBuffer {
    /// Reserve room for `vertices` vertices and `triangles` triangles
    pub fn with_capacity(vertices: usize, triangles: usize, policy: CapacityPolicy) -> Self {
        Self {
            vertices: Vec::with_capacity(vertices),
            normals: Vec::with_capacity(vertices),
            triangles: Vec::with_capacity(triangles),
            vertex_limit: vertices,
            triangle_limit: triangles,
            policy,
        }
    }

    /// Drop the previous frame's contents, keeping the storage
    pub fn reset(&mut self) {
        self.vertices.clear();
        self.normals.clear();
        self.triangles.clear();
    }

    /// Append a vertex and its normal, returning the vertex index
    pub fn push_vertex(&mut self, position: Point3f, normal: Vector3f) -> Result<u32> {
        let index = self.vertices.len();
        if index >= self.vertex_limit {
            self.vertex_limit = grow_limit(
                BufferKind::Vertices,
                self.policy,
                self.vertex_limit,
            )?;
        }
        let index = u32::try_from(index).map_err(|_| Error::CapacityExceeded {
            buffer: BufferKind::Vertices,
            capacity: u32::MAX as usize,
        })?;
        self.vertices.push(position);
        self.normals.push(normal);
        Ok(index)
    }

    /// Append one triangle
    pub fn push_triangle(&mut self, triangle: [u32; 3]) -> Result<()> {
        debug_assert!(triangle.iter().all(|&v| (v as usize) < self.vertices.len()));
        if self.triangles.len() >= self.triangle_limit {
            self.triangle_limit = grow_limit(
                BufferKind::Triangles,
                self.policy,
                self.triangle_limit,
            )?;
        }
        self.triangles.push(triangle);
        Ok(())
    }

    pub fn vertices(&self) -> &[Point3f] {
        &self.vertices
    }

    pub fn normals(&self) -> &[Vector3f] {
        &self.normals
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    /// Flat triangle index list, three entries per triangle
    pub fn indices(&self) -> &[u32] {
        bytemuck::cast_slice(&self.triangles)
    }

    /// Valid vertex count for this frame
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Valid triangle count for this frame
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Valid index count for this frame
    pub fn index_count(&self) -> usize {
        self.triangles.len() * 3
    }

    /// Current vertex budget
    pub fn vertex_capacity(&self) -> usize {
        self.vertex_limit
    }

    /// Current triangle budget
    pub fn triangle_capacity(&self) -> usize {
        self.triangle_limit
    }

    pub fn policy(&self) -> CapacityPolicy {
        self.policy
    }

    /// Check if nothing was emitted this frame
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Write interleaved position/normal records into `out`, reusing its storage
    pub fn interleave(&self, out: &mut Vec<MeshVertex>) {
        out.clear();
        out.extend(
            self.vertices
                .iter()
                .zip(&self.normals)
                .map(|(p, n)| MeshVertex {
                    position: [p.x, p.y, p.z],
                    normal: [n.x, n.y, n.z],
                }),
        );
    }

    /// Copy the valid contents into an owned mesh
    pub fn to_surface_mesh(&self) -> SurfaceMesh {
        SurfaceMesh {
            vertices: self.vertices.clone(),
            normals: self.normals.clone(),
            faces: self.triangles.clone(),
        }
    }
}

impl Default for MeshBuffer {
    fn default() -> Self {
        Self::with_capacity(0, 0, CapacityPolicy::Grow)
    }
}

fn grow_limit(buffer: BufferKind, policy: CapacityPolicy, limit: usize) -> Result<usize> {
    match policy {
        CapacityPolicy::Fixed => Err(Error::CapacityExceeded {
            buffer,
            capacity: limit,
        }),
        CapacityPolicy::Grow => {
            let grown = (limit * 2).max(64);
            log::warn!(
                "{} buffer passed its reserved size {}, growing to {}",
                buffer,
                limit,
                grown
            );
            Ok(grown)
        }
    }
}
