//! Cube classification, edge interpolation and triangle emission
//!
//! A cube is classified from its eight cached corner intensities. Crossed
//! edges get one vertex per frame, shared by every cube around the edge;
//! triangles then reference those vertices in lookup-table order.

use crate::field::ScalarField;
use crate::frame::Frame;
use crate::lattice::{CubeId, EdgeId, Lattice};
use crate::tables::{corner_pattern, crossed_edges, triangles};
use blobcrate_core::{Axis, LocalTransform, MeshBuffer, Point3f, Result};

/// Processes cubes for one frame against one field and threshold
#[derive(Debug, Clone, Copy)]
pub struct CubeProcessor<'p, 's> {
    field: &'p ScalarField<'s>,
    frame: Frame,
    threshold: f32,
    to_world: Option<&'p LocalTransform>,
    reverse_winding: bool,
}

impl<'p, 's> CubeProcessor<'p, 's> {
    /// Emit lattice-space geometry in table winding order
    pub fn new(field: &'p ScalarField<'s>, frame: Frame, threshold: f32) -> Self {
        Self {
            field,
            frame,
            threshold,
            to_world: None,
            reverse_winding: false,
        }
    }

    /// Map emitted vertices and normals through `transform` into world space
    pub fn with_world_output(mut self, transform: &'p LocalTransform) -> Self {
        self.to_world = Some(transform);
        self
    }

    /// Emit each triangle's indices in reverse table order
    pub fn with_reversed_winding(mut self, reverse: bool) -> Self {
        self.reverse_winding = reverse;
        self
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn field(&self) -> &'p ScalarField<'s> {
        self.field
    }

    /// Corner pattern of `cube`; bit `b` is set iff corner `b` is inside
    pub fn classify(&self, lattice: &mut Lattice, cube: CubeId) -> u8 {
        let corners = lattice.cube(cube).corners();
        let intensities =
            corners.map(|point| lattice.point_intensity(point, self.frame, self.field));
        corner_pattern(&intensities, self.threshold)
    }

    /// Classify `cube`, emit its geometry and stamp it as visited.
    ///
    /// Returns whether the surface crosses the cube.
    pub fn process(
        &self,
        lattice: &mut Lattice,
        cube: CubeId,
        mesh: &mut MeshBuffer,
    ) -> Result<bool> {
        lattice.mark_visited(cube, self.frame);
        let pattern = self.classify(lattice, cube);
        let crossed = crossed_edges(pattern);
        if crossed == 0 {
            return Ok(false);
        }

        let edges = lattice.cube(cube).edges();
        let mut vertices = [0u32; 12];
        for (slot, &edge) in edges.iter().enumerate() {
            if crossed & (1 << slot) != 0 {
                vertices[slot] = self.edge_vertex(lattice, edge, mesh)?;
            }
        }

        for [a, b, c] in triangles(pattern) {
            let triangle = if self.reverse_winding {
                [vertices[c], vertices[b], vertices[a]]
            } else {
                [vertices[a], vertices[b], vertices[c]]
            };
            mesh.push_triangle(triangle)?;
        }
        Ok(true)
    }

    /// Output vertex for a crossed edge, created on first use in this frame
    fn edge_vertex(&self, lattice: &mut Lattice, id: EdgeId, mesh: &mut MeshBuffer) -> Result<u32> {
        let edge = lattice.edge(id);
        if edge.stamp().is_current(self.frame) {
            return Ok(edge.vertex());
        }
        let [from, to] = edge.endpoints();
        let axis = edge.axis();

        let from_position = lattice.point(from).position();
        let to_position = lattice.point(to).position();
        let from_value = lattice.point_intensity(from, self.frame, self.field);
        let to_value = lattice.point_intensity(to, self.frame, self.field);

        let crossing = crossing_point(
            from_position,
            to_position,
            from_value,
            to_value,
            self.threshold,
            axis,
        );
        let normal = self.field.normal(&crossing);
        let (position, normal) = match self.to_world {
            Some(transform) => (
                transform.to_world_point(&crossing),
                transform.to_world_normal(&normal),
            ),
            None => (crossing, normal),
        };

        let vertex = mesh.push_vertex(position, normal)?;
        lattice.edge_mut(id).record_crossing(self.frame, crossing, vertex);
        Ok(vertex)
    }
}

/// Point where the field reaches `threshold` along an axis-aligned edge.
///
/// Only the `axis` coordinate moves, and it never leaves the span of the two
/// endpoints. An infinite endpoint (a source sitting on the lattice point)
/// puts the crossing at the other endpoint.
pub fn crossing_point(
    from: Point3f,
    to: Point3f,
    from_value: f32,
    to_value: f32,
    threshold: f32,
    axis: Axis,
) -> Point3f {
    let t = if from_value.is_infinite() {
        1.0
    } else {
        (threshold - from_value) / (to_value - from_value)
    };
    let t = if t.is_nan() { 0.5 } else { t.clamp(0.0, 1.0) };

    let a = axis.index();
    let (low, high) = if from[a] <= to[a] {
        (from[a], to[a])
    } else {
        (to[a], from[a])
    };
    let mut point = from;
    point[a] = (from[a] + t * (to[a] - from[a])).clamp(low, high);
    point
}
