//! Persistent lattice of points, edges and cubes
//!
//! The lattice is an arena: points, edges and cubes live in flat vectors and
//! refer to one another through copyable handles. Every geometric edge exists
//! exactly once, so neighbouring cubes share the same `EdgeId` (and therefore
//! the same cached crossing vertex) on their common face.

use crate::field::ScalarField;
use crate::frame::{Frame, Stamp};
use crate::tables::{CORNER_OFFSETS, EDGE_AXES, EDGE_CORNERS};
use blobcrate_core::{Axis, Error, Point3f, Result};
use itertools::iproduct;
use ndarray::Array3;
use rayon::prelude::*;

macro_rules! lattice_handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl $name {
            /// Position of the entity in its arena
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

lattice_handle!(
    /// Handle to a lattice point
    PointId
);
lattice_handle!(
    /// Handle to a lattice edge
    EdgeId
);
lattice_handle!(
    /// Handle to a lattice cube
    CubeId
);

/// A fixed sample location with its per-frame cached intensity
#[derive(Debug, Clone)]
pub struct LatticePoint {
    position: Point3f,
    coords: [usize; 3],
    intensity: f32,
    stamp: Stamp,
}

impl LatticePoint {
    pub fn position(&self) -> Point3f {
        self.position
    }

    pub fn coords(&self) -> [usize; 3] {
        self.coords
    }

    /// Intensity cached in the frame given by `stamp()`
    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn stamp(&self) -> Stamp {
        self.stamp
    }
}

/// An axis-aligned segment between two neighbouring points
#[derive(Debug, Clone)]
pub struct LatticeEdge {
    endpoints: [PointId; 2],
    axis: Axis,
    crossing: Point3f,
    vertex: u32,
    stamp: Stamp,
}

impl LatticeEdge {
    /// Lower and upper endpoint along `axis()`
    pub fn endpoints(&self) -> [PointId; 2] {
        self.endpoints
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// Surface crossing recorded in the frame given by `stamp()`
    pub fn crossing(&self) -> Point3f {
        self.crossing
    }

    /// Output vertex index recorded in the frame given by `stamp()`
    pub fn vertex(&self) -> u32 {
        self.vertex
    }

    pub fn stamp(&self) -> Stamp {
        self.stamp
    }

    pub(crate) fn record_crossing(&mut self, frame: Frame, crossing: Point3f, vertex: u32) {
        self.crossing = crossing;
        self.vertex = vertex;
        self.stamp.touch(frame);
    }
}

/// One grid cell: eight corner points and twelve edges in marching cubes order
#[derive(Debug, Clone)]
pub struct LatticeCube {
    corners: [PointId; 8],
    edges: [EdgeId; 12],
    coords: [usize; 3],
    stamp: Stamp,
}

impl LatticeCube {
    pub fn corners(&self) -> [PointId; 8] {
        self.corners
    }

    pub fn edges(&self) -> [EdgeId; 12] {
        self.edges
    }

    pub fn coords(&self) -> [usize; 3] {
        self.coords
    }

    /// Last frame in which this cube was classified
    pub fn stamp(&self) -> Stamp {
        self.stamp
    }
}

/// The lattice for one set of cube dimensions
#[derive(Debug, Clone)]
pub struct Lattice {
    dims: [usize; 3],
    points: Vec<LatticePoint>,
    edges: Vec<LatticeEdge>,
    cubes: Vec<LatticeCube>,
}

impl Lattice {
    /// Build the lattice for `dims` cubes along x, y and z.
    ///
    /// Points span `[-0.5, 0.5]^3`. Edges are created the first time a cube
    /// needs them and looked up by every later cube that shares them.
    pub fn new(dims: [usize; 3]) -> Result<Self> {
        if dims.iter().any(|&n| n == 0) {
            return Err(Error::InvalidConfig(format!(
                "lattice needs at least one cube per axis, got {:?}",
                dims
            )));
        }
        let [nx, ny, nz] = dims;
        let too_large =
            || Error::InvalidConfig(format!("lattice {:?} is too large to address", dims));
        let [px, py, pz] = match [nx, ny, nz].map(|n| n.checked_add(1)) {
            [Some(px), Some(py), Some(pz)] => [px, py, pz],
            _ => return Err(too_large()),
        };
        let count = |factors: [usize; 3]| {
            factors
                .iter()
                .try_fold(1usize, |acc, &n| acc.checked_mul(n))
        };
        let point_count = count([px, py, pz]).ok_or_else(too_large)?;
        let edge_count = [count([nx, py, pz]), count([px, ny, pz]), count([px, py, nz])]
            .into_iter()
            .try_fold(0usize, |acc, n| acc.checked_add(n?))
            .ok_or_else(too_large)?;
        if edge_count > u32::MAX as usize {
            return Err(Error::InvalidConfig(format!(
                "lattice {:?} has too many edges to address",
                dims
            )));
        }

        let points: Vec<LatticePoint> = (0..point_count)
            .into_par_iter()
            .map(|index| {
                let i = index % (nx + 1);
                let j = (index / (nx + 1)) % (ny + 1);
                let k = index / ((nx + 1) * (ny + 1));
                LatticePoint {
                    position: Point3f::new(
                        i as f32 / nx as f32 - 0.5,
                        j as f32 / ny as f32 - 0.5,
                        k as f32 / nz as f32 - 0.5,
                    ),
                    coords: [i, j, k],
                    intensity: 0.0,
                    stamp: Stamp::default(),
                }
            })
            .collect();

        let mut lattice = Self {
            dims,
            points,
            edges: Vec::with_capacity(edge_count),
            cubes: Vec::with_capacity(nx * ny * nz),
        };

        // One slot per (axis, lower endpoint)
        let mut slots: [Array3<Option<EdgeId>>; 3] =
            std::array::from_fn(|_| Array3::from_elem((nx + 1, ny + 1, nz + 1), None));

        for (k, j, i) in iproduct!(0..nz, 0..ny, 0..nx) {
            let coords = [i, j, k];
            let corners: [PointId; 8] = std::array::from_fn(|corner| {
                let offset = CORNER_OFFSETS[corner];
                lattice.point_id([i + offset[0], j + offset[1], k + offset[2]])
            });

            let mut edges = [EdgeId(0); 12];
            for (edge, &[a, b]) in EDGE_CORNERS.iter().enumerate() {
                let axis = EDGE_AXES[edge];
                let (lower, upper) = if corners[a] < corners[b] {
                    (corners[a], corners[b])
                } else {
                    (corners[b], corners[a])
                };
                let slot = &mut slots[axis.index()][lattice.points[lower.index()].coords];
                edges[edge] = match *slot {
                    Some(id) => {
                        let ends = [corners[a], corners[b]];
                        check_edge(&lattice.edges[id.index()], coords, edge, ends)?;
                        id
                    }
                    None => {
                        let id = EdgeId(lattice.edges.len() as u32);
                        lattice.edges.push(LatticeEdge {
                            endpoints: [lower, upper],
                            axis,
                            crossing: Point3f::origin(),
                            vertex: 0,
                            stamp: Stamp::default(),
                        });
                        *slot = Some(id);
                        id
                    }
                };
            }

            lattice.cubes.push(LatticeCube {
                corners,
                edges,
                coords,
                stamp: Stamp::default(),
            });
        }

        debug_assert_eq!(lattice.edges.len(), edge_count);
        log::debug!(
            "built lattice {:?}: {} points, {} edges, {} cubes",
            dims,
            lattice.points.len(),
            lattice.edges.len(),
            lattice.cubes.len()
        );
        Ok(lattice)
    }

    /// Cube counts along x, y and z
    pub fn dimensions(&self) -> [usize; 3] {
        self.dims
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn cube_count(&self) -> usize {
        self.cubes.len()
    }

    pub fn point(&self, id: PointId) -> &LatticePoint {
        &self.points[id.index()]
    }

    pub fn edge(&self, id: EdgeId) -> &LatticeEdge {
        &self.edges[id.index()]
    }

    pub fn cube(&self, id: CubeId) -> &LatticeCube {
        &self.cubes[id.index()]
    }

    pub fn points(&self) -> &[LatticePoint] {
        &self.points
    }

    pub fn edges(&self) -> &[LatticeEdge] {
        &self.edges
    }

    pub fn cubes(&self) -> &[LatticeCube] {
        &self.cubes
    }

    /// Every cube handle in arena order
    pub fn cube_ids(&self) -> impl Iterator<Item = CubeId> {
        (0..self.cubes.len() as u32).map(CubeId)
    }

    /// Point at lattice coordinates, if inside the lattice
    pub fn point_at(&self, coords: [usize; 3]) -> Option<PointId> {
        let [nx, ny, nz] = self.dims;
        (coords[0] <= nx && coords[1] <= ny && coords[2] <= nz).then(|| self.point_id(coords))
    }

    /// Cube at lattice coordinates, if inside the lattice
    pub fn cube_at(&self, coords: [usize; 3]) -> Option<CubeId> {
        let [nx, ny, nz] = self.dims;
        (coords[0] < nx && coords[1] < ny && coords[2] < nz).then(|| self.cube_id(coords))
    }

    /// Cube containing the lattice-space position `local`.
    ///
    /// Positions outside `[-0.5, 0.5)^3` clamp to the nearest boundary cube.
    pub fn cube_containing(&self, local: &Point3f) -> CubeId {
        let coords: [usize; 3] = std::array::from_fn(|axis| {
            let n = self.dims[axis];
            let cell = ((local[axis] + 0.5) * n as f32).floor();
            // NaN saturates to zero on the cast
            cell.clamp(0.0, (n - 1) as f32) as usize
        });
        self.cube_id(coords)
    }

    /// The cube one step along `axis`, in the positive or negative direction
    pub fn neighbor(&self, cube: CubeId, axis: Axis, positive: bool) -> Option<CubeId> {
        let mut coords = self.cubes[cube.index()].coords;
        let c = &mut coords[axis.index()];
        if positive {
            *c += 1;
        } else {
            *c = c.checked_sub(1)?;
        }
        self.cube_at(coords)
    }

    /// Face-adjacent cubes that exist within the lattice
    pub fn neighbors(&self, cube: CubeId) -> impl Iterator<Item = CubeId> + '_ {
        iproduct!(Axis::ALL, [false, true])
            .filter_map(move |(axis, positive)| self.neighbor(cube, axis, positive))
    }

    /// Re-run the construction self-check over every cube
    pub fn verify_topology(&self) -> Result<()> {
        for cube in &self.cubes {
            for (edge, &[a, b]) in EDGE_CORNERS.iter().enumerate() {
                check_edge(
                    &self.edges[cube.edges[edge].index()],
                    cube.coords,
                    edge,
                    [cube.corners[a], cube.corners[b]],
                )?;
            }
        }
        Ok(())
    }

    /// Intensity at a point, evaluated at most once per frame
    pub fn point_intensity(&mut self, id: PointId, frame: Frame, field: &ScalarField) -> f32 {
        let point = &mut self.points[id.index()];
        if !point.stamp.is_current(frame) {
            point.intensity = field.intensity(&point.position);
            point.stamp.touch(frame);
        }
        point.intensity
    }

    /// Whether the cube was already classified in `frame`
    pub fn is_visited(&self, cube: CubeId, frame: Frame) -> bool {
        self.cubes[cube.index()].stamp.is_current(frame)
    }

    pub(crate) fn mark_visited(&mut self, cube: CubeId, frame: Frame) {
        self.cubes[cube.index()].stamp.touch(frame);
    }

    pub(crate) fn edge_mut(&mut self, id: EdgeId) -> &mut LatticeEdge {
        &mut self.edges[id.index()]
    }

    fn cube_id(&self, coords: [usize; 3]) -> CubeId {
        let [nx, ny, _] = self.dims;
        CubeId((coords[0] + nx * (coords[1] + ny * coords[2])) as u32)
    }

    fn point_id(&self, coords: [usize; 3]) -> PointId {
        let [nx, ny, _] = self.dims;
        PointId((coords[0] + (nx + 1) * (coords[1] + (ny + 1) * coords[2])) as u32)
    }
}

/// An edge must join exactly the two points the cube expects at that position
fn check_edge(
    edge: &LatticeEdge,
    cube: [usize; 3],
    index: usize,
    expected: [PointId; 2],
) -> Result<()> {
    let [p, q] = edge.endpoints;
    let matches =
        (p == expected[0] && q == expected[1]) || (p == expected[1] && q == expected[0]);
    if !matches {
        return Err(Error::Topology {
            cube,
            edge: index,
            reason: format!(
                "edge joins {:?} but the cube expects {:?}",
                edge.endpoints, expected
            ),
        });
    }
    if edge.axis != EDGE_AXES[index] {
        return Err(Error::Topology {
            cube,
            edge: index,
            reason: format!(
                "edge runs along {:?}, expected {:?}",
                edge.axis, EDGE_AXES[index]
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use blobcrate_core::ScalarSource;
    use std::collections::HashMap;

    #[test]
    fn test_lattice_counts() {
        let lattice = Lattice::new([2, 3, 4]).unwrap();
        assert_eq!(lattice.dimensions(), [2, 3, 4]);
        assert_eq!(lattice.point_count(), 3 * 4 * 5);
        assert_eq!(lattice.cube_count(), 24);
        assert_eq!(lattice.edge_count(), 2 * 4 * 5 + 3 * 3 * 5 + 3 * 4 * 4);
        assert!(lattice.verify_topology().is_ok());
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(matches!(Lattice::new([4, 0, 4]), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_oversized_dimensions_rejected() {
        for dims in [[usize::MAX, 1, 1], [1, usize::MAX, 1], [1 << 40, 1 << 40, 1]] {
            assert!(matches!(Lattice::new(dims), Err(Error::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_misaligned_edge_fails_topology_check() {
        let mut lattice = Lattice::new([2, 2, 2]).unwrap();
        // Edge 1 of the first cube is edge 3 of its +x neighbour
        let first = lattice.cube_at([0, 0, 0]).unwrap();
        let shared = lattice.cube(first).edges()[1];
        assert_eq!(lattice.cube(lattice.cube_at([1, 0, 0]).unwrap()).edges()[3], shared);
        lattice.edges[shared.index()].axis = Axis::Z;

        match lattice.verify_topology() {
            Err(Error::Topology { cube, edge, reason }) => {
                assert_eq!(cube, [0, 0, 0]);
                assert_eq!(edge, 1);
                assert!(reason.contains("runs along"));
            }
            other => panic!("expected a topology error, got {:?}", other),
        }
    }

    #[test]
    fn test_rewired_edge_fails_topology_check() {
        let mut lattice = Lattice::new([2, 2, 2]).unwrap();
        let last = lattice.cube_at([1, 1, 1]).unwrap();
        let top = lattice.cube(last).edges()[6];
        let corner = lattice.cube(last).corners()[6];
        lattice.edges[top.index()].endpoints = [corner, corner];

        match lattice.verify_topology() {
            Err(Error::Topology { cube, edge, .. }) => {
                assert_eq!(cube, [1, 1, 1]);
                assert_eq!(edge, 6);
            }
            other => panic!("expected a topology error, got {:?}", other),
        }
    }

    #[test]
    fn test_cube_containing_maps_and_clamps() {
        let lattice = Lattice::new([4, 4, 4]).unwrap();
        let coords = |p: Point3f| lattice.cube(lattice.cube_containing(&p)).coords();

        assert_eq!(coords(Point3f::origin()), [2, 2, 2]);
        assert_eq!(coords(Point3f::new(-0.5, -0.5, -0.5)), [0, 0, 0]);
        assert_eq!(coords(Point3f::new(0.5, 0.5, 0.5)), [3, 3, 3]);
        assert_eq!(coords(Point3f::new(-9.0, 0.1, 9.0)), [0, 2, 3]);
        assert_eq!(coords(Point3f::new(f32::NAN, 0.0, 0.0)), [0, 2, 2]);
    }

    #[test]
    fn test_points_span_unit_cube() {
        let lattice = Lattice::new([4, 2, 5]).unwrap();
        let first = lattice.point(lattice.point_at([0, 0, 0]).unwrap());
        let last = lattice.point(lattice.point_at([4, 2, 5]).unwrap());
        assert_relative_eq!(first.position(), Point3f::new(-0.5, -0.5, -0.5));
        assert_relative_eq!(last.position(), Point3f::new(0.5, 0.5, 0.5));

        let middle = lattice.point(lattice.point_at([2, 1, 0]).unwrap());
        assert_eq!(middle.coords(), [2, 1, 0]);
        assert_relative_eq!(middle.position(), Point3f::new(0.0, 0.0, -0.5));
        assert!(lattice.point_at([5, 0, 0]).is_none());
    }

    #[test]
    fn test_cube_corners_follow_marching_order() {
        let lattice = Lattice::new([3, 3, 3]).unwrap();
        let cube = lattice.cube(lattice.cube_at([1, 2, 0]).unwrap());
        assert_eq!(cube.coords(), [1, 2, 0]);
        for (corner, offset) in CORNER_OFFSETS.iter().enumerate() {
            let point = lattice.point(cube.corners()[corner]);
            assert_eq!(point.coords(), [1 + offset[0], 2 + offset[1], offset[2]]);
        }
    }

    #[test]
    fn test_shared_edges_are_identical() {
        let lattice = Lattice::new([3, 3, 3]).unwrap();
        // (axis, edges on the lower cube's positive face, matching edges on the upper cube)
        let faces = [
            (Axis::X, [1, 5, 9, 10], [3, 7, 8, 11]),
            (Axis::Y, [2, 6, 10, 11], [0, 4, 9, 8]),
            (Axis::Z, [4, 5, 6, 7], [0, 1, 2, 3]),
        ];

        for id in lattice.cube_ids() {
            for (axis, lower, upper) in faces {
                let Some(next) = lattice.neighbor(id, axis, true) else {
                    continue;
                };
                let a = lattice.cube(id).edges();
                let b = lattice.cube(next).edges();
                for (l, u) in lower.iter().zip(upper) {
                    let coords = lattice.cube(id).coords();
                    assert_eq!(a[*l], b[u], "cube {:?} along {:?}", coords, axis);
                }
            }
        }
    }

    #[test]
    fn test_each_segment_has_one_edge() {
        let lattice = Lattice::new([3, 2, 2]).unwrap();
        let mut seen: HashMap<[PointId; 2], EdgeId> = HashMap::new();
        for cube in lattice.cubes() {
            for (edge, &[a, b]) in EDGE_CORNERS.iter().enumerate() {
                let mut key = [cube.corners()[a], cube.corners()[b]];
                key.sort();
                let id = cube.edges()[edge];
                assert_eq!(*seen.entry(key).or_insert(id), id);
                assert_eq!(lattice.edge(id).endpoints(), key);
                assert_eq!(lattice.edge(id).axis(), EDGE_AXES[edge]);
            }
        }
        assert_eq!(seen.len(), lattice.edge_count());
    }

    #[test]
    fn test_neighbors_stay_in_bounds() {
        let lattice = Lattice::new([3, 3, 3]).unwrap();
        let corner = lattice.cube_at([0, 0, 0]).unwrap();
        let center = lattice.cube_at([1, 1, 1]).unwrap();
        assert_eq!(lattice.neighbors(corner).count(), 3);
        assert_eq!(lattice.neighbors(center).count(), 6);
        assert_eq!(
            lattice.neighbor(center, Axis::Y, false).map(|c| lattice.cube(c).coords()),
            Some([1, 0, 1])
        );
        assert!(lattice.neighbor(corner, Axis::Z, false).is_none());
        assert!(lattice.cube_at([3, 0, 0]).is_none());
    }

    #[test]
    fn test_point_intensity_memoized_per_frame() {
        let mut lattice = Lattice::new([2, 2, 2]).unwrap();
        let sources = [ScalarSource::new(Point3f::new(0.0, 0.0, 0.25), 1.0)];
        let id = lattice.point_at([1, 1, 1]).unwrap();

        let field = ScalarField::new(&sources);
        let frame = crate::frame::FrameClock::new().advance();
        let fresh = lattice.point_intensity(id, frame, &field);
        let again = lattice.point_intensity(id, frame, &field);

        assert_relative_eq!(fresh, 16.0);
        assert_eq!(fresh, again);
        assert_eq!(field.evaluations(), 1);
        assert!(lattice.point(id).stamp().is_current(frame));
    }

    #[test]
    fn test_visit_marks() {
        let mut lattice = Lattice::new([2, 2, 2]).unwrap();
        let mut clock = crate::frame::FrameClock::new();
        let cube = lattice.cube_at([1, 0, 1]).unwrap();
        let frame = clock.advance();

        assert!(!lattice.is_visited(cube, frame));
        lattice.mark_visited(cube, frame);
        assert!(lattice.is_visited(cube, frame));
        assert!(!lattice.is_visited(cube, clock.advance()));
    }
}
