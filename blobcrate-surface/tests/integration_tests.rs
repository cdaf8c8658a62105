//! Integration tests for blobcrate-surface
//!
//! These tests drive the extractor end to end and check the meshes it
//! produces: closure, placement on the isosurface, orientation and frame
//! coherence.

use approx::assert_relative_eq;
use blobcrate_core::{
    CapacityPolicy, Error, LocalTransform, MeshVertex, OutputSpace, Point3f, ScalarSource,
    SurfaceConfig, Traversal, Vector3f,
};
use blobcrate_surface::*;
use std::collections::HashMap;

fn extractor(cubes: usize, threshold: f32) -> SurfaceExtractor {
    SurfaceExtractor::new(SurfaceConfig::new([cubes, cubes, cubes], threshold)).unwrap()
}

fn single_blob(strength: f32) -> Vec<ScalarSource> {
    vec![ScalarSource::new(Point3f::origin(), strength)]
}

fn two_blobs() -> Vec<ScalarSource> {
    vec![
        ScalarSource::new(Point3f::new(-0.2, 0.01, 0.03), 0.01),
        ScalarSource::new(Point3f::new(0.2, 0.02, -0.01), 0.01),
    ]
}

/// Every undirected edge is used by exactly two triangles, and every
/// directed edge by exactly one.
fn assert_closed_and_oriented(triangles: &[[u32; 3]]) {
    let mut directed: HashMap<(u32, u32), usize> = HashMap::new();
    for &[a, b, c] in triangles {
        for edge in [(a, b), (b, c), (c, a)] {
            *directed.entry(edge).or_default() += 1;
        }
    }
    for (&(a, b), &count) in &directed {
        assert_eq!(count, 1, "directed edge {a}->{b} used {count} times");
        assert!(directed.contains_key(&(b, a)), "edge {a}->{b} is on a boundary");
    }
}

#[test]
fn test_unit_sphere_on_coarse_lattice() {
    let mut extractor = extractor(4, 4.0);
    let sources = single_blob(1.0);

    let stats = extractor.extract(&sources, &LocalTransform::identity()).unwrap();

    assert!(stats.triangles > 0);
    assert_eq!(stats.seeds_found, 1);
    assert_eq!(stats.probe_misses, 0);
    let mesh = extractor.mesh();
    assert_eq!(mesh.triangle_count(), stats.triangles);
    assert_closed_and_oriented(mesh.triangles());
    // Closed sphere: V - E + F = 2
    let faces = mesh.triangle_count() as i64;
    assert_eq!(mesh.vertex_count() as i64 - faces * 3 / 2 + faces, 2);

    for (vertex, normal) in mesh.vertices().iter().zip(mesh.normals()) {
        let radius = vertex.coords.norm();
        assert!((0.45..=0.55).contains(&radius), "vertex at radius {radius}");
        assert!(normal.dot(&vertex.coords) > 0.0);
        assert_relative_eq!(normal.norm(), 1.0, epsilon = 1e-5);
    }
}

#[test]
fn test_vertices_lie_near_isosurface() {
    let mut extractor = extractor(24, 1.0);
    let sources = single_blob(0.02);
    extractor.extract(&sources, &LocalTransform::identity()).unwrap();

    let expected = 0.02f32.sqrt();
    let mesh = extractor.mesh();
    assert!(!mesh.is_empty());
    assert_closed_and_oriented(mesh.triangles());
    for vertex in mesh.vertices() {
        assert_relative_eq!(vertex.coords.norm(), expected, epsilon = 0.01);
    }
}

#[test]
fn test_repeated_frames_are_identical() {
    let mut extractor = extractor(16, 1.0);
    let sources = single_blob(0.02);

    extractor.extract(&sources, &LocalTransform::identity()).unwrap();
    let vertices = extractor.mesh().vertices().to_vec();
    let triangles = extractor.mesh().triangles().to_vec();

    let stats = extractor.extract(&sources, &LocalTransform::identity()).unwrap();
    assert_eq!(stats.frame, 2);
    assert_eq!(extractor.mesh().vertices(), vertices.as_slice());
    assert_eq!(extractor.mesh().triangles(), triangles.as_slice());
}

#[test]
fn test_moving_sources_leave_no_stale_geometry() {
    let mut reused = extractor(16, 1.0);
    let first = vec![ScalarSource::new(Point3f::new(-0.2, 0.0, 0.0), 0.01)];
    let second = vec![ScalarSource::new(Point3f::new(0.15, 0.1, -0.05), 0.015)];

    reused.extract(&first, &LocalTransform::identity()).unwrap();
    reused.extract(&second, &LocalTransform::identity()).unwrap();

    let mut fresh = extractor(16, 1.0);
    fresh.extract(&second, &LocalTransform::identity()).unwrap();

    assert_eq!(reused.mesh().vertices(), fresh.mesh().vertices());
    assert_eq!(reused.mesh().normals(), fresh.mesh().normals());
    assert_eq!(reused.mesh().triangles(), fresh.mesh().triangles());
}

#[test]
fn test_no_sources() {
    let mut extractor = extractor(8, 1.0);
    let stats = extractor
        .extract::<ScalarSource>(&[], &LocalTransform::identity())
        .unwrap();

    assert_eq!(stats.sources, 0);
    assert_eq!(stats.cubes_visited, 0);
    assert!(extractor.mesh().is_empty());
}

#[test]
fn test_weak_source_misses() {
    // Odd cube count keeps the source off the lattice points
    let mut extractor = extractor(5, 1.0);
    let stats = extractor
        .extract(&single_blob(0.001), &LocalTransform::identity())
        .unwrap();

    assert_eq!(stats.probe_misses, 1);
    assert_eq!(stats.seeds_found, 0);
    assert_eq!(stats.surface_cubes, 0);
    assert!(extractor.mesh().is_empty());
}

#[test]
fn test_two_separate_blobs() {
    let mut extractor = extractor(20, 1.0);
    let stats = extractor
        .extract(&two_blobs(), &LocalTransform::identity())
        .unwrap();

    assert_eq!(stats.seeds_found, 2);
    assert!(stats.cubes_visited < extractor.lattice().cube_count() / 4);
    assert!(extractor.mesh().vertices().iter().any(|v| v.x < 0.0));
    assert!(extractor.mesh().vertices().iter().any(|v| v.x > 0.0));
}

#[test]
fn test_tracked_matches_full_scan() {
    for sources in [single_blob(0.02), two_blobs()] {
        let mut tracked = extractor(20, 1.0);
        let mut config = SurfaceConfig::new([20, 20, 20], 1.0);
        config.traversal = Traversal::FullScan;
        let mut scanned = SurfaceExtractor::new(config).unwrap();

        let a = tracked.extract(&sources, &LocalTransform::identity()).unwrap();
        let b = scanned.extract(&sources, &LocalTransform::identity()).unwrap();

        assert_eq!(a.surface_cubes, b.surface_cubes);
        assert_eq!(a.vertices, b.vertices);
        assert_eq!(a.triangles, b.triangles);
        assert_eq!(b.cubes_visited, 8000);
        assert!(a.field_evaluations < b.field_evaluations);
    }
}

#[test]
fn test_overlapping_sources_trace_one_surface() {
    let sources = vec![
        ScalarSource::new(Point3f::new(-0.02, 0.0, 0.0), 0.01),
        ScalarSource::new(Point3f::new(0.02, 0.0, 0.0), 0.01),
    ];
    let mut extractor = extractor(16, 1.0);
    let stats = extractor.extract(&sources, &LocalTransform::identity()).unwrap();

    assert_eq!(stats.seeds_found, 1);
    assert_closed_and_oriented(extractor.mesh().triangles());
}

#[test]
fn test_reversed_winding() {
    let sources = single_blob(0.02);
    let mut forward = extractor(16, 1.0);
    let mut config = SurfaceConfig::new([16, 16, 16], 1.0);
    config.reverse_winding = true;
    let mut reversed = SurfaceExtractor::new(config).unwrap();

    forward.extract(&sources, &LocalTransform::identity()).unwrap();
    reversed.extract(&sources, &LocalTransform::identity()).unwrap();

    let flipped: Vec<[u32; 3]> = forward
        .mesh()
        .triangles()
        .iter()
        .map(|&[a, b, c]| [c, b, a])
        .collect();
    assert_eq!(reversed.mesh().triangles(), flipped.as_slice());

    // Reversed order winds counter-clockwise seen from outside
    let vertices = reversed.mesh().vertices();
    for &[a, b, c] in reversed.mesh().triangles() {
        let (a, b, c) = (vertices[a as usize], vertices[b as usize], vertices[c as usize]);
        let face = (b - a).cross(&(c - a));
        let centroid = (a.coords + b.coords + c.coords) / 3.0;
        assert!(face.dot(&centroid) > -1e-7);
    }
}

#[test]
fn test_world_space_output() {
    let transform =
        LocalTransform::from_bounds(Point3f::new(10.0, -2.0, 0.0), Vector3f::new(4.0, 4.0, 4.0))
            .unwrap();
    let world_sources = [(Point3f::new(10.0, -2.0, 0.0), 0.02f32)];

    let mut local = extractor(16, 1.0);
    local.extract(&world_sources, &transform).unwrap();

    let mut config = SurfaceConfig::new([16, 16, 16], 1.0);
    config.output_space = OutputSpace::World;
    let mut world = SurfaceExtractor::new(config).unwrap();
    world.extract(&world_sources, &transform).unwrap();

    assert_eq!(local.mesh().vertex_count(), world.mesh().vertex_count());
    assert_eq!(local.mesh().triangles(), world.mesh().triangles());
    for (l, w) in local.mesh().vertices().iter().zip(world.mesh().vertices()) {
        assert_relative_eq!(transform.to_world_point(l), *w, epsilon = 1e-4);
    }
    for (l, w) in local.mesh().normals().iter().zip(world.mesh().normals()) {
        assert_relative_eq!(l, w, epsilon = 1e-5);
    }
}

#[test]
fn test_fixed_capacity_reports_buffer() {
    let mut config = SurfaceConfig::new([16, 16, 16], 1.0);
    config.capacity = CapacityPolicy::Fixed;
    config.triangle_capacity = Some(10);
    let mut extractor = SurfaceExtractor::new(config).unwrap();

    let err = extractor
        .extract(&single_blob(0.02), &LocalTransform::identity())
        .unwrap_err();
    assert!(matches!(err, Error::CapacityExceeded { capacity: 10, .. }));
    assert_eq!(err.to_string(), "triangle buffer exhausted at capacity 10");

    // The next frame starts from empty buffers
    let err = extractor
        .extract(&single_blob(0.02), &LocalTransform::identity())
        .unwrap_err();
    assert!(matches!(err, Error::CapacityExceeded { .. }));
    assert_eq!(extractor.mesh().triangle_count(), 10);
}

#[test]
fn test_growable_buffers_expand() {
    let mut config = SurfaceConfig::new([24, 24, 24], 1.0);
    config.vertex_capacity = Some(4);
    config.triangle_capacity = Some(4);
    let mut extractor = SurfaceExtractor::new(config).unwrap();

    let stats = extractor
        .extract(&single_blob(0.02), &LocalTransform::identity())
        .unwrap();
    assert!(stats.vertices > 4);
    assert!(extractor.mesh().vertex_capacity() >= stats.vertices);
    assert!(extractor.mesh().triangle_capacity() >= stats.triangles);
}

#[test]
fn test_lattice_topology_holds() {
    let mut config = SurfaceConfig::new([7, 3, 5], 1.0);
    config.traversal = Traversal::FullScan;
    let extractor = SurfaceExtractor::new(config).unwrap();
    extractor.lattice().verify_topology().unwrap();
    assert_eq!(extractor.lattice().cube_count(), 105);
}

#[test]
fn test_interleaved_export() {
    let mut extractor = extractor(12, 1.0);
    extractor
        .extract(&single_blob(0.02), &LocalTransform::identity())
        .unwrap();
    let mesh = extractor.mesh();

    let mut interleaved: Vec<MeshVertex> = Vec::new();
    mesh.interleave(&mut interleaved);
    assert_eq!(interleaved.len(), mesh.vertex_count());
    let first = mesh.vertices()[0];
    assert_eq!(interleaved[0].position, [first.x, first.y, first.z]);
    assert_eq!(mesh.indices().len(), mesh.triangle_count() * 3);

    let exported = mesh.to_surface_mesh();
    assert_eq!(exported.face_count(), mesh.triangle_count());
    assert_eq!(exported.vertex_count(), mesh.vertex_count());
}
