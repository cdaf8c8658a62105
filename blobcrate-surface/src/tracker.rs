//! Surface tracking: seeding, probing and flood fill
//!
//! Each source seeds a cube, a linear probe walks from the seed towards the
//! nearest lattice boundary until it hits a surface cube, and a flood fill
//! spreads from that cube over every connected surface cube. Cubes the
//! surface does not reach are never classified.

use crate::extractor::FrameStats;
use crate::lattice::{CubeId, Lattice};
use crate::marching_cubes::CubeProcessor;
use blobcrate_core::{Axis, MeshBuffer, Point3f, Result, ScalarSource};
use itertools::iproduct;

/// Walks the lattice from source positions, processing surface cubes
#[derive(Debug, Clone, Default)]
pub struct SurfaceTracker {
    probe_axis: Axis,
    worklist: Vec<CubeId>,
}

impl SurfaceTracker {
    pub fn new(probe_axis: Axis) -> Self {
        Self {
            probe_axis,
            worklist: Vec::new(),
        }
    }

    pub fn probe_axis(&self) -> Axis {
        self.probe_axis
    }

    /// Cube containing the lattice-space position `local`.
    ///
    /// Positions outside `[-0.5, 0.5)^3` clamp to the nearest boundary cube.
    pub fn seed(&self, lattice: &Lattice, local: &Point3f) -> CubeId {
        lattice.cube_containing(local)
    }

    /// Trace the surface component around one source.
    ///
    /// Returns whether the probe found a surface cube.
    pub fn trace(
        &mut self,
        lattice: &mut Lattice,
        processor: &CubeProcessor,
        mesh: &mut MeshBuffer,
        source: &ScalarSource,
        stats: &mut FrameStats,
    ) -> Result<bool> {
        let seed = self.seed(lattice, &source.position);
        match self.probe(lattice, processor, mesh, seed, stats)? {
            Some(start) => {
                stats.seeds_found += 1;
                self.flood_fill(lattice, processor, mesh, start, stats)?;
                Ok(true)
            }
            None => {
                stats.probe_misses += 1;
                log::trace!(
                    "probe from cube {:?} found no surface",
                    lattice.cube(seed).coords()
                );
                Ok(false)
            }
        }
    }

    /// Walk from `seed` along the probe axis until a cube crosses the surface.
    ///
    /// The walk heads for the lattice boundary nearest the seed. Cubes already
    /// visited this frame are stepped over without being classified again.
    pub fn probe(
        &mut self,
        lattice: &mut Lattice,
        processor: &CubeProcessor,
        mesh: &mut MeshBuffer,
        seed: CubeId,
        stats: &mut FrameStats,
    ) -> Result<Option<CubeId>> {
        let axis = self.probe_axis.index();
        let positive = lattice.cube(seed).coords()[axis] > lattice.dimensions()[axis] / 2;

        let mut current = Some(seed);
        while let Some(cube) = current {
            if !lattice.is_visited(cube, processor.frame())
                && visit(lattice, processor, mesh, cube, stats)?
            {
                return Ok(Some(cube));
            }
            current = lattice.neighbor(cube, self.probe_axis, positive);
        }
        Ok(None)
    }

    /// Process every surface cube connected to `start` through shared faces
    pub fn flood_fill(
        &mut self,
        lattice: &mut Lattice,
        processor: &CubeProcessor,
        mesh: &mut MeshBuffer,
        start: CubeId,
        stats: &mut FrameStats,
    ) -> Result<()> {
        self.worklist.clear();
        self.worklist.push(start);

        while let Some(cube) = self.worklist.pop() {
            for (axis, positive) in iproduct!(Axis::ALL, [false, true]) {
                let Some(next) = lattice.neighbor(cube, axis, positive) else {
                    continue;
                };
                if lattice.is_visited(next, processor.frame()) {
                    continue;
                }
                if visit(lattice, processor, mesh, next, stats)? {
                    self.worklist.push(next);
                }
            }
        }
        Ok(())
    }

    /// Process every cube in the lattice not yet visited this frame
    pub fn scan(
        &mut self,
        lattice: &mut Lattice,
        processor: &CubeProcessor,
        mesh: &mut MeshBuffer,
        stats: &mut FrameStats,
    ) -> Result<()> {
        for cube in lattice.cube_ids() {
            if !lattice.is_visited(cube, processor.frame()) {
                visit(lattice, processor, mesh, cube, stats)?;
            }
        }
        Ok(())
    }
}

fn visit(
    lattice: &mut Lattice,
    processor: &CubeProcessor,
    mesh: &mut MeshBuffer,
    cube: CubeId,
    stats: &mut FrameStats,
) -> Result<bool> {
    stats.cubes_visited += 1;
    let crossed = processor.process(lattice, cube, mesh)?;
    if crossed {
        stats.surface_cubes += 1;
    }
    Ok(crossed)
}
