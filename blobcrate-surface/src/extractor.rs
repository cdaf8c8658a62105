//! Per-frame surface extraction driver

use crate::field::{localize_sources, ScalarField};
use crate::frame::{Frame, FrameClock};
use crate::lattice::Lattice;
use crate::marching_cubes::CubeProcessor;
use crate::tracker::SurfaceTracker;
use blobcrate_core::{
    FieldSource, LocalTransform, MeshBuffer, OutputSpace, Result, ScalarSource, SurfaceConfig,
    Traversal,
};
use serde::Serialize;

/// Counters gathered while extracting one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    /// Frame number the counters belong to
    pub frame: u64,
    /// Sources supplied for the frame
    pub sources: usize,
    /// Sources whose probe reached a surface cube
    pub seeds_found: usize,
    /// Sources whose probe ran off the lattice without a crossing
    pub probe_misses: usize,
    /// Cubes classified this frame
    pub cubes_visited: usize,
    /// Classified cubes the surface passes through
    pub surface_cubes: usize,
    /// Field evaluations, one per lattice point touched
    pub field_evaluations: usize,
    /// Vertices emitted
    pub vertices: usize,
    /// Triangles emitted
    pub triangles: usize,
}

/// Frame-coherent metaball surface extractor.
///
/// Owns the lattice, the frame clock and the output buffers. Each call to
/// [`SurfaceExtractor::extract`] starts a new frame and leaves that frame's
/// mesh in [`SurfaceExtractor::mesh`] until the next call.
#[derive(Debug)]
pub struct SurfaceExtractor {
    config: SurfaceConfig,
    lattice: Lattice,
    clock: FrameClock,
    mesh: MeshBuffer,
    tracker: SurfaceTracker,
    local_sources: Vec<ScalarSource>,
    last_stats: FrameStats,
}

impl SurfaceExtractor {
    /// Build the lattice and buffers for `config`
    pub fn new(config: SurfaceConfig) -> Result<Self> {
        config.validate()?;
        let lattice = Lattice::new(config.cubes)?;
        let mesh = MeshBuffer::with_capacity(
            config.vertex_budget(),
            config.triangle_budget(),
            config.capacity,
        );
        Ok(Self {
            tracker: SurfaceTracker::new(config.probe_axis),
            config,
            lattice,
            clock: FrameClock::new(),
            mesh,
            local_sources: Vec::new(),
            last_stats: FrameStats::default(),
        })
    }

    /// Replace the configuration.
    ///
    /// The lattice is rebuilt when the cube counts or the threshold change;
    /// the buffers are always reallocated. The frame clock keeps counting.
    pub fn reconfigure(&mut self, config: SurfaceConfig) -> Result<()> {
        config.validate()?;
        if config.cubes != self.config.cubes || config.threshold != self.config.threshold {
            self.lattice = Lattice::new(config.cubes)?;
        }
        self.mesh = MeshBuffer::with_capacity(
            config.vertex_budget(),
            config.triangle_budget(),
            config.capacity,
        );
        self.tracker = SurfaceTracker::new(config.probe_axis);
        self.config = config;
        Ok(())
    }

    /// Extract the surface for `sources`, given in world space.
    ///
    /// `transform` maps world space into the lattice's `[-0.5, 0.5]^3`. The
    /// previous frame's mesh is discarded. On error the buffers hold whatever
    /// was emitted before the failure.
    pub fn extract<S: FieldSource>(
        &mut self,
        sources: &[S],
        transform: &LocalTransform,
    ) -> Result<FrameStats> {
        let frame = self.clock.advance();
        self.mesh.reset();
        localize_sources(sources, transform, &mut self.local_sources);

        let field = ScalarField::new(&self.local_sources);
        let mut processor = CubeProcessor::new(&field, frame, self.config.threshold)
            .with_reversed_winding(self.config.reverse_winding);
        if self.config.output_space == OutputSpace::World {
            processor = processor.with_world_output(transform);
        }

        let mut stats = FrameStats {
            frame: frame.get(),
            sources: sources.len(),
            ..FrameStats::default()
        };

        match self.config.traversal {
            Traversal::Tracked => {
                for source in field.sources() {
                    self.tracker.trace(
                        &mut self.lattice,
                        &processor,
                        &mut self.mesh,
                        source,
                        &mut stats,
                    )?;
                }
            }
            Traversal::FullScan => {
                self.tracker
                    .scan(&mut self.lattice, &processor, &mut self.mesh, &mut stats)?;
            }
        }

        stats.field_evaluations = field.evaluations();
        stats.vertices = self.mesh.vertex_count();
        stats.triangles = self.mesh.triangle_count();
        log::debug!(
            "frame {}: {} sources, {} surface cubes of {} visited, {} vertices, {} triangles",
            stats.frame,
            stats.sources,
            stats.surface_cubes,
            stats.cubes_visited,
            stats.vertices,
            stats.triangles
        );
        if stats.probe_misses > 0 {
            log::trace!("frame {}: {} probes missed", stats.frame, stats.probe_misses);
        }

        self.last_stats = stats;
        Ok(stats)
    }

    /// Mesh of the most recent frame
    pub fn mesh(&self) -> &MeshBuffer {
        &self.mesh
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    /// The most recently started frame, `Frame::NEVER` before the first extraction
    pub fn frame(&self) -> Frame {
        self.clock.current()
    }

    /// Counters of the last frame that completed without error
    pub fn last_stats(&self) -> FrameStats {
        self.last_stats
    }
}
