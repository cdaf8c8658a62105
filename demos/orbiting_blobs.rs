//! Orbiting blobs demo
//!
//! Animates a handful of metaballs orbiting the center of a world-space box
//! and extracts their surface every frame, logging per-frame counters.
//!
//! Run with `RUST_LOG=debug` to see the extractor's own frame summaries.

use anyhow::{Context, Result};
use blobcrate_core::{
    LocalTransform, MeshVertex, Point3f, ScalarSource, SurfaceConfig, Traversal, Vector3f,
};
use blobcrate_surface::{FrameStats, SurfaceExtractor};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "orbiting_blobs")]
#[command(about = "Extract the surface of orbiting metaballs frame by frame", long_about = None)]
struct Args {
    /// TOML file with a surface configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of frames to extract
    #[arg(short, long, default_value = "120")]
    frames: u32,

    /// Number of orbiting blobs
    #[arg(short, long, default_value = "6")]
    blobs: usize,

    /// Cubes along every axis, overriding the configuration
    #[arg(long)]
    cubes: Option<usize>,

    /// Iso-threshold, overriding the configuration
    #[arg(long)]
    threshold: Option<f32>,

    /// Classify every cube instead of tracking the surface
    #[arg(long)]
    full_scan: bool,

    /// Edge length of the world-space box the lattice covers
    #[arg(long, default_value = "10.0")]
    extent: f32,

    /// Seed for the blob orbits
    #[arg(long, default_value = "1")]
    seed: u64,
}

struct Orbit {
    center: Vector3f,
    axis: Vector3f,
    radius: f32,
    speed: f32,
    phase: f32,
    strength: f32,
}

impl Orbit {
    fn random(rng: &mut impl Rng, extent: f32) -> Self {
        let axis = Vector3f::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        )
        .try_normalize(f32::EPSILON)
        .unwrap_or_else(Vector3f::z);
        Self {
            center: Vector3f::new(
                rng.gen_range(-0.05..0.05),
                rng.gen_range(-0.05..0.05),
                rng.gen_range(-0.05..0.05),
            ) * extent,
            axis,
            radius: rng.gen_range(0.1..0.25) * extent,
            speed: rng.gen_range(0.5..2.0),
            phase: rng.gen_range(0.0..std::f32::consts::TAU),
            strength: rng.gen_range(0.03..0.08),
        }
    }

    fn source_at(&self, time: f32) -> ScalarSource {
        let reference = if self.axis.x.abs() < 0.9 {
            Vector3f::x()
        } else {
            Vector3f::y()
        };
        let u = self.axis.cross(&reference).normalize();
        let v = self.axis.cross(&u);
        let angle = self.phase + self.speed * time;
        let offset = (u * angle.cos() + v * angle.sin()) * self.radius;
        ScalarSource::new(Point3f::from(self.center + offset), self.strength)
    }
}

fn load_config(args: &Args) -> Result<SurfaceConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            toml::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))?
        }
        None => SurfaceConfig::default(),
    };
    if let Some(cubes) = args.cubes {
        config.cubes = [cubes; 3];
    }
    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
    }
    if args.full_scan {
        config.traversal = Traversal::FullScan;
    }
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = load_config(&args)?;
    log::info!("surface config: {:?}", config);
    let mut extractor = SurfaceExtractor::new(config).context("Failed to build extractor")?;

    let transform = LocalTransform::from_bounds(
        Point3f::origin(),
        Vector3f::new(args.extent, args.extent, args.extent),
    )?;

    let mut rng = StdRng::seed_from_u64(args.seed);
    let orbits: Vec<Orbit> = (0..args.blobs)
        .map(|_| Orbit::random(&mut rng, args.extent))
        .collect();

    let mut sources = Vec::with_capacity(orbits.len());
    let mut interleaved: Vec<MeshVertex> = Vec::new();
    let mut totals = FrameStats::default();
    let start = Instant::now();

    for frame in 0..args.frames {
        let time = frame as f32 / 60.0;
        sources.clear();
        sources.extend(orbits.iter().map(|orbit| orbit.source_at(time)));

        let stats = extractor.extract(&sources, &transform)?;
        extractor.mesh().interleave(&mut interleaved);
        log::info!(
            "frame {:>4}: {:>5} triangles, {:>5} vertices, {:>5} cubes visited, {} misses",
            stats.frame,
            stats.triangles,
            stats.vertices,
            stats.cubes_visited,
            stats.probe_misses
        );

        totals.cubes_visited += stats.cubes_visited;
        totals.field_evaluations += stats.field_evaluations;
        totals.triangles += stats.triangles;
        totals.probe_misses += stats.probe_misses;
    }

    let elapsed = start.elapsed();
    let frames = args.frames.max(1) as usize;
    println!("Extracted {} frames in {:.2?}", args.frames, elapsed);
    println!("- lattice: {:?} cubes", extractor.lattice().dimensions());
    println!("- average triangles: {}", totals.triangles / frames);
    println!("- average cubes visited: {}", totals.cubes_visited / frames);
    println!("- average field evaluations: {}", totals.field_evaluations / frames);
    println!("- probe misses: {}", totals.probe_misses);
    println!(
        "- last frame: {} interleaved vertices, {} indices",
        interleaved.len(),
        extractor.mesh().indices().len()
    );

    Ok(())
}
