//! Example: fuse four synthetic, overlapping views into one volume.
//!
//! Each view is a procedurally generated volume with a few bright spheres,
//! placed on a 2x2 grid with some overlap and a small rotation. The fused
//! volume is assembled in memory and summarized on the console.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=fusion=debug cargo run --release -p fusion --example fuse_synthetic -- weighted-average
//! ```
//!
//! The optional argument selects the combiner: `weighted-average`,
//! `first-wins`, `highest-view-id-wins` or `max-intensity`.

use std::env;
use std::sync::Arc;
use std::time::Instant;

use common::log_setup::{LogConfig, setup_logging};
use fusion::prelude::*;
use fusion::{FnPixelSource, FusionProgress};
use glam::{DAffine3, DQuat, DVec3};

const VIEW_DIMS: [usize; 3] = [160, 160, 80];
const OVERLAP: f64 = 32.0;

fn main() {
    if let Err(e) = setup_logging(&LogConfig::default()) {
        eprintln!("Logging disabled: {e}");
    }

    let combiner = match env::args().nth(1).as_deref() {
        None | Some("weighted-average") => Combiner::WeightedAverage,
        Some("first-wins") => Combiner::FirstWins,
        Some("highest-view-id-wins") => Combiner::HighestViewIdWins,
        Some("max-intensity") => Combiner::MaxIntensity,
        Some(other) => {
            eprintln!("Unknown combiner '{other}'");
            std::process::exit(2);
        }
    };

    let views = synthetic_views();
    let step = VIEW_DIMS[0] as f64 - OVERLAP;
    let output = Interval::from_dims([
        (VIEW_DIMS[0] as f64 + step) as usize,
        (VIEW_DIMS[1] as f64 + step) as usize,
        VIEW_DIMS[2],
    ]);

    let config = match combiner {
        Combiner::WeightedAverage => FusionConfig {
            block_size: [64, 64, 64],
            ..FusionConfig::weighted_average(output)
        },
        Combiner::FirstWins => FusionConfig::first_wins(output),
        Combiner::HighestViewIdWins => FusionConfig::highest_view_id_wins(output),
        Combiner::MaxIntensity => FusionConfig::max_intensity(output),
    };

    let plan = match FusionPlan::new(views, config) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("Invalid fusion job: {e}");
            std::process::exit(1);
        }
    };

    let sink =
        VolumeSink::<u16>::new(output, OutputRange::Identity).expect("allocate output volume");
    let progress: ProgressCallback = Arc::new(|p: FusionProgress| {
        if p.completed % 16 == 0 || p.completed == p.total {
            println!("  {:>4}/{} blocks ({:.0}%)", p.completed, p.total, 100.0 * p.fraction());
        }
    });

    let start = Instant::now();
    plan.fuse_volume_with_progress(&sink, progress)
        .expect("fusion failed");
    let elapsed = start.elapsed();

    let volume = sink.into_volume();
    let nonzero = volume.iter().filter(|&&v| v > 0).count();
    let max = volume.iter().copied().max().unwrap_or(0);
    println!("Combiner:   {combiner}");
    println!("Output:     {output} ({:?})", volume.dims());
    println!("Covered:    {nonzero} of {} voxels", volume.len());
    println!("Max value:  {max}");
    println!("Time:       {:.2?}", elapsed);
}

/// Four views on a 2x2 grid, slightly rotated, sharing one sphere field.
fn synthetic_views() -> Vec<View> {
    let step = VIEW_DIMS[0] as f64 - OVERLAP;
    (0..4u32)
        .map(|i| {
            let offset = DVec3::new(step * (i % 2) as f64, step * (i / 2) as f64, 0.0);
            let rotation = DQuat::from_rotation_z(0.02 * (i as f64 - 1.5));
            let transform = DAffine3::from_rotation_translation(rotation, offset);
            let source = FnPixelSource::new(VIEW_DIMS, move |x, y, z| {
                let world = transform.transform_point3(DVec3::new(x as f64, y as f64, z as f64));
                sphere_field(world) + 10.0 * i as f32
            });
            View::affine(ViewId(i), transform, Arc::new(source))
        })
        .collect()
}

/// Bright spheres every 48 voxels on a dim background.
fn sphere_field(p: DVec3) -> f32 {
    let cell = (p / 48.0).floor() * 48.0 + DVec3::splat(24.0);
    let d = (p - cell).length();
    if d < 10.0 {
        1000.0 * (1.0 - (d / 10.0) as f32)
    } else {
        100.0
    }
}
