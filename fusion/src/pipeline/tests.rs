//! Tests for the block pipeline.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::Buffer3;
use glam::{DAffine3, DVec3, I64Vec3};
use parking_lot::Mutex;

use super::*;
use crate::config::{BlendingParams, Combiner, FusionConfig, Weighting};
use crate::error::{ConfigError, Error, ExternalError};
use crate::math::Interval;
use crate::resample::{IntensityAdjustment, ResamplePath};
use crate::spline::{NonRigidTransform, TpsConfig};
use crate::testing::{constant_view, init_tracing, pattern_source, pattern_view};
use crate::view::{
    ArrayPixelSource, Extension, FnPixelSource, PixelSource, View, ViewId, ViewTransform,
};

// ============================================================================
// Helpers
// ============================================================================

fn mask_config(output: Interval, combiner: Combiner) -> FusionConfig {
    FusionConfig {
        output,
        block_size: [8, 8, 8],
        combiner,
        weighting: Weighting::Mask,
        ..Default::default()
    }
}

/// Two constant views along x: A (10) at 0, B (30) at +8. Output covers both.
fn two_constant_views() -> (Vec<View>, Interval) {
    let dims = [16, 8, 8];
    let views = vec![
        constant_view(0, dims, DVec3::ZERO, 10.0),
        constant_view(1, dims, DVec3::new(8.0, 0.0, 0.0), 30.0),
    ];
    (views, Interval::from_dims([24, 8, 8]))
}

#[derive(Debug)]
struct FailingSource {
    dims: [usize; 3],
}

impl PixelSource for FailingSource {
    fn dims(&self) -> [usize; 3] {
        self.dims
    }

    fn read(&self, _: &Interval, _: Extension, _: &mut Buffer3<f32>) -> Result<(), ExternalError> {
        Err("read failed".into())
    }
}

#[derive(Debug)]
struct Doubling;

impl IntensityAdjustment for Doubling {
    fn adjust(&self, _: ViewId, _: &Interval, samples: &mut Buffer3<f32>) {
        samples.iter_mut().for_each(|v| *v *= 2.0);
    }
}

/// Sink collecting every block it receives.
#[derive(Default)]
struct CollectingSink {
    blocks: Mutex<Vec<Interval>>,
}

impl BlockSink for CollectingSink {
    fn write_block(&self, block: &Interval, data: &Buffer3<f32>) -> Result<(), ExternalError> {
        assert_eq!(data.dims(), block.size());
        self.blocks.lock().push(*block);
        Ok(())
    }
}

struct RejectingSink;

impl BlockSink for RejectingSink {
    fn write_block(&self, _: &Interval, _: &Buffer3<f32>) -> Result<(), ExternalError> {
        Err("disk full".into())
    }
}

// ============================================================================
// Plan validation
// ============================================================================

#[test]
fn test_plan_rejects_empty_view_list() {
    let config = FusionConfig::weighted_average(Interval::from_dims([8, 8, 8]));
    let err = FusionPlan::new(Vec::new(), config).unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::NoViews)));
}

#[test]
fn test_plan_rejects_duplicate_ids() {
    let views = vec![
        constant_view(3, [4, 4, 4], DVec3::ZERO, 1.0),
        constant_view(3, [4, 4, 4], DVec3::ONE, 1.0),
    ];
    let config = FusionConfig::weighted_average(Interval::from_dims([8, 8, 8]));
    let err = FusionPlan::new(views, config).unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::DuplicateViewId { view: ViewId(3) })
    ));
}

#[test]
fn test_plan_rejects_two_dimensional_view() {
    let views = vec![constant_view(0, [16, 16, 1], DVec3::ZERO, 1.0)];
    let config = FusionConfig::weighted_average(Interval::from_dims([16, 16, 1]));
    let err = FusionPlan::new(views, config).unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::TwoDimensionalInput { .. })
    ));
}

#[test]
fn test_plan_rejects_singular_transform() {
    let source = pattern_source([4, 4, 4], 0.0);
    let flat = DAffine3::from_scale(DVec3::new(1.0, 0.0, 1.0));
    let views = vec![View::affine(ViewId(0), flat, source)];
    let config = FusionConfig::weighted_average(Interval::from_dims([8, 8, 8]));
    let err = FusionPlan::new(views, config).unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::SingularTransform { view: ViewId(0) })
    ));
}

#[test]
fn test_plan_rejects_priority_combiner_with_blending() {
    let (views, output) = two_constant_views();
    let config = FusionConfig {
        weighting: Weighting::Blending,
        ..FusionConfig::first_wins(output)
    };
    let err = FusionPlan::new(views, config).unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::UnsupportedWeighting { .. })
    ));
}

// ============================================================================
// Resample path selection
// ============================================================================

#[test]
fn test_affine_views_use_incremental_path() {
    init_tracing();
    let (views, output) = two_constant_views();
    let plan = FusionPlan::new(views, mask_config(output, Combiner::WeightedAverage)).unwrap();
    assert_eq!(plan.num_views(), 2);
    assert_eq!(plan.resample_path(ViewId(0)), Some(ResamplePath::Incremental));
    assert_eq!(plan.resample_path(ViewId(1)), Some(ResamplePath::Incremental));
    assert_eq!(plan.resample_path(ViewId(9)), None);
    assert_eq!(plan.overlap_index().len(), 2);
}

#[test]
fn test_adjusted_views_use_general_path() {
    let (views, output) = two_constant_views();
    let plan = FusionPlan::with_adjustment(
        views,
        mask_config(output, Combiner::WeightedAverage),
        Arc::new(Doubling),
    )
    .unwrap();
    assert_eq!(plan.resample_path(ViewId(0)), Some(ResamplePath::General));
    assert_eq!(plan.resample_path(ViewId(1)), Some(ResamplePath::General));
}

// ============================================================================
// Single blocks
// ============================================================================

#[test]
fn test_block_outside_output_is_rejected() {
    let (views, output) = two_constant_views();
    let plan = FusionPlan::new(views, mask_config(output, Combiner::WeightedAverage)).unwrap();

    let request = Interval::new(I64Vec3::new(20, 0, 0), I64Vec3::new(27, 7, 7));
    let err = plan.fuse_block(&request).unwrap_err();
    assert!(matches!(err, Error::BlockOutsideOutput { .. }));

    let empty = Interval::new(I64Vec3::ONE, I64Vec3::ZERO);
    assert!(matches!(
        plan.fuse_block(&empty).unwrap_err(),
        Error::BlockOutsideOutput { .. }
    ));
}

#[test]
fn test_weighted_average_of_overlapping_views() {
    let (views, output) = two_constant_views();
    let plan = FusionPlan::new(views, mask_config(output, Combiner::WeightedAverage)).unwrap();

    let block = plan.fuse_block(&output).unwrap();
    for z in 0..8 {
        for y in 0..8 {
            for x in 0..24 {
                let expected = match x {
                    0..8 => 10.0,
                    8..16 => 20.0,
                    _ => 30.0,
                };
                assert_eq!(block[(x, y, z)], expected, "voxel ({x}, {y}, {z})");
            }
        }
    }
}

#[test]
fn test_priority_combiners_through_pipeline() {
    let (views, output) = two_constant_views();

    let first = FusionPlan::new(views.clone(), mask_config(output, Combiner::FirstWins))
        .unwrap()
        .fuse_block(&output)
        .unwrap();
    assert_eq!(first[(12, 3, 3)], 10.0);
    assert_eq!(first[(20, 3, 3)], 30.0);

    let highest = FusionPlan::new(views, mask_config(output, Combiner::HighestViewIdWins))
        .unwrap()
        .fuse_block(&output)
        .unwrap();
    assert_eq!(highest[(12, 3, 3)], 30.0);
    assert_eq!(highest[(4, 3, 3)], 10.0);
}

#[test]
fn test_sub_block_matches_full_block() {
    let dims = [20, 12, 10];
    let views = vec![
        pattern_view(0, dims, DVec3::ZERO),
        pattern_view(1, dims, DVec3::new(7.0, 2.0, 0.0)),
    ];
    let output = Interval::from_dims([27, 14, 10]);
    let plan = FusionPlan::new(views, FusionConfig::weighted_average(output)).unwrap();

    let full = plan.fuse_block(&output).unwrap();
    let request = Interval::new(I64Vec3::new(5, 3, 1), I64Vec3::new(16, 9, 6));
    let part = plan.fuse_block(&request).unwrap();

    let [w, h, d] = request.size();
    for z in 0..d {
        for y in 0..h {
            for x in 0..w {
                let expected = full[(x + 5, y + 3, z + 1)];
                assert!(
                    (part[(x, y, z)] - expected).abs() < 1e-4,
                    "voxel ({x}, {y}, {z}): {} vs {expected}",
                    part[(x, y, z)]
                );
            }
        }
    }
}

#[test]
fn test_fuser_reuse_across_block_sizes() {
    let dims = [20, 12, 10];
    let views = vec![
        pattern_view(0, dims, DVec3::ZERO),
        pattern_view(1, dims, DVec3::new(6.0, 0.0, 0.0)),
    ];
    let output = Interval::from_dims([26, 12, 10]);
    let plan = FusionPlan::new(views, FusionConfig::weighted_average(output)).unwrap();

    let big = Interval::from_dims([26, 12, 10]);
    let small = Interval::new(I64Vec3::new(3, 2, 1), I64Vec3::new(8, 4, 2));

    let mut fuser = plan.fuser();
    let _ = fuser.fuse_block(&big).unwrap();
    let reused = fuser.fuse_block(&small).unwrap();
    let fresh = plan.fuse_block(&small).unwrap();
    assert_eq!(reused, fresh);
}

#[test]
fn test_pruned_views_are_never_read() {
    let dims = [8, 8, 8];
    let views = vec![
        constant_view(0, dims, DVec3::ZERO, 5.0),
        View::affine(
            ViewId(1),
            DAffine3::from_translation(DVec3::new(40.0, 0.0, 0.0)),
            Arc::new(FailingSource { dims }),
        ),
    ];
    let output = Interval::from_dims([48, 8, 8]);
    let plan = FusionPlan::new(views, mask_config(output, Combiner::WeightedAverage)).unwrap();

    let near = Interval::from_dims([8, 8, 8]);
    let block = plan.fuse_block(&near).unwrap();
    assert!(block.iter().all(|&v| v == 5.0));

    let far = Interval::new(I64Vec3::new(40, 0, 0), I64Vec3::new(47, 7, 7));
    let err = plan.fuse_block(&far).unwrap_err();
    assert!(matches!(err, Error::SourceRead { view: ViewId(1), .. }));
}

#[test]
fn test_uncovered_block_is_zero() {
    let views = vec![constant_view(0, [8, 8, 8], DVec3::ZERO, 5.0)];
    let output = Interval::from_dims([32, 8, 8]);
    let plan = FusionPlan::new(views, mask_config(output, Combiner::MaxIntensity)).unwrap();

    let request = Interval::new(I64Vec3::new(20, 0, 0), I64Vec3::new(27, 7, 7));
    let block = plan.fuse_block(&request).unwrap();
    assert!(block.iter().all(|&v| v == 0.0));
}

#[test]
fn test_intensity_adjustment_applies_to_samples() {
    let views = vec![constant_view(0, [8, 8, 8], DVec3::ZERO, 7.0)];
    let output = Interval::from_dims([8, 8, 8]);
    let plan = FusionPlan::with_adjustment(
        views,
        mask_config(output, Combiner::WeightedAverage),
        Arc::new(Doubling),
    )
    .unwrap();
    let block = plan.fuse_block(&output).unwrap();
    assert!(block.iter().all(|&v| v == 14.0));
}

#[test]
fn test_content_based_prefers_textured_view() {
    let dims = [12, 12, 12];
    let textured = Arc::new(ArrayPixelSource::from_fn(dims, |x, y, z| {
        if (x + y + z) % 2 == 0 { 100u16 } else { 0u16 }
    }));
    let views = vec![
        constant_view(0, dims, DVec3::ZERO, 50.0),
        View::affine(ViewId(1), DAffine3::IDENTITY, textured),
    ];
    let output = Interval::from_dims(dims);
    let mut config = mask_config(output, Combiner::WeightedAverage);
    config.weighting = Weighting::ContentBased;
    config.content.sigma1 = [1.0; 3];
    config.content.sigma2 = [2.0; 3];
    let plan = FusionPlan::new(views, config).unwrap();

    let block = plan.fuse_block(&output).unwrap();
    for (x, y, z) in [(2, 2, 2), (5, 6, 7), (9, 4, 1)] {
        let expected = if (x + y + z) % 2 == 0 { 100.0 } else { 0.0 };
        assert!(
            (block[(x, y, z)] - expected).abs() < 0.5,
            "voxel ({x}, {y}, {z}): {}",
            block[(x, y, z)]
        );
    }
}

#[test]
fn test_identity_non_rigid_view_matches_affine() {
    init_tracing();
    let dims = [12, 10, 8];
    let mut points: Vec<DVec3> = Interval::from_dims(dims).corners().to_vec();
    points.extend([DVec3::new(3.0, 4.0, 2.0), DVec3::new(8.0, 2.5, 5.0)]);
    let transform =
        NonRigidTransform::fit(DAffine3::IDENTITY, &points, &points, &TpsConfig::default())
            .unwrap();
    let source = pattern_source(dims, 3.0);

    let output = Interval::from_dims(dims);
    let config = FusionConfig {
        block_size: [6, 5, 4],
        ..FusionConfig::weighted_average(output)
    };
    let non_rigid = FusionPlan::new(
        vec![View::new(
            ViewId(0),
            ViewTransform::NonRigid(Arc::new(transform)),
            source.clone(),
        )],
        config.clone(),
    )
    .unwrap();
    let affine =
        FusionPlan::new(vec![View::affine(ViewId(0), DAffine3::IDENTITY, source)], config).unwrap();

    assert_eq!(non_rigid.resample_path(ViewId(0)), Some(ResamplePath::General));

    let request = Interval::new(I64Vec3::new(2, 1, 1), I64Vec3::new(9, 8, 6));
    let a = non_rigid.fuse_block(&request).unwrap();
    let b = affine.fuse_block(&request).unwrap();
    for (x, y) in a.iter().zip(b.iter()) {
        assert!((x - y).abs() < 1e-3, "{x} vs {y}");
    }
}

#[test]
fn test_non_rigid_view_is_fused_beyond_its_control_points() {
    init_tracing();
    let dims = [64, 64, 64];
    let local: Vec<DVec3> = Interval::from_dims([11, 11, 11])
        .corners()
        .into_iter()
        .chain([DVec3::splat(5.0)])
        .collect();
    let world: Vec<DVec3> = local.iter().map(|&p| p * 1.1).collect();
    let transform =
        NonRigidTransform::fit(DAffine3::IDENTITY, &local, &world, &TpsConfig::default())
            .unwrap();
    let view = View::new(
        ViewId(0),
        ViewTransform::NonRigid(Arc::new(transform)),
        Arc::new(FnPixelSource::new(dims, |_, _, _| 5.0)),
    );

    let output = Interval::from_dims([80, 64, 64]);
    let config = FusionConfig {
        blending: BlendingParams::uniform(0.0, 0.0),
        ..mask_config(output, Combiner::WeightedAverage)
    };
    let plan = FusionPlan::new(vec![view], config).unwrap();

    let request = Interval::from_origin_size(I64Vec3::new(64, 28, 28), [8, 8, 8]);
    let block = plan.fuse_block(&request).unwrap();
    // World x 68 maps to local x 61.8, x 70 to 63.6
    assert_eq!(block[(4, 2, 2)], 5.0);
    assert_eq!(block[(6, 2, 2)], 0.0);
}

// ============================================================================
// Job driver
// ============================================================================

#[test]
fn test_fuse_volume_into_volume_sink() {
    init_tracing();
    let (views, output) = two_constant_views();
    let plan = FusionPlan::new(views, mask_config(output, Combiner::WeightedAverage)).unwrap();

    let sink = VolumeSink::<u16>::new(output, OutputRange::Identity).unwrap();
    plan.fuse_volume(&sink).unwrap();
    let volume = sink.into_volume();

    assert_eq!(volume.dims(), [24, 8, 8]);
    assert_eq!(volume[(0, 0, 0)], 10);
    assert_eq!(volume[(10, 7, 7)], 20);
    assert_eq!(volume[(23, 4, 2)], 30);
}

#[test]
fn test_fuse_volume_visits_every_block_once() {
    let (views, output) = two_constant_views();
    let config = FusionConfig {
        block_size: [5, 3, 8],
        ..mask_config(output, Combiner::WeightedAverage)
    };
    let plan = FusionPlan::new(views, config).unwrap();

    let sink = CollectingSink::default();
    plan.fuse_volume(&sink).unwrap();

    let mut written = sink.blocks.into_inner();
    let mut expected = plan.grid().blocks();
    written.sort_by_key(|b| b.min().to_array());
    expected.sort_by_key(|b| b.min().to_array());
    assert_eq!(written, expected);
}

#[test]
fn test_progress_reports_every_block() {
    let (views, output) = two_constant_views();
    let plan = FusionPlan::new(views, mask_config(output, Combiner::WeightedAverage)).unwrap();
    let total = plan.grid().len();

    let calls = Arc::new(AtomicUsize::new(0));
    let max_completed = Arc::new(AtomicUsize::new(0));
    let progress: ProgressCallback = {
        let calls = calls.clone();
        let max_completed = max_completed.clone();
        Arc::new(move |p: FusionProgress| {
            assert_eq!(p.total, total);
            calls.fetch_add(1, Ordering::Relaxed);
            max_completed.fetch_max(p.completed, Ordering::Relaxed);
        })
    };

    plan.fuse_volume_with_progress(&CollectingSink::default(), progress)
        .unwrap();
    assert_eq!(calls.load(Ordering::Relaxed), total);
    assert_eq!(max_completed.load(Ordering::Relaxed), total);
}

#[test]
fn test_sink_failure_aborts_job() {
    let (views, output) = two_constant_views();
    let plan = FusionPlan::new(views, mask_config(output, Combiner::WeightedAverage)).unwrap();
    let err = plan.fuse_volume(&RejectingSink).unwrap_err();
    assert!(matches!(err, Error::Sink { .. }));
}

#[test]
fn test_volume_sink_rejects_foreign_block() {
    let sink =
        VolumeSink::<f32>::new(Interval::from_dims([4, 4, 4]), OutputRange::Identity).unwrap();
    let block = Interval::new(I64Vec3::new(2, 0, 0), I64Vec3::new(5, 3, 3));
    assert!(sink.write_block(&block, &Buffer3::new_filled([4, 4, 4], 1.0)).is_err());
}

#[test]
fn test_progress_fraction() {
    assert_eq!(FusionProgress { completed: 1, total: 4 }.fraction(), 0.25);
    assert_eq!(FusionProgress { completed: 0, total: 0 }.fraction(), 1.0);
}
