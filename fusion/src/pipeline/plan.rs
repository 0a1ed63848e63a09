//! Fusion plan: everything immutable about a job, built once and shared by all workers.

use std::collections::HashSet;
use std::sync::Arc;

use common::Buffer3;
use glam::DAffine3;
use tracing::{debug, info, warn};

use super::fuser::BlockFuser;
use super::grid::BlockGrid;
use crate::config::{FusionConfig, Weighting};
use crate::error::{ConfigError, Error};
use crate::math::{Interval, is_invertible};
use crate::overlap::OverlapIndex;
use crate::resample::{BlockMapping, IntensityAdjustment, ResamplePath};
use crate::view::{View, ViewId, ViewTransform};
use crate::weights::{Blending, ContentBased, Masking, SeparableWeight};

/// Geometric weight of one view, evaluated in its local coordinates.
#[derive(Debug, Clone)]
pub(crate) enum ViewGeometry {
    Mask(Masking),
    Blend(Blending),
}

impl ViewGeometry {
    /// Fill `out` (sized to the mapped region) with this view's weights.
    pub(crate) fn fill(&self, mapping: &BlockMapping, path: ResamplePath, out: &mut Buffer3<f32>) {
        match self {
            ViewGeometry::Mask(mask) => fill_weights(mask, mapping, path, out),
            ViewGeometry::Blend(blending) => fill_weights(blending, mapping, path, out),
        }
    }
}

fn fill_weights<W: SeparableWeight>(
    weight: &W,
    mapping: &BlockMapping,
    path: ResamplePath,
    out: &mut Buffer3<f32>,
) {
    match (path, mapping) {
        (ResamplePath::Incremental, BlockMapping::Affine(m)) => weight.fill_incremental(out, m),
        _ => weight.fill_general(out, |x, y, z| mapping.local_at(x, y, z)),
    }
}

/// Per-view part of the plan.
#[derive(Debug, Clone)]
pub(crate) struct ViewPlan {
    pub(crate) view: View,
    pub(crate) world_to_local: DAffine3,
    pub(crate) path: ResamplePath,
    pub(crate) geometry: ViewGeometry,
}

impl ViewPlan {
    /// Mapping of the world-space `region` into this view.
    pub(crate) fn mapping(&self, region: &Interval, spline_grid_spacing: usize) -> BlockMapping {
        match self.view.transform() {
            ViewTransform::Affine(_) => BlockMapping::affine(&self.world_to_local, region),
            ViewTransform::NonRigid(transform) => {
                BlockMapping::lattice(transform, region, spline_grid_spacing)
            }
        }
    }
}

/// Validated, immutable description of one fusion job.
///
/// Built once; the overlap index, weight geometry and transforms are shared
/// read-only by every worker. Mutable per-thread state lives in
/// [`BlockFuser`], obtained through [`FusionPlan::fuser`].
#[derive(Debug)]
pub struct FusionPlan {
    pub(crate) config: FusionConfig,
    pub(crate) views: Vec<ViewPlan>,
    pub(crate) index: OverlapIndex,
    pub(crate) content: Option<ContentBased>,
    pub(crate) adjustment: Option<Arc<dyn IntensityAdjustment>>,
}

impl FusionPlan {
    /// Validate `views` against `config` and precompute the overlap index.
    ///
    /// The order of `views` is the overlap order used by priority combiners.
    pub fn new(views: Vec<View>, config: FusionConfig) -> Result<Self, Error> {
        Self::build(views, config, None)
    }

    /// Like [`FusionPlan::new`], applying `adjustment` to every view's samples.
    ///
    /// Adjusted views are resampled on the general path.
    pub fn with_adjustment(
        views: Vec<View>,
        config: FusionConfig,
        adjustment: Arc<dyn IntensityAdjustment>,
    ) -> Result<Self, Error> {
        Self::build(views, config, Some(adjustment))
    }

    fn build(
        views: Vec<View>,
        config: FusionConfig,
        adjustment: Option<Arc<dyn IntensityAdjustment>>,
    ) -> Result<Self, Error> {
        config.validate()?;
        validate_views(&views)?;

        let index = OverlapIndex::build(&views, config.overlap_margin, 3)?;

        let mut view_plans = Vec::with_capacity(views.len());
        for view in views {
            view_plans.push(plan_view(view, &config, adjustment.is_some())?);
        }

        let content = config
            .weighting
            .uses_content()
            .then(|| ContentBased::new(config.content));

        let general = view_plans
            .iter()
            .filter(|v| v.path == ResamplePath::General)
            .count();
        let grid = BlockGrid::new(config.output, config.block_size);

        info!(
            views = view_plans.len(),
            combiner = %config.combiner,
            weighting = %config.weighting,
            interpolation = %config.interpolation,
            incremental_views = view_plans.len() - general,
            general_views = general,
            output = %config.output,
            blocks = grid.len(),
            "Built fusion plan"
        );

        Ok(Self {
            config,
            views: view_plans,
            index,
            content,
            adjustment,
        })
    }

    #[inline]
    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    #[inline]
    pub fn overlap_index(&self) -> &OverlapIndex {
        &self.index
    }

    #[inline]
    pub fn num_views(&self) -> usize {
        self.views.len()
    }

    /// Resample path chosen for `view`, `None` if the view is not in the plan.
    pub fn resample_path(&self, view: ViewId) -> Option<ResamplePath> {
        self.views
            .iter()
            .find(|v| v.view.id() == view)
            .map(|v| v.path)
    }

    /// Tiling of the output interval by the configured block size.
    pub fn grid(&self) -> BlockGrid {
        BlockGrid::new(self.config.output, self.config.block_size)
    }

    /// Fresh per-thread fusion state. Cheap until the first block is fused.
    pub fn fuser(&self) -> BlockFuser<'_> {
        BlockFuser::new(self)
    }

    /// Fuse a single block with a throwaway fuser.
    ///
    /// Prefer [`FusionPlan::fuser`] when fusing many blocks on one thread.
    pub fn fuse_block(&self, request: &Interval) -> Result<Buffer3<f32>, Error> {
        self.fuser().fuse_block(request)
    }
}

fn validate_views(views: &[View]) -> Result<(), ConfigError> {
    if views.is_empty() {
        return Err(ConfigError::NoViews);
    }

    let mut seen = HashSet::with_capacity(views.len());
    for view in views {
        let id = view.id();
        let dims = view.dims();
        if !seen.insert(id) {
            return Err(ConfigError::DuplicateViewId { view: id });
        }
        if dims.contains(&0) {
            return Err(ConfigError::EmptyView { view: id, dims });
        }
        if dims.contains(&1) {
            return Err(ConfigError::TwoDimensionalInput { view: id, dims });
        }
        if !is_invertible(view.transform().registration()) {
            return Err(ConfigError::SingularTransform { view: id });
        }
    }
    Ok(())
}

fn plan_view(view: View, config: &FusionConfig, adjusted: bool) -> Result<ViewPlan, ConfigError> {
    let registration = view.transform().registration();
    let world_to_local = registration.inverse();
    if !world_to_local.is_finite() {
        return Err(ConfigError::SingularTransform { view: view.id() });
    }

    if let ViewTransform::NonRigid(transform) = view.transform() {
        debug!(
            view = %view.id(),
            max_deviation = transform.max_deviation(),
            "Control points deviate from the affine registration"
        );
    }
    let non_rigid = matches!(view.transform(), ViewTransform::NonRigid(_));
    let path = if non_rigid || adjusted {
        warn!(
            view = %view.id(),
            non_rigid,
            intensity_adjustment = adjusted,
            "Routing view to the general resample path"
        );
        ResamplePath::General
    } else {
        ResamplePath::Incremental
    };

    let geometry = match config.weighting {
        Weighting::Mask | Weighting::ContentBased => {
            ViewGeometry::Mask(Masking::new(view.dims(), config.blending.border))
        }
        Weighting::Blending | Weighting::BlendingContentBased => {
            ViewGeometry::Blend(Blending::new(view.dims(), &config.blending))
        }
    };

    Ok(ViewPlan {
        view,
        world_to_local,
        path,
        geometry,
    })
}
