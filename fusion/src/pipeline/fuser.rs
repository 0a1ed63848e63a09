//! Per-thread block fusion.

use std::cell::Cell;
use std::marker::PhantomData;

use common::Buffer3;
use tracing::debug;

use super::plan::FusionPlan;
use crate::combine::{
    Accumulator, CombineStrategy, Contribution, FirstWins, HighestViewIdWins, MaxIntensity,
    WeightedAverage, multiply_weights, visit_in_order,
};
use crate::config::{Combiner, Interpolation};
use crate::error::Error;
use crate::math::Interval;
use crate::resample::{read_window, resample_block};
use crate::weights::ContentScratch;

/// Mutable scratch for fusing blocks of one plan on one thread.
///
/// Holds every buffer the hot path writes to, reused from block to block.
/// Deliberately `!Sync`: each worker obtains its own through
/// [`FusionPlan::fuser`] instead of sharing one behind a lock.
#[derive(Debug)]
pub struct BlockFuser<'a> {
    plan: &'a FusionPlan,
    acc: Accumulator,
    window: Buffer3<f32>,
    image: Buffer3<f32>,
    weight: Buffer3<f32>,
    content_window: Buffer3<f32>,
    content_weight: Buffer3<f32>,
    content_scratch: ContentScratch,
    _not_sync: PhantomData<Cell<()>>,
}

impl<'a> BlockFuser<'a> {
    pub(crate) fn new(plan: &'a FusionPlan) -> Self {
        Self {
            plan,
            acc: Accumulator::default(),
            window: Buffer3::default(),
            image: Buffer3::default(),
            weight: Buffer3::default(),
            content_window: Buffer3::default(),
            content_weight: Buffer3::default(),
            content_scratch: ContentScratch::default(),
            _not_sync: PhantomData,
        }
    }

    #[inline]
    pub fn plan(&self) -> &'a FusionPlan {
        self.plan
    }

    /// Fuse `request` into a newly allocated block.
    pub fn fuse_block(&mut self, request: &Interval) -> Result<Buffer3<f32>, Error> {
        let mut out = Buffer3::default();
        self.fuse_block_into(request, &mut out)?;
        Ok(out)
    }

    /// Fuse `request` into `out`, which is resized to the request.
    ///
    /// `request` must be non-empty and inside the output interval.
    pub fn fuse_block_into(
        &mut self,
        request: &Interval,
        out: &mut Buffer3<f32>,
    ) -> Result<(), Error> {
        let output = self.plan.config.output;
        if request.is_empty() || !output.contains(request) {
            return Err(Error::BlockOutsideOutput {
                block: *request,
                output,
            });
        }

        out.try_reset(request.size(), 0.0)
            .map_err(|e| Error::exhausted::<f32>("output block", request.num_elements(), e))?;

        match self.plan.config.combiner {
            Combiner::WeightedAverage => self.fuse_with::<WeightedAverage>(request, out),
            Combiner::FirstWins => self.fuse_with::<FirstWins>(request, out),
            Combiner::HighestViewIdWins => self.fuse_with::<HighestViewIdWins>(request, out),
            Combiner::MaxIntensity => self.fuse_with::<MaxIntensity>(request, out),
        }
    }

    fn fuse_with<S: CombineStrategy>(
        &mut self,
        request: &Interval,
        out: &mut Buffer3<f32>,
    ) -> Result<(), Error> {
        let plan = self.plan;
        let candidates = plan.index.filter(request).offset(request.min());
        let block = Interval::from_dims(request.size());

        debug!(
            block = %request,
            candidates = candidates.len(),
            views = plan.views.len(),
            "Fusing block"
        );

        // Moved out so the visitor can borrow the resampling buffers.
        let mut acc = std::mem::take(&mut self.acc);
        let visited = acc.reset(request.size()).and_then(|()| {
            visit_in_order::<S, _, _, _>(&mut acc, candidates.entries(), |acc, entry| {
                let Some(region) = entry.bbox.intersect(&block) else {
                    return Ok(());
                };
                if self.resample_view(entry.position, request, &region)? {
                    acc.accumulate::<S>(&Contribution {
                        region,
                        image: &self.image,
                        weight: &self.weight,
                    });
                }
                Ok::<(), Error>(())
            })
        });
        self.acc = acc;

        let skipped = visited?;
        if skipped > 0 {
            debug!(
                block = %request,
                skipped,
                "All voxels claimed, skipping remaining views"
            );
        }

        self.acc.finish::<S>(out);
        Ok(())
    }

    /// Resample image and weight of the view at `position` over `region`
    /// (block-local). Returns `false` if the region maps outside the view.
    fn resample_view(
        &mut self,
        position: usize,
        request: &Interval,
        region: &Interval,
    ) -> Result<bool, Error> {
        let plan = self.plan;
        let config = &plan.config;
        let view_plan = &plan.views[position];
        let view = &view_plan.view;

        let world_region = region.translate(request.min());
        let mapping = view_plan.mapping(&world_region, config.spline_grid_spacing);
        let Some(window) = mapping.source_window(region.size(), view.dims()) else {
            debug!(view = %view.id(), block = %request, "Block maps outside the view");
            return Ok(false);
        };
        let window_min = window.min().as_dvec3();
        let len = region.num_elements();

        read_window(view, &window, plan.adjustment.as_deref(), &mut self.window)?;

        self.image
            .try_reset(region.size(), 0.0)
            .map_err(|e| Error::exhausted::<f32>("resampled image", len, e))?;
        resample_block(
            &self.window,
            window_min,
            &mapping,
            view_plan.path,
            config.interpolation,
            &mut self.image,
        );

        self.weight
            .try_reset(region.size(), 0.0)
            .map_err(|e| Error::exhausted::<f32>("weight block", len, e))?;
        view_plan.geometry.fill(&mapping, view_plan.path, &mut self.weight);

        if let Some(content) = &plan.content {
            content.compute(
                view.id(),
                view.source(),
                &window,
                &mut self.content_scratch,
                &mut self.content_window,
            )?;
            self.content_weight
                .try_reset(region.size(), 0.0)
                .map_err(|e| Error::exhausted::<f32>("content-based block", len, e))?;
            resample_block(
                &self.content_window,
                window_min,
                &mapping,
                view_plan.path,
                Interpolation::Linear,
                &mut self.content_weight,
            );
            multiply_weights(&mut self.weight, &self.content_weight);
        }

        Ok(true)
    }
}
