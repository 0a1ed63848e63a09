//! Combiners: merge per-view (image, weight) blocks into one output block.
//!
//! The combiner enum is resolved once per block into a zero-sized
//! [`CombineStrategy`]; the per-voxel loops in [`Accumulator`] are generic
//! over it, so no dynamic dispatch happens inside them.
//!
//! | Strategy | Order | Voxel rule | Unset voxels |
//! |---|---|---|---|
//! | [`WeightedAverage`] | any | `Σ wᵢ·imgᵢ / Σ wᵢ` | 0 |
//! | [`FirstWins`] | ascending | first masked view claims | 0 |
//! | [`HighestViewIdWins`] | descending | first masked view claims | 0 |
//! | [`MaxIntensity`] | ascending | max over masked views | 0 |
//!
//! A view is masked at a voxel when its weight there is positive.

mod multiplicative;
mod strategies;


pub use multiplicative::{Multiplicative, multiply_weights};
pub use strategies::{FirstWins, HighestViewIdWins, MaxIntensity, WeightedAverage};

use common::Buffer3;

use crate::config::Combiner;
use crate::error::Error;
use crate::math::Interval;

/// One view's resampled block over `region` (block-local coordinates).
///
/// `image` and `weight` are both sized to `region`.
#[derive(Debug, Clone, Copy)]
pub struct Contribution<'a> {
    pub region: Interval,
    pub image: &'a Buffer3<f32>,
    pub weight: &'a Buffer3<f32>,
}

/// Voxel rule of one combiner.
pub trait CombineStrategy {
    /// Visit views in reverse overlap order.
    const DESCENDING: bool;
    /// Claimed voxels are final, so fusion may stop once all are claimed.
    const EARLY_EXIT: bool;

    /// Fold one view's sample into a voxel. Returns `true` if the voxel
    /// became claimed by this call.
    fn accumulate(
        value: &mut f32,
        weight_sum: &mut f32,
        claimed: &mut bool,
        sample: f32,
        weight: f32,
    ) -> bool;

    /// Final output value of a voxel.
    fn finish(value: f32, weight_sum: f32, claimed: bool) -> f32;
}

/// Running per-block state. One per worker thread, reused across blocks.
#[derive(Debug, Default)]
pub struct Accumulator {
    values: Buffer3<f32>,
    weight_sums: Buffer3<f32>,
    claimed: Buffer3<bool>,
    remaining: usize,
}

impl Accumulator {
    /// Clear and resize for a block of `dims`.
    pub fn reset(&mut self, dims: [usize; 3]) -> Result<(), Error> {
        let len = dims[0] * dims[1] * dims[2];
        self.values
            .try_reset(dims, 0.0)
            .map_err(|e| Error::exhausted::<f32>("accumulator values", len, e))?;
        self.weight_sums
            .try_reset(dims, 0.0)
            .map_err(|e| Error::exhausted::<f32>("accumulator weights", len, e))?;
        self.claimed
            .try_reset(dims, false)
            .map_err(|e| Error::exhausted::<bool>("accumulator claims", len, e))?;
        self.remaining = len;
        Ok(())
    }

    /// Voxels not yet claimed by any view.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Every voxel of the block is claimed.
    #[inline]
    pub fn is_saturated(&self) -> bool {
        self.remaining == 0
    }

    pub fn accumulate<S: CombineStrategy>(&mut self, contribution: &Contribution<'_>) {
        let region = contribution.region;
        let [width, height, depth] = region.size();
        debug_assert_eq!(contribution.image.dims(), region.size());
        debug_assert_eq!(contribution.weight.dims(), region.size());
        debug_assert!(Interval::from_dims(self.values.dims()).contains(&region));

        let origin = region.min();
        let (ox, oy, oz) = (origin.x as usize, origin.y as usize, origin.z as usize);
        let mut newly_claimed = 0;

        for z in 0..depth {
            for y in 0..height {
                let images = contribution.image.row(y, z);
                let weights = contribution.weight.row(y, z);
                let values = &mut self.values.row_mut(oy + y, oz + z)[ox..ox + width];
                let sums = &mut self.weight_sums.row_mut(oy + y, oz + z)[ox..ox + width];
                let claimed = &mut self.claimed.row_mut(oy + y, oz + z)[ox..ox + width];

                for i in 0..width {
                    if S::accumulate(
                        &mut values[i],
                        &mut sums[i],
                        &mut claimed[i],
                        images[i],
                        weights[i],
                    ) {
                        newly_claimed += 1;
                    }
                }
            }
        }

        self.remaining -= newly_claimed;
    }

    /// Write final voxel values into `out`, which must match the block size.
    pub fn finish<S: CombineStrategy>(&self, out: &mut Buffer3<f32>) {
        assert_eq!(out.dims(), self.values.dims(), "output must match block size");
        for (((o, &v), &s), &c) in out
            .iter_mut()
            .zip(self.values.iter())
            .zip(self.weight_sums.iter())
            .zip(self.claimed.iter())
        {
            *o = S::finish(v, s, c);
        }
    }
}

/// Call `visit` on `items` (given in overlap order) in the order strategy `S`
/// requires, stopping once every voxel is claimed if `S` allows it.
///
/// Returns how many items the early exit skipped.
pub(crate) fn visit_in_order<S, T, E, F>(
    acc: &mut Accumulator,
    items: &[T],
    mut visit: F,
) -> Result<usize, E>
where
    S: CombineStrategy,
    F: FnMut(&mut Accumulator, &T) -> Result<(), E>,
{
    let n = items.len();
    for i in 0..n {
        if S::EARLY_EXIT && acc.is_saturated() {
            return Ok(n - i);
        }
        let item = if S::DESCENDING { &items[n - 1 - i] } else { &items[i] };
        visit(acc, item)?;
    }
    Ok(0)
}

/// Fold `contributions` (given in overlap order) with strategy `S`.
pub(crate) fn combine_with<S: CombineStrategy>(
    acc: &mut Accumulator,
    contributions: &[Contribution<'_>],
    out: &mut Buffer3<f32>,
) -> Result<(), Error> {
    acc.reset(out.dims())?;
    visit_in_order::<S, _, _, _>(acc, contributions, |acc, c| {
        acc.accumulate::<S>(c);
        Ok::<(), Error>(())
    })?;
    acc.finish::<S>(out);
    Ok(())
}

impl Combiner {
    /// Combine already resampled contributions into a block of `block_dims`.
    ///
    /// `contributions` are in overlap order; the strategy decides the visiting
    /// direction.
    pub fn combine(
        &self,
        block_dims: [usize; 3],
        contributions: &[Contribution<'_>],
    ) -> Result<Buffer3<f32>, Error> {
        let len = block_dims[0] * block_dims[1] * block_dims[2];
        let mut out = Buffer3::try_new_filled(block_dims, 0.0)
            .map_err(|e| Error::exhausted::<f32>("output block", len, e))?;
        let mut acc = Accumulator::default();
        match self {
            Combiner::WeightedAverage => {
                combine_with::<WeightedAverage>(&mut acc, contributions, &mut out)?
            }
            Combiner::FirstWins => combine_with::<FirstWins>(&mut acc, contributions, &mut out)?,
            Combiner::HighestViewIdWins => {
                combine_with::<HighestViewIdWins>(&mut acc, contributions, &mut out)?
            }
            Combiner::MaxIntensity => {
                combine_with::<MaxIntensity>(&mut acc, contributions, &mut out)?
            }
        }
        Ok(out)
    }
}
