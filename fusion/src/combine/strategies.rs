use super::CombineStrategy;

/// `Σ wᵢ·imgᵢ / Σ wᵢ`, 0 where the total weight is 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedAverage;

impl CombineStrategy for WeightedAverage {
    const DESCENDING: bool = false;
    const EARLY_EXIT: bool = false;

    #[inline]
    fn accumulate(
        value: &mut f32,
        weight_sum: &mut f32,
        _: &mut bool,
        sample: f32,
        weight: f32,
    ) -> bool {
        if weight != 0.0 {
            *value += weight * sample;
            *weight_sum += weight;
        }
        false
    }

    #[inline]
    fn finish(value: f32, weight_sum: f32, _: bool) -> f32 {
        if weight_sum > 0.0 { value / weight_sum } else { 0.0 }
    }
}

/// The first masked view in ascending overlap order claims a voxel.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstWins;

#[inline]
fn claim_once(value: &mut f32, claimed: &mut bool, sample: f32, weight: f32) -> bool {
    if *claimed || weight <= 0.0 {
        return false;
    }
    *value = sample;
    *claimed = true;
    true
}

impl CombineStrategy for FirstWins {
    const DESCENDING: bool = false;
    const EARLY_EXIT: bool = true;

    #[inline]
    fn accumulate(
        value: &mut f32,
        _: &mut f32,
        claimed: &mut bool,
        sample: f32,
        weight: f32,
    ) -> bool {
        claim_once(value, claimed, sample, weight)
    }

    #[inline]
    fn finish(value: f32, _: f32, _: bool) -> f32 {
        value
    }
}

/// Same rule as [`FirstWins`], visiting views in descending overlap order.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighestViewIdWins;

impl CombineStrategy for HighestViewIdWins {
    const DESCENDING: bool = true;
    const EARLY_EXIT: bool = true;

    #[inline]
    fn accumulate(
        value: &mut f32,
        _: &mut f32,
        claimed: &mut bool,
        sample: f32,
        weight: f32,
    ) -> bool {
        claim_once(value, claimed, sample, weight)
    }

    #[inline]
    fn finish(value: f32, _: f32, _: bool) -> f32 {
        value
    }
}

/// Maximum sample over masked views.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxIntensity;

impl CombineStrategy for MaxIntensity {
    const DESCENDING: bool = false;
    // Later views can still raise a claimed voxel.
    const EARLY_EXIT: bool = false;

    #[inline]
    fn accumulate(
        value: &mut f32,
        _: &mut f32,
        claimed: &mut bool,
        sample: f32,
        weight: f32,
    ) -> bool {
        if weight <= 0.0 {
            return false;
        }
        if *claimed {
            *value = value.max(sample);
            false
        } else {
            *value = sample;
            *claimed = true;
            true
        }
    }

    #[inline]
    fn finish(value: f32, _: f32, claimed: bool) -> f32 {
        if claimed { value } else { 0.0 }
    }
}
