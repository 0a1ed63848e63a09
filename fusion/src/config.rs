//! Fusion job configuration.
//!
//! A single immutable `FusionConfig` carries every job parameter through the
//! call chain: output interval, blocking, interpolation, combiner, weighting,
//! and the parameters of each weight generator. There are no process-wide
//! defaults beyond `Default::default()`.

use glam::I64Vec3;
use strum_macros::Display;

use crate::error::ConfigError;
use crate::math::Interval;

/// Strategy merging per-view (image, weight) blocks into one output block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Combiner {
    /// `Σ wᵢ·imgᵢ / Σ wᵢ`, 0 where the total weight is 0.
    #[default]
    WeightedAverage,
    /// The first masked view in overlap order claims a voxel.
    FirstWins,
    /// The last masked view in overlap order claims a voxel.
    HighestViewIdWins,
    /// Maximum sample over masked views, 0 where none is masked.
    MaxIntensity,
}

impl Combiner {
    /// Priority and maximum combiners only understand binary masks.
    #[inline]
    pub fn requires_mask(&self) -> bool {
        !matches!(self, Combiner::WeightedAverage)
    }
}

/// Per-view weight generator used with a combiner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Weighting {
    /// Binary visibility mask (border only, no ramp).
    Mask,
    /// Cosine-ramped blending towards the view borders.
    #[default]
    Blending,
    /// Local-contrast weights restricted to the view's mask.
    ContentBased,
    /// Blending multiplied by content-based weights.
    BlendingContentBased,
}

impl Weighting {
    #[inline]
    pub fn uses_content(&self) -> bool {
        matches!(self, Weighting::ContentBased | Weighting::BlendingContentBased)
    }

    #[inline]
    pub fn uses_blending(&self) -> bool {
        matches!(self, Weighting::Blending | Weighting::BlendingContentBased)
    }
}

/// Sampling of a view's native grid at transformed positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Interpolation {
    NearestNeighbor,
    #[default]
    Linear,
}

impl Interpolation {
    /// How far (in source voxels) a sample reaches beyond its position.
    #[inline]
    pub fn support_radius(&self) -> i64 {
        match self {
            Interpolation::NearestNeighbor => 0,
            Interpolation::Linear => 1,
        }
    }
}

/// Border and ramp widths for blending and masking, in view-local voxels per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendingParams {
    /// Zero-weight band at each face of the view.
    pub border: [f64; 3],
    /// Width of the cosine ramp inside the border.
    pub blend: [f64; 3],
}

impl Default for BlendingParams {
    fn default() -> Self {
        Self {
            border: [0.0; 3],
            blend: [40.0, 40.0, 15.0],
        }
    }
}

impl BlendingParams {
    pub fn uniform(border: f64, blend: f64) -> Self {
        Self {
            border: [border; 3],
            blend: [blend; 3],
        }
    }
}

/// Parameters of the content-based (local contrast) weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContentBasedParams {
    /// Gaussian sigma subtracted from the image to isolate detail.
    pub sigma1: [f64; 3],
    /// Gaussian sigma integrating the squared detail.
    pub sigma2: [f64; 3],
    /// Empirical divisor applied to the integrated detail. Not a normalization.
    pub scale: f32,
}

impl Default for ContentBasedParams {
    fn default() -> Self {
        Self {
            sigma1: [20.0; 3],
            sigma2: [40.0; 3],
            scale: 1.0,
        }
    }
}

/// Complete configuration of one fusion job.
///
/// # Examples
///
/// ```ignore
/// use fusion::{FusionConfig, Interval, Weighting};
///
/// let config = FusionConfig {
///     weighting: Weighting::BlendingContentBased,
///     block_size: [64, 64, 64],
///     ..FusionConfig::weighted_average(output)
/// };
/// config.validate()?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FusionConfig {
    /// Output region in world voxel coordinates.
    pub output: Interval,
    /// Block size used when tiling `output`.
    pub block_size: [usize; 3],
    pub interpolation: Interpolation,
    pub combiner: Combiner,
    pub weighting: Weighting,
    pub blending: BlendingParams,
    pub content: ContentBasedParams,
    /// Growth of every view's bounding box in the overlap index.
    pub overlap_margin: i64,
    /// Lattice spacing (output voxels) for evaluating non-rigid transforms.
    pub spline_grid_spacing: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            output: Interval::new(I64Vec3::ZERO, I64Vec3::NEG_ONE),
            block_size: [128, 128, 128],
            interpolation: Interpolation::Linear,
            combiner: Combiner::WeightedAverage,
            weighting: Weighting::Blending,
            blending: BlendingParams::default(),
            content: ContentBasedParams::default(),
            overlap_margin: 2,
            spline_grid_spacing: 8,
        }
    }
}

impl FusionConfig {
    // ========== Presets ==========

    /// Preset: blended weighted average over `output`.
    pub fn weighted_average(output: Interval) -> Self {
        Self {
            output,
            ..Default::default()
        }
    }

    /// Preset: first view in overlap order wins.
    pub fn first_wins(output: Interval) -> Self {
        Self {
            output,
            combiner: Combiner::FirstWins,
            weighting: Weighting::Mask,
            ..Default::default()
        }
    }

    /// Preset: last view in overlap order wins.
    pub fn highest_view_id_wins(output: Interval) -> Self {
        Self {
            output,
            combiner: Combiner::HighestViewIdWins,
            weighting: Weighting::Mask,
            ..Default::default()
        }
    }

    /// Preset: maximum intensity projection across views.
    pub fn max_intensity(output: Interval) -> Self {
        Self {
            output,
            combiner: Combiner::MaxIntensity,
            weighting: Weighting::Mask,
            ..Default::default()
        }
    }

    // ========== Validation ==========

    /// Check every parameter and combination before a plan is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output.is_empty() {
            return Err(ConfigError::EmptyOutput {
                output: self.output,
            });
        }
        if self.block_size.contains(&0) {
            return Err(ConfigError::ZeroBlockSize {
                block_size: self.block_size,
            });
        }

        let border = self.blending.border;
        if border.iter().any(|b| !b.is_finite() || *b < 0.0) {
            return Err(ConfigError::NegativeBorder { border });
        }
        let blend = self.blending.blend;
        if blend.iter().any(|b| !b.is_finite() || *b < 0.0) {
            return Err(ConfigError::NegativeBlend { blend });
        }

        if self.weighting.uses_content() {
            for sigma in [self.content.sigma1, self.content.sigma2] {
                if sigma.iter().any(|s| !s.is_finite() || *s <= 0.0) {
                    return Err(ConfigError::InvalidSigma { sigma });
                }
            }
            let scale = self.content.scale;
            if !scale.is_finite() || scale <= 0.0 {
                return Err(ConfigError::InvalidScale { scale });
            }
        }

        if self.combiner.requires_mask() && self.weighting != Weighting::Mask {
            return Err(ConfigError::UnsupportedWeighting {
                combiner: self.combiner,
                weighting: self.weighting,
            });
        }

        let required = self.interpolation.support_radius();
        if self.overlap_margin < required {
            return Err(ConfigError::MarginTooSmall {
                margin: self.overlap_margin,
                required,
            });
        }

        if self.spline_grid_spacing == 0 {
            return Err(ConfigError::ZeroSplineGridSpacing);
        }

        Ok(())
    }
}
