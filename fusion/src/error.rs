//! Error types for fusion jobs.

use std::collections::TryReserveError;

use thiserror::Error;

use crate::config::{Combiner, Weighting};
use crate::math::Interval;
use crate::view::ViewId;

/// Boxed error produced by an external collaborator (pixel source or sink).
pub type ExternalError = Box<dyn std::error::Error + Send + Sync>;

/// Unsupported or inconsistent job setup, detected before any block is fused.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("No views provided for fusion")]
    NoViews,

    #[error("{view} appears more than once in the view list")]
    DuplicateViewId { view: ViewId },

    #[error("{view} has an empty dimension: {dims:?}")]
    EmptyView { view: ViewId, dims: [usize; 3] },

    #[error("{view} is two-dimensional ({dims:?}); only volumetric input is supported")]
    TwoDimensionalInput { view: ViewId, dims: [usize; 3] },

    #[error("Unsupported dimensionality {n_dims}; expected 2 or 3")]
    UnsupportedDimensionality { n_dims: usize },

    #[error("Output interval {output} is empty")]
    EmptyOutput { output: Interval },

    #[error("Block size {block_size:?} has a zero axis")]
    ZeroBlockSize { block_size: [usize; 3] },

    #[error("Blending border must be finite and non-negative, got {border:?}")]
    NegativeBorder { border: [f64; 3] },

    #[error("Blending width must be finite and non-negative, got {blend:?}")]
    NegativeBlend { blend: [f64; 3] },

    #[error("Content-based sigma must be finite and positive, got {sigma:?}")]
    InvalidSigma { sigma: [f64; 3] },

    #[error("Content-based scale must be finite and positive, got {scale}")]
    InvalidScale { scale: f32 },

    #[error("Spline grid spacing must be at least 1")]
    ZeroSplineGridSpacing,

    #[error("Overlap margin {margin} is smaller than the interpolation support radius {required}")]
    MarginTooSmall { margin: i64, required: i64 },

    #[error("{view} has a singular registration transform")]
    SingularTransform { view: ViewId },

    #[error("Combiner {combiner} requires binary masks, but weighting is {weighting}")]
    UnsupportedWeighting {
        combiner: Combiner,
        weighting: Weighting,
    },

    #[error("Non-rigid transform fit failed: {reason}")]
    NonRigidFit { reason: String },
}

/// Errors that can occur while building a plan or fusing blocks.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to allocate {what} ({bytes} bytes): {source}")]
    ResourceExhausted {
        what: &'static str,
        bytes: usize,
        #[source]
        source: TryReserveError,
    },

    #[error("Failed to read pixels of {view}: {source}")]
    SourceRead {
        view: ViewId,
        #[source]
        source: ExternalError,
    },

    #[error("Output sink rejected block {block}: {source}")]
    Sink {
        block: Interval,
        #[source]
        source: ExternalError,
    },

    #[error("Block {block} is not inside the output interval {output}")]
    BlockOutsideOutput { block: Interval, output: Interval },
}

impl Error {
    /// Wrap an allocation failure of `len` elements of `T`.
    pub(crate) fn exhausted<T>(what: &'static str, len: usize, source: TryReserveError) -> Self {
        Error::ResourceExhausted {
            what,
            bytes: len.saturating_mul(std::mem::size_of::<T>()),
            source,
        }
    }
}
