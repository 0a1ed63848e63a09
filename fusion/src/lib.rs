//! Fusion - block-streaming multi-view volume fusion.
//!
//! Combines several overlapping, registered 3-D views into one output
//! volume, one block at a time:
//! - Overlap index pruning of views per block
//! - Blending, masking and content-based weights
//! - Affine and thin-plate-spline resampling
//! - Weighted average, first-wins, highest-view-id-wins and max-intensity combiners
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use fusion::{FusionConfig, FusionPlan, Interval, OutputRange, VolumeSink};
//!
//! let output = Interval::from_dims([512, 512, 256]);
//! let plan = FusionPlan::new(views, FusionConfig::weighted_average(output))?;
//!
//! let sink = VolumeSink::<u16>::new(output, OutputRange::Identity)?;
//! plan.fuse_volume(&sink)?;
//! let volume = sink.into_volume();
//! ```

pub mod combine;
mod config;
mod error;
pub(crate) mod math;
pub(crate) mod overlap;
mod pipeline;
pub mod resample;
pub(crate) mod spline;
mod view;
pub mod weights;

#[cfg(test)]
pub mod testing;

pub mod prelude;

// ============================================================================
// Configuration and errors
// ============================================================================

pub use config::{
    BlendingParams, Combiner, ContentBasedParams, FusionConfig, Interpolation, Weighting,
};
pub use error::{ConfigError, Error, ExternalError};

// ============================================================================
// Geometry and views
// ============================================================================

pub use math::{Interval, transformed_bounds};
pub use view::{
    ArrayPixelSource, Extension, FnPixelSource, PixelSource, Sample, View, ViewId, ViewTransform,
    fill_region,
};

// ============================================================================
// Non-rigid registration
// ============================================================================

pub use spline::{NonRigidTransform, ThinPlateSpline, TpsConfig};

// ============================================================================
// Overlap index
// ============================================================================

pub use overlap::{OverlapEntry, OverlapIndex};

// ============================================================================
// Resampling
// ============================================================================

pub use resample::{IntensityAdjustment, ResamplePath};

// ============================================================================
// Pipeline
// ============================================================================

pub use pipeline::{
    // Main API
    BlockFuser,
    BlockGrid,
    FusionPlan,
    // Output
    BlockSink,
    OutputRange,
    VolumeSink,
    convert_block,
    // Progress reporting
    FusionProgress,
    ProgressCallback,
};
