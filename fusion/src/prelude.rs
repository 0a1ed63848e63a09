//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use fusion::prelude::*;
//! ```

// Job setup
pub use crate::{Combiner, FusionConfig, Interpolation, Weighting};

// Views
pub use crate::{ArrayPixelSource, Interval, PixelSource, View, ViewId, ViewTransform};

// Pipeline
pub use crate::{BlockSink, FusionPlan, OutputRange, ProgressCallback, VolumeSink};

// Errors
pub use crate::{ConfigError, Error};
