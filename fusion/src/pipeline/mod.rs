//! Block pipeline: plan a job once, then fuse output blocks independently.
//!
//! [`FusionPlan`] holds everything immutable about a job and is shared by
//! reference across threads. Each thread fuses through its own
//! [`BlockFuser`], which owns the reusable scratch buffers.

mod convert;
mod driver;
mod fuser;
mod grid;
mod plan;
mod progress;
mod sink;

#[cfg(test)]
mod tests;

pub use convert::{OutputRange, convert_block};
pub use fuser::BlockFuser;
pub use grid::BlockGrid;
pub use plan::FusionPlan;
pub use progress::{FusionProgress, ProgressCallback};
pub use sink::{BlockSink, VolumeSink};
