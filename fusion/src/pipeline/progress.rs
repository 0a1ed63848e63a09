//! Progress reporting for fusion jobs.

use std::sync::Arc;

/// Blocks written so far out of the job total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FusionProgress {
    pub completed: usize,
    pub total: usize,
}

impl FusionProgress {
    /// Completed fraction in `[0, 1]`; an empty job counts as done.
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f32 / self.total as f32
        }
    }
}

/// Called from worker threads after each block is written to the sink.
pub type ProgressCallback = Arc<dyn Fn(FusionProgress) + Send + Sync>;
