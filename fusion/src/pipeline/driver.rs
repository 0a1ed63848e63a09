//! Parallel job driver: fuse every block of the output into a sink.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use common::Buffer3;
use rayon::prelude::*;
use tracing::info;

use super::plan::FusionPlan;
use super::progress::{FusionProgress, ProgressCallback};
use super::sink::BlockSink;
use crate::error::Error;

impl FusionPlan {
    /// Fuse the whole output interval into `sink` on the current rayon pool.
    ///
    /// Each worker owns one [`BlockFuser`](super::BlockFuser). Stops at the
    /// first failing block and returns its error; blocks already written stay
    /// in the sink.
    pub fn fuse_volume<S: BlockSink + ?Sized>(&self, sink: &S) -> Result<(), Error> {
        self.run(sink, None)
    }

    /// Like [`FusionPlan::fuse_volume`], calling `progress` after each block.
    pub fn fuse_volume_with_progress<S: BlockSink + ?Sized>(
        &self,
        sink: &S,
        progress: ProgressCallback,
    ) -> Result<(), Error> {
        self.run(sink, Some(&progress))
    }

    fn run<S: BlockSink + ?Sized>(
        &self,
        sink: &S,
        progress: Option<&ProgressCallback>,
    ) -> Result<(), Error> {
        let start = Instant::now();
        let blocks = self.grid().blocks();
        let total = blocks.len();
        let completed = AtomicUsize::new(0);

        info!(
            blocks = total,
            block_size = ?self.config.block_size,
            threads = rayon::current_num_threads(),
            "Fusing volume"
        );

        blocks.par_iter().try_for_each_init(
            || (self.fuser(), Buffer3::default()),
            |(fuser, out), block| {
                fuser.fuse_block_into(block, out)?;
                sink.write_block(block, out).map_err(|source| Error::Sink {
                    block: *block,
                    source,
                })?;

                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(callback) = progress {
                    callback(FusionProgress {
                        completed: done,
                        total,
                    });
                }
                Ok::<(), Error>(())
            },
        )?;

        info!(
            blocks = total,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fusion finished"
        );
        Ok(())
    }
}
