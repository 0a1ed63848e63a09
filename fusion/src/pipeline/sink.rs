//! Destinations for fused blocks.

use common::Buffer3;
use parking_lot::Mutex;

use super::convert::OutputRange;
use crate::error::{Error, ExternalError};
use crate::math::Interval;
use crate::view::Sample;

/// Receives fused blocks, possibly from several worker threads at once.
///
/// Blocks arrive in no particular order and never overlap.
pub trait BlockSink: Sync {
    fn write_block(&self, block: &Interval, data: &Buffer3<f32>) -> Result<(), ExternalError>;
}

/// Assembles fused blocks into one in-memory volume of `T`.
#[derive(Debug)]
pub struct VolumeSink<T: Sample> {
    output: Interval,
    range: OutputRange,
    volume: Mutex<Buffer3<T>>,
}

impl<T: Sample + Default> VolumeSink<T> {
    /// Zero-initialized volume covering `output`.
    pub fn new(output: Interval, range: OutputRange) -> Result<Self, Error> {
        let volume = Buffer3::try_new_filled(output.size(), T::default())
            .map_err(|e| Error::exhausted::<T>("output volume", output.num_elements(), e))?;
        Ok(Self {
            output,
            range,
            volume: Mutex::new(volume),
        })
    }
}

impl<T: Sample> VolumeSink<T> {
    #[inline]
    pub fn output(&self) -> Interval {
        self.output
    }

    pub fn into_volume(self) -> Buffer3<T> {
        self.volume.into_inner()
    }
}

impl<T: Sample> BlockSink for VolumeSink<T> {
    fn write_block(&self, block: &Interval, data: &Buffer3<f32>) -> Result<(), ExternalError> {
        if !self.output.contains(block) || data.dims() != block.size() {
            return Err(format!("block {block} does not fit volume {}", self.output).into());
        }

        let offset = block.min() - self.output.min();
        let (ox, oy, oz) = (offset.x as usize, offset.y as usize, offset.z as usize);
        let [width, height, depth] = block.size();

        // Convert outside the lock; only the copy is serialized.
        let converted: Vec<T> = data.iter().map(|&v| self.range.apply::<T>(v)).collect();

        let mut volume = self.volume.lock();
        for z in 0..depth {
            for y in 0..height {
                let src = &converted[(z * height + y) * width..][..width];
                volume.row_mut(oy + y, oz + z)[ox..ox + width].copy_from_slice(src);
            }
        }
        Ok(())
    }
}
