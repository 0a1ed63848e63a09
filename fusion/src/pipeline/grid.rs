//! Tiling of the output interval into block requests.

use glam::I64Vec3;

use crate::math::Interval;

/// Regular tiling of an output interval; edge blocks are clipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGrid {
    output: Interval,
    block_size: [usize; 3],
    counts: [usize; 3],
}

impl BlockGrid {
    pub fn new(output: Interval, block_size: [usize; 3]) -> Self {
        let size = output.size();
        let mut counts = [0; 3];
        for axis in 0..3 {
            counts[axis] = if block_size[axis] == 0 {
                0
            } else {
                size[axis].div_ceil(block_size[axis])
            };
        }
        Self {
            output,
            block_size,
            counts,
        }
    }

    #[inline]
    pub fn output(&self) -> Interval {
        self.output
    }

    #[inline]
    pub fn block_size(&self) -> [usize; 3] {
        self.block_size
    }

    /// Number of blocks along each axis.
    #[inline]
    pub fn blocks_per_axis(&self) -> [usize; 3] {
        self.counts
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.counts[0] * self.counts[1] * self.counts[2]
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Block `i` in x-fastest order.
    pub fn block(&self, i: usize) -> Option<Interval> {
        (i < self.len()).then(|| self.block_at(i))
    }

    fn block_at(&self, i: usize) -> Interval {
        let [cx, cy, _] = self.counts;
        let cell = [i % cx, (i / cx) % cy, i / (cx * cy)];
        let mut min = self.output.min();
        let mut max = min;
        for axis in 0..3 {
            min[axis] += (cell[axis] * self.block_size[axis]) as i64;
            max[axis] = (min[axis] + self.block_size[axis] as i64 - 1).min(self.output.max()[axis]);
        }
        Interval::new(min, max)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = Interval> + '_ {
        (0..self.len()).map(|i| self.block_at(i))
    }

    /// All blocks, for parallel iteration.
    pub fn blocks(&self) -> Vec<Interval> {
        self.iter().collect()
    }
}
