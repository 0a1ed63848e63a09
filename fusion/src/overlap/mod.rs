//! Overlap index: which views can touch a given block.
//!
//! Built once per job from every view's transformed bounding box, grown by a
//! safety margin. Queries are conservative: a view whose true support meets a
//! block is never missed as long as the margin covers the downstream kernel
//! radius. `filter` and `offset` return new instances and never mutate.

#[cfg(test)]
mod tests;

use glam::I64Vec3;

use crate::error::ConfigError;
use crate::math::Interval;
use crate::view::{View, ViewId};

/// One view's slot in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapEntry {
    /// Position of the view in the job's view list.
    pub position: usize,
    pub id: ViewId,
    /// Output-space bounding box including the margin.
    pub bbox: Interval,
}

/// Immutable ordered list of (view, bounding box) pairs.
///
/// Order is the construction order of the view list and defines priority for
/// the tie-breaking combiners.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlapIndex {
    entries: Vec<OverlapEntry>,
}

impl OverlapIndex {
    /// Compute the smallest integer box containing each view's transformed
    /// `[0, dims)` box, grown by `margin` on every side.
    ///
    /// With `n_dims == 2` the z axis is collapsed to the single plane `z = 0`
    /// and is not grown.
    pub fn build(views: &[View], margin: i64, n_dims: usize) -> Result<Self, ConfigError> {
        if !(2..=3).contains(&n_dims) {
            return Err(ConfigError::UnsupportedDimensionality { n_dims });
        }

        let grow = if n_dims == 2 {
            I64Vec3::new(margin, margin, 0)
        } else {
            I64Vec3::splat(margin)
        };

        let entries: Vec<OverlapEntry> = views
            .iter()
            .enumerate()
            .map(|(position, view)| {
                let (lo, hi) = view.transform().world_bounds(view.dims()).map_err(|e| match e {
                    ConfigError::NonRigidFit { reason } => ConfigError::NonRigidFit {
                        reason: format!("{}: {reason}", view.id()),
                    },
                    other => other,
                })?;
                let mut bbox = Interval::enclosing(lo, hi);
                if n_dims == 2 {
                    bbox = Interval::new(
                        I64Vec3::new(bbox.min().x, bbox.min().y, 0),
                        I64Vec3::new(bbox.max().x, bbox.max().y, 0),
                    );
                }
                Ok(OverlapEntry {
                    position,
                    id: view.id(),
                    bbox: bbox.expand(grow),
                })
            })
            .collect::<Result<_, ConfigError>>()?;

        Ok(Self { entries })
    }

    /// Index from precomputed entries, kept in the given order.
    pub fn from_entries(entries: Vec<OverlapEntry>) -> Self {
        Self { entries }
    }

    /// Ordered subset of entries whose box intersects `region`.
    pub fn filter(&self, region: &Interval) -> OverlapIndex {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|entry| entry.bbox.intersects(region))
                .copied()
                .collect(),
        }
    }

    /// Copy with every box translated by `-origin`, rebasing to block-local coordinates.
    pub fn offset(&self, origin: I64Vec3) -> OverlapIndex {
        Self {
            entries: self
                .entries
                .iter()
                .map(|entry| OverlapEntry {
                    bbox: entry.bbox.translate(-origin),
                    ..*entry
                })
                .collect(),
        }
    }

    /// Indices into this index whose box intersects `[min, max]`, in order.
    pub fn query(&self, min: I64Vec3, max: I64Vec3) -> Vec<usize> {
        let region = Interval::new(min, max);
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.bbox.intersects(&region))
            .map(|(i, _)| i)
            .collect()
    }

    #[inline]
    pub fn entries(&self) -> &[OverlapEntry] {
        &self.entries
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OverlapEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a OverlapIndex {
    type Item = &'a OverlapEntry;
    type IntoIter = std::slice::Iter<'a, OverlapEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
