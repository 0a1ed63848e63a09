//! Testing utilities for fusion.

#![allow(dead_code)]

use std::sync::Arc;

use glam::{DAffine3, DVec3};

use crate::view::{ArrayPixelSource, FnPixelSource, PixelSource, View, ViewId};

/// Initialize tracing subscriber for tests.
/// Safe to call multiple times - will only initialize once.
/// Respects RUST_LOG env var, defaults to "info".
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Source returning `value` everywhere.
pub fn constant_source(dims: [usize; 3], value: f32) -> Arc<dyn PixelSource> {
    Arc::new(FnPixelSource::new(dims, move |_, _, _| value))
}

/// Source with a smooth, non-repeating pattern, so resampling errors show up.
pub fn pattern_source(dims: [usize; 3], seed: f32) -> Arc<dyn PixelSource> {
    Arc::new(FnPixelSource::new(dims, move |x, y, z| {
        let (x, y, z) = (x as f32, y as f32, z as f32);
        100.0 + seed + 0.5 * x + 0.25 * y + 0.125 * z + 10.0 * (0.3 * x + 0.2 * z + seed).sin()
    }))
}

/// Source with values `x + 10y + 100z` stored as u16.
pub fn index_source(dims: [usize; 3]) -> Arc<dyn PixelSource> {
    Arc::new(ArrayPixelSource::from_fn(dims, |x, y, z| {
        (x + 10 * y + 100 * z) as u16
    }))
}

/// Constant-valued view translated by `offset` into world space.
pub fn constant_view(id: u32, dims: [usize; 3], offset: DVec3, value: f32) -> View {
    View::affine(
        ViewId(id),
        DAffine3::from_translation(offset),
        constant_source(dims, value),
    )
}

/// Patterned view translated by `offset` into world space.
pub fn pattern_view(id: u32, dims: [usize; 3], offset: DVec3) -> View {
    View::affine(
        ViewId(id),
        DAffine3::from_translation(offset),
        pattern_source(dims, id as f32),
    )
}
