//! Per-view weight generators.
//!
//! - [`Blending`]: cosine ramp towards the view faces, values in `[0, 1]`.
//! - [`Masking`]: binary visibility mask for the priority combiners.
//! - [`ContentBased`]: local-contrast estimate, non-negative and unclamped.
//!
//! Blending and masking are pure functions of immutable geometry and are
//! shared freely across threads. Content-based weights read pixels and need
//! per-thread [`ContentScratch`].

mod blending;
mod content_based;
mod gaussian;
mod lut;
mod masking;
mod separable;


pub use blending::Blending;
pub use content_based::{ContentBased, ContentScratch};
pub use gaussian::{gaussian_blur, gaussian_kernel_1d, kernel_radius};
pub use lut::cosine_ramp;
pub use masking::Masking;
pub use separable::{AxisProfile, SeparableWeight};
