//! FigPro plugin layer
//!
//! The caller side of the credit economy:
//! - Preset prompt storage with stock presets for a fresh install
//! - The generation pipeline that pairs every admitted debit with exactly
//!   one terminal outcome (keep on success, refund on failure)
//!
//! Image generation itself happens behind the [`ImageGenerator`] trait; the
//! HTTP client implementing it lives outside this workspace, as does the
//! chat dispatch layer that feeds messages in.

pub mod pipeline;
pub mod presets;

pub use pipeline::{GenerationError, GenerationPipeline, ImageGenerator, PipelineOutcome};
pub use presets::PresetStore;
