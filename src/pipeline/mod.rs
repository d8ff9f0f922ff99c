// src/pipeline/mod.rs
// =============================================================================
// This module runs the classify -> probe -> rank pipeline end to end.
//
// Submodules:
// - run: The Pipeline type and its per-category summary
// =============================================================================

mod run;

pub use run::{Pipeline, PipelineOutput};
