// src/rank/mod.rs
// =============================================================================
// This module orders probe results inside each category.
//
// Submodules:
// - order: The quality comparator and the per-category layouts
// =============================================================================

mod order;

pub use order::{RankedCategory, Ranker};
