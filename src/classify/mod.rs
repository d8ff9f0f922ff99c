// src/classify/mod.rs
// =============================================================================
// This module sorts parsed entries into categories.
//
// Submodules:
// - rules: The ordered rule chain and the fold that builds categories
// =============================================================================

mod rules;

pub use rules::{CategoryKind, Classification, Classifier};
