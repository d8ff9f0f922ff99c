// src/probe/mod.rs
// =============================================================================
// This module measures how well each stream endpoint responds.
//
// Submodules:
// - http: One probe over HTTP, plus the StreamProbe trait and ProbeError
// - batch: Runs a category's probes concurrently under a shared limit
//
// Rust concepts:
// - pub use: Re-export items so callers write `probe::Prober`
// - Generics: Prober<P> works with any StreamProbe implementation
// =============================================================================

mod batch;
mod http;

pub use batch::{ProbeResult, ProbeSettings, Prober};
pub use http::{HttpProbe, StreamProbe};

// Scripted probe and helpers, shared with the ranking and pipeline tests
#[cfg(test)]
pub(crate) use batch::tests as testing;
