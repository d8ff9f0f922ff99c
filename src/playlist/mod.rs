// src/playlist/mod.rs
// =============================================================================
// This module deals with the text list format on both ends of the pipeline.
//
// Submodules:
// - source: Loads the raw list from a URL or a file
// - parser: Turns lines into entries (name, url, section)
// - writer: Renders ranked categories back into the same format
// =============================================================================

mod parser;
mod source;
mod writer;

pub use parser::{parse_lines, Entry};
pub use source::{fetch_source, DEFAULT_SOURCE};
pub use writer::{render_playlist, write_playlist};
