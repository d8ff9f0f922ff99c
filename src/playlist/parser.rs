// src/playlist/parser.rs
// =============================================================================
// This module turns the raw text list into entries.
//
// The format is line based:
//   北京频道,#genre#              <- section header, sets context
//   北京新闻,http://host/stream   <- entry: name, then url after the FIRST comma
//
// Lines without a comma are malformed and quietly skipped.
//
// Rust concepts:
// - Iterators: For walking the lines once
// - split_once: Splits a &str at the first occurrence of a character
// - Option<String>: The section label may not exist yet
// =============================================================================

use serde::Serialize;

/// Suffix that turns a line into a section header
pub const SECTION_MARKER: &str = ",#genre#";

/// Separates the channel name from its url
pub const SEPARATOR: char = ',';

// One named stream endpoint from the source list
//
// Entries are never mutated after parsing, except that the classifier may
// hand back a copy with a shortened name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    /// Channel name as written in the source
    pub name: String,
    /// Everything after the first comma
    pub url: String,
    /// Section header that was active when this entry was read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Position among all parsed entries, used to break exact ties
    #[serde(skip)]
    pub position: usize,
}

// Parses a sequence of lines into entries, keeping input order
//
// Each line is trimmed and blank lines are ignored, so callers can pass
// raw lines as well as pre-cleaned ones.
pub fn parse_lines<I, S>(lines: I) -> Vec<Entry>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut entries = Vec::new();
    let mut current_section: Option<String> = None;

    for line in lines {
        let line = line.as_ref().trim();
        if line.is_empty() {
            continue;
        }

        // Section headers only change context
        if let Some(label) = line.strip_suffix(SECTION_MARKER) {
            current_section = Some(label.to_string()).filter(|l| !l.is_empty());
            continue;
        }

        // No separator means we can't tell name from url
        let Some((name, url)) = line.split_once(SEPARATOR) else {
            continue;
        };

        entries.push(Entry {
            name: name.to_string(),
            url: url.to_string(),
            section: current_section.clone(),
            position: entries.len(),
        });
    }

    entries
}
