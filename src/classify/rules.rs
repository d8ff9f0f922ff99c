// src/classify/rules.rs
// =============================================================================
// This module assigns every entry to exactly one category.
//
// Rules are checked in order, first match wins:
// 1. Name matches the broadcaster pattern (CCTV|CETV) -> 央视频道
// 2. Name contains the satellite marker (卫视)         -> 卫视频道
//    and the name is cut down to "<prefix>卫视"
// 3. A province keyword in the section label           -> <province>频道
//    else a province keyword in the name               -> <province>频道
//    else                                              -> 其他频道
//
// The section label is checked before the name because headers are curated
// while names are free text.
//
// Rust concepts:
// - regex: Compiled once, reused for every entry
// - fold: Build the category list without any shared mutable state
// - HashMap + Vec: Fast lookup by label while keeping first-seen order
// =============================================================================

use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

use crate::config::{ConfigError, RuleConfig};
use crate::playlist::Entry;

// Which rule produced a category
//
// The ranker needs this to find the broadcaster category without comparing
// label strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    Broadcaster,
    Satellite,
    Province,
    Fallback,
}

// The outcome of classifying one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub label: String,
    pub kind: CategoryKind,
    /// The name to keep (shortened for satellite channels)
    pub name: String,
}

// A category with its entries, before any probing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingCategory {
    pub label: String,
    pub kind: CategoryKind,
    pub entries: Vec<Entry>,
}

// All categories in the order they were first assigned
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Classification {
    pub categories: Vec<PendingCategory>,
}

impl Classification {
    pub fn total_entries(&self) -> usize {
        self.categories.iter().map(|c| c.entries.len()).sum()
    }
}

// Accumulator used while folding entries into categories
#[derive(Default)]
struct Buckets {
    categories: Vec<PendingCategory>,
    index: HashMap<String, usize>,
}

impl Buckets {
    fn push(mut self, assignment: Assignment, entry: Entry) -> Self {
        let slot = match self.index.get(&assignment.label) {
            Some(&slot) => slot,
            None => {
                self.index
                    .insert(assignment.label.clone(), self.categories.len());
                self.categories.push(PendingCategory {
                    label: assignment.label,
                    kind: assignment.kind,
                    entries: Vec::new(),
                });
                self.categories.len() - 1
            }
        };

        self.categories[slot].entries.push(Entry {
            name: assignment.name,
            ..entry
        });
        self
    }
}

// The compiled rule chain
#[derive(Debug, Clone)]
pub struct Classifier {
    broadcaster: Regex,
    broadcaster_label: String,
    satellite_marker: String,
    satellite_prefix: Regex,
    satellite_label: String,
    provinces: Vec<String>,
    province_suffix: String,
    fallback_label: String,
}

impl Classifier {
    // Compiles the rules, failing if the broadcaster pattern is not a valid regex
    pub fn new(rules: &RuleConfig) -> Result<Self, ConfigError> {
        let broadcaster = Regex::new(&rules.broadcaster_pattern).map_err(|e| {
            ConfigError::Invalid {
                field: "rules.broadcaster_pattern",
                reason: e.to_string(),
            }
        })?;

        // Shortest prefix that ends with the marker, e.g. "北京卫视HD" -> "北京卫视"
        let prefix_pattern = format!("^.*?{}", regex::escape(&rules.satellite_marker));
        let satellite_prefix = Regex::new(&prefix_pattern).map_err(|e| ConfigError::Invalid {
            field: "rules.satellite_marker",
            reason: e.to_string(),
        })?;

        Ok(Classifier {
            broadcaster,
            broadcaster_label: rules.broadcaster_label.clone(),
            satellite_marker: rules.satellite_marker.clone(),
            satellite_prefix,
            satellite_label: rules.satellite_label.clone(),
            provinces: rules
                .provinces
                .iter()
                .filter(|p| !p.is_empty())
                .cloned()
                .collect(),
            province_suffix: rules.province_suffix.clone(),
            fallback_label: rules.fallback_label.clone(),
        })
    }

    // Classifies a single (section, name) pair
    //
    // Pure function: the same input always gives the same output.
    pub fn classify(&self, section: Option<&str>, name: &str) -> Assignment {
        if self.broadcaster.is_match(name) {
            return Assignment {
                label: self.broadcaster_label.clone(),
                kind: CategoryKind::Broadcaster,
                name: name.to_string(),
            };
        }

        if name.contains(&self.satellite_marker) {
            let name = match self.satellite_prefix.find(name) {
                Some(prefix) => prefix.as_str().to_string(),
                // Unreachable while `contains` holds; kept as the bad-data fallback
                None => {
                    warn!(name, "could not extract satellite prefix, keeping full name");
                    name.to_string()
                }
            };
            return Assignment {
                label: self.satellite_label.clone(),
                kind: CategoryKind::Satellite,
                name,
            };
        }

        // Section label first, then the name itself
        let province = section
            .and_then(|label| self.find_province(label))
            .or_else(|| self.find_province(name));

        match province {
            Some(province) => Assignment {
                label: format!("{}{}", province, self.province_suffix),
                kind: CategoryKind::Province,
                name: name.to_string(),
            },
            None => Assignment {
                label: self.fallback_label.clone(),
                kind: CategoryKind::Fallback,
                name: name.to_string(),
            },
        }
    }

    // Folds parsed entries into categories, keeping first-seen category order
    pub fn classify_all(&self, entries: Vec<Entry>) -> Classification {
        let buckets = entries
            .into_iter()
            .fold(Buckets::default(), |buckets, entry| {
                let assignment = self.classify(entry.section.as_deref(), &entry.name);
                buckets.push(assignment, entry)
            });

        Classification {
            categories: buckets.categories,
        }
    }

    // First keyword of the province list (in list order) found in `text`
    fn find_province(&self, text: &str) -> Option<&str> {
        self.provinces
            .iter()
            .find(|province| text.contains(province.as_str()))
            .map(String::as_str)
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What does "^.*?卫视" mean?
//    - ^ anchors at the start, .*? matches as little as possible
//    - So the match stops at the FIRST 卫视
//
// 2. Why fold instead of a mutable HashMap loop?
//    - fold threads one accumulator through the iterator
//    - Nothing outside the call can see a half-built result
//
// 3. What does `Entry { name, ..entry }` do?
//    - Struct update syntax: take `name` from here, everything else from entry
// -----------------------------------------------------------------------------
