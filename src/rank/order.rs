// src/rank/order.rs
// =============================================================================
// This module puts a category's probe results in their final order.
//
// Default comparator (best first):
//   reachable before unreachable
//   -> higher throughput
//   -> lower latency
//   -> earlier position in the source list (makes exact ties stable)
//
// Category-specific layouts:
// - Broadcaster category with a canonical list: one group per listed name,
//   in list order; names not on the list are left out
// - Grouping by name: all sources of one channel stay together, groups
//   appear in the order their first entry appeared in the source
// - No grouping: the whole category sorted by the comparator
//
// Rust concepts:
// - std::cmp::Ordering and .then_with(): Chain comparisons
// - f64::total_cmp: A total order for floats (f64 is not Ord)
// =============================================================================

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

use crate::classify::CategoryKind;
use crate::config::{Grouping, PipelineConfig};
use crate::probe::ProbeResult;

// A category after ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCategory {
    pub label: String,
    pub kind: CategoryKind,
    pub results: Vec<ProbeResult>,
}

// Compares two results, best first
pub fn compare_quality(a: &ProbeResult, b: &ProbeResult) -> Ordering {
    b.reachable
        .cmp(&a.reachable)
        .then_with(|| b.throughput_kbps.total_cmp(&a.throughput_kbps))
        .then_with(|| a.latency_secs.total_cmp(&b.latency_secs))
        .then_with(|| a.entry.position.cmp(&b.entry.position))
}

pub struct Ranker {
    canonical_order: Vec<String>,
    default_grouping: Grouping,
    grouping_overrides: HashMap<String, Grouping>,
}

impl Ranker {
    pub fn new(config: &PipelineConfig) -> Self {
        Ranker {
            canonical_order: config.canonical_order.clone(),
            default_grouping: config.grouping,
            grouping_overrides: config.grouping_overrides.clone(),
        }
    }

    // Orders one category's results
    pub fn rank(
        &self,
        label: &str,
        kind: CategoryKind,
        results: Vec<ProbeResult>,
    ) -> Vec<ProbeResult> {
        // An empty canonical list turns the override off
        if kind == CategoryKind::Broadcaster && !self.canonical_order.is_empty() {
            return self.rank_canonical(label, results);
        }

        let grouping = self
            .grouping_overrides
            .get(label)
            .copied()
            .unwrap_or(self.default_grouping);

        match grouping {
            Grouping::ByName => rank_grouped(results),
            Grouping::None => sorted(results),
        }
    }

    fn rank_canonical(&self, label: &str, results: Vec<ProbeResult>) -> Vec<ProbeResult> {
        let mut by_name: HashMap<String, Vec<ProbeResult>> = HashMap::new();
        for result in results {
            by_name
                .entry(result.entry.name.clone())
                .or_default()
                .push(result);
        }

        let mut ranked = Vec::new();
        for name in &self.canonical_order {
            if let Some(group) = by_name.remove(name) {
                ranked.extend(sorted(group));
            }
        }

        let omitted: usize = by_name.values().map(Vec::len).sum();
        if omitted > 0 {
            debug!(category = label, omitted, "entries not in canonical order left out");
        }

        ranked
    }
}

fn sorted(mut results: Vec<ProbeResult>) -> Vec<ProbeResult> {
    results.sort_by(compare_quality);
    results
}

// Groups by name in source order, then sorts inside each group
fn rank_grouped(mut results: Vec<ProbeResult>) -> Vec<ProbeResult> {
    // Probe output arrives in completion order; restore source order first
    // so "first encountered" means first in the source list.
    results.sort_by_key(|r| r.entry.position);

    let mut groups: Vec<Vec<ProbeResult>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for result in results {
        match index.get(&result.entry.name) {
            Some(&slot) => groups[slot].push(result),
            None => {
                index.insert(result.entry.name.clone(), groups.len());
                groups.push(vec![result]);
            }
        }
    }

    groups.into_iter().flat_map(sorted).collect()
}
