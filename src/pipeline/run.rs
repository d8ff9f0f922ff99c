// src/pipeline/run.rs
// =============================================================================
// This module wires the stages together:
//
//   lines -> parse -> classify -> (per category) probe -> rank -> output
//
// Categories are processed one after another, in the order the classifier
// first created them. Inside a category every probe runs concurrently.
// Because the prober's semaphore is shared, the limit holds for the whole
// run, not per category.
//
// Rust concepts:
// - Generics: Pipeline<P> accepts any StreamProbe
// - Iterators: filter/partition for the drop policy
// =============================================================================

use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

use crate::classify::{Classification, Classifier};
use crate::config::{ConfigError, PipelineConfig, UnreachablePolicy};
use crate::playlist::parse_lines;
use crate::probe::{ProbeSettings, Prober, StreamProbe};
use crate::rank::{RankedCategory, Ranker};

// Counts for one category, for the summary table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub label: String,
    /// Entries probed
    pub probed: usize,
    /// Entries that answered fast enough
    pub reachable: usize,
    /// Entries removed by the unreachable policy
    pub dropped: usize,
    /// Entries in the final output
    pub kept: usize,
}

// Everything a run produces
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub categories: Vec<RankedCategory>,
    pub summary: Vec<CategorySummary>,
    #[serde(serialize_with = "as_secs")]
    pub elapsed: Duration,
}

impl PipelineOutput {
    pub fn total_kept(&self) -> usize {
        self.summary.iter().map(|s| s.kept).sum()
    }

    pub fn total_reachable(&self) -> usize {
        self.summary.iter().map(|s| s.reachable).sum()
    }
}

fn as_secs<S: serde::Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}

pub struct Pipeline<P> {
    classifier: Classifier,
    prober: Prober<P>,
    ranker: Ranker,
    unreachable: UnreachablePolicy,
    keep_empty: bool,
}

impl<P: StreamProbe> Pipeline<P> {
    // Builds every stage from one validated config
    pub fn new(config: &PipelineConfig, probe: P) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Pipeline {
            classifier: Classifier::new(&config.rules)?,
            prober: Prober::new(probe, config.concurrency, ProbeSettings::from_config(config)),
            ranker: Ranker::new(config),
            unreachable: config.unreachable,
            keep_empty: config.keep_empty_categories,
        })
    }

    // Parse and classify only, no network
    pub fn classify<S: AsRef<str>>(&self, lines: &[S]) -> Classification {
        let entries = parse_lines(lines.iter().map(AsRef::as_ref));
        self.classifier.classify_all(entries)
    }

    // Runs the whole pipeline over the source lines
    pub async fn run<S: AsRef<str>>(&self, lines: &[S]) -> PipelineOutput {
        let started = Instant::now();
        let classification = self.classify(lines);
        info!(
            entries = classification.total_entries(),
            categories = classification.categories.len(),
            "classified source list"
        );

        let mut categories = Vec::with_capacity(classification.categories.len());
        let mut summary = Vec::with_capacity(classification.categories.len());

        for pending in classification.categories {
            let batch_started = Instant::now();
            let results = self.prober.probe_batch(pending.entries).await;

            let probed = results.len();
            let reachable = results.iter().filter(|r| r.reachable).count();

            let results = match self.unreachable {
                UnreachablePolicy::Retain => results,
                UnreachablePolicy::Drop => results.into_iter().filter(|r| r.reachable).collect(),
            };
            let dropped = probed - results.len();

            let results = self.ranker.rank(&pending.label, pending.kind, results);

            info!(
                category = %pending.label,
                probed,
                reachable,
                dropped,
                kept = results.len(),
                elapsed_ms = batch_started.elapsed().as_millis() as u64,
                "category probed"
            );

            if results.is_empty() && !self.keep_empty {
                continue;
            }

            summary.push(CategorySummary {
                label: pending.label.clone(),
                probed,
                reachable,
                dropped,
                kept: results.len(),
            });
            categories.push(RankedCategory {
                label: pending.label,
                kind: pending.kind,
                results,
            });
        }

        PipelineOutput {
            categories,
            summary,
            elapsed: started.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playlist::{parse_lines, render_playlist};
    use crate::probe::testing::{Script, ScriptedProbe};

    fn names(category: &RankedCategory) -> Vec<&str> {
        category.results.iter().map(|r| r.entry.name.as_str()).collect()
    }

    fn labels(output: &PipelineOutput) -> Vec<&str> {
        output.categories.iter().map(|c| c.label.as_str()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_example_scenario() {
        let probe = ScriptedProbe::new()
            .speed("http://a", 500)
            .speed("http://b", 50)
            .speed("http://c", 800);
        let pipeline = Pipeline::new(&PipelineConfig::default(), probe).unwrap();

        let output = pipeline
            .run(&["华北频道,#genre#", "CCTV-1综合,http://a", "北京卫视,http://b", "北京新闻,http://c"])
            .await;

        assert_eq!(labels(&output), vec!["央视频道", "卫视频道", "北京频道"]);
        assert_eq!(names(&output.categories[0]), vec!["CCTV-1综合"]);
        assert_eq!(names(&output.categories[1]), vec!["北京卫视"]);
        assert_eq!(names(&output.categories[2]), vec!["北京新闻"]);
        assert!((output.categories[2].results[0].throughput_kbps - 800.0).abs() < 1.0);
        assert_eq!(output.total_reachable(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ranks_within_category() {
        let probe = ScriptedProbe::new()
            .speed("http://slow", 50)
            .speed("http://fast", 900)
            .with("http://dead", Script::Fail);
        let config = PipelineConfig {
            grouping: crate::config::Grouping::None,
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::new(&config, probe).unwrap();

        let output = pipeline
            .run(&["上海新闻,http://dead", "上海新闻,http://slow", "上海都市,http://fast"])
            .await;

        let urls: Vec<&str> = output.categories[0]
            .results
            .iter()
            .map(|r| r.entry.url.as_str())
            .collect();
        assert_eq!(urls, vec!["http://fast", "http://slow", "http://dead"]);
        assert_eq!(
            output.summary[0],
            CategorySummary {
                label: "上海频道".to_string(),
                probed: 3,
                reachable: 2,
                dropped: 0,
                kept: 3,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_policy_and_empty_categories() {
        let probe = ScriptedProbe::new()
            .speed("http://ok", 100)
            .with("http://gone", Script::Fail);
        let lines = ["浙江新闻,http://ok", "五星体育,http://gone"];

        let config = PipelineConfig {
            unreachable: UnreachablePolicy::Drop,
            ..PipelineConfig::default()
        };
        let output = Pipeline::new(&config, probe).unwrap().run(&lines).await;
        // 其他频道 lost its only entry but is still listed
        assert_eq!(labels(&output), vec!["浙江频道", "其他频道"]);
        assert!(output.categories[1].results.is_empty());
        assert_eq!(output.summary[1].dropped, 1);

        let probe = ScriptedProbe::new()
            .speed("http://ok", 100)
            .with("http://gone", Script::Fail);
        let config = PipelineConfig {
            unreachable: UnreachablePolicy::Drop,
            keep_empty_categories: false,
            ..PipelineConfig::default()
        };
        let output = Pipeline::new(&config, probe).unwrap().run(&lines).await;
        assert_eq!(labels(&output), vec!["浙江频道"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_min_throughput_threshold() {
        let probe = ScriptedProbe::new()
            .speed("http://fast", 500)
            .speed("http://slow", 20);
        let config = PipelineConfig {
            min_kbps: 100.0,
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::new(&config, probe).unwrap();

        let output = pipeline
            .run(&["江苏新闻,http://slow", "江苏新闻,http://fast"])
            .await;

        let results = &output.categories[0].results;
        assert_eq!(results[0].entry.url, "http://fast");
        assert!(results[0].reachable);
        assert!(!results[1].reachable);
    }

    #[tokio::test(start_paused = true)]
    async fn test_canonical_category_in_pipeline() {
        let probe = ScriptedProbe::new()
            .speed("http://13", 900)
            .speed("http://1", 100)
            .speed("http://x", 999);
        let pipeline = Pipeline::new(&PipelineConfig::default(), probe).unwrap();

        let output = pipeline
            .run(&["CCTV-13新闻,http://13", "CCTV-1综合,http://1", "CCTV怀旧,http://x"])
            .await;

        assert_eq!(names(&output.categories[0]), vec!["CCTV-1综合", "CCTV-13新闻"]);
        assert_eq!(output.summary[0].probed, 3);
        assert_eq!(output.summary[0].kept, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_output_round_trips_through_parser() {
        let probe = ScriptedProbe::new()
            .speed("http://1", 300)
            .speed("http://2", 200)
            .speed("http://3", 100)
            .speed("http://4", 400);
        let pipeline = Pipeline::new(&PipelineConfig::default(), probe).unwrap();
        let output = pipeline
            .run(&["广东频道,#genre#", "广州综合,http://1", "湖南卫视高清,http://2", "珠江台,http://3", "广州综合,http://4"])
            .await;

        let text = render_playlist(&output.categories);
        let mut reparsed: Vec<(String, String, String)> = parse_lines(text.lines())
            .into_iter()
            .map(|e| (e.section.unwrap_or_default(), e.name, e.url))
            .collect();
        let mut expected: Vec<(String, String, String)> = output
            .categories
            .iter()
            .flat_map(|c| {
                c.results
                    .iter()
                    .map(|r| (c.label.clone(), r.entry.name.clone(), r.entry.url.clone()))
            })
            .collect();
        reparsed.sort();
        expected.sort();
        assert_eq!(reparsed, expected);
        // The satellite rename is what gets written
        assert!(text.contains("湖南卫视,http://2\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_output_serializes_entries_and_failures() {
        let probe = ScriptedProbe::new()
            .speed("http://ok", 100)
            .with("http://gone", Script::Fail);
        let pipeline = Pipeline::new(&PipelineConfig::default(), probe).unwrap();
        let output = pipeline
            .run(&["湖北新闻,http://ok", "湖北新闻,http://gone"])
            .await;

        let json = serde_json::to_value(&output).unwrap();
        let results = &json["categories"][0]["results"];
        assert_eq!(json["categories"][0]["label"], "湖北频道");
        assert_eq!(results[0]["entry"]["url"], "http://ok");
        assert!(results[0].get("failure").is_none());
        assert_eq!(results[1]["reachable"], false);
        assert!(results[1]["failure"].as_str().unwrap().contains("scripted failure"));
        assert_eq!(json["summary"][0]["reachable"], 1);
        assert!(json["elapsed"].is_f64());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = PipelineConfig {
            concurrency: 0,
            ..PipelineConfig::default()
        };
        assert!(Pipeline::new(&config, ScriptedProbe::new()).is_err());
    }

    #[test]
    fn test_classify_only() {
        let pipeline = Pipeline::new(&PipelineConfig::default(), ScriptedProbe::new()).unwrap();
        let classification = pipeline.classify(&["北京新闻,http://c", "no separator here"]);
        assert_eq!(classification.total_entries(), 1);
        assert_eq!(classification.categories[0].label, "北京频道");
    }
}
