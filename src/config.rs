// src/config.rs
// =============================================================================
// This file holds every knob the pipeline exposes.
//
// Where values come from (later sources win):
// 1. Built-in defaults (the Default impls below)
// 2. An optional TOML file passed with --config
// 3. Command-line flags (applied in main.rs)
//
// After merging, validate() checks the values once so the rest of the
// program can trust them.
//
// Rust concepts:
// - serde: Derive Deserialize so a TOML file maps straight onto our structs
// - #[serde(default)]: Missing fields fall back to Default::default()
// - thiserror: Derive std::error::Error for our own error enum
// =============================================================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// Errors that can happen while loading or checking the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// What happens to entries whose probe failed or was too slow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnreachablePolicy {
    /// Keep them in the output, sorted after every reachable entry
    Retain,
    /// Remove them before ranking
    Drop,
}

// How entries that share a channel name are arranged inside a category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grouping {
    /// Keep all sources of one channel next to each other
    ByName,
    /// Sort the whole category purely by measured quality
    None,
}

// The classification rules
//
// Labels and keywords are data, not code, so the same classifier works for
// other playlists with other naming habits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Regex that marks the designated broadcaster family (rule 1)
    pub broadcaster_pattern: String,
    /// Category label for rule 1 matches
    pub broadcaster_label: String,
    /// Token that marks a satellite channel (rule 2)
    pub satellite_marker: String,
    /// Category label for rule 2 matches
    pub satellite_label: String,
    /// Appended to a province keyword to build its label
    pub province_suffix: String,
    /// Label used when nothing else matches
    pub fallback_label: String,
    /// Province keywords, checked in this order
    pub provinces: Vec<String>,
}

impl Default for RuleConfig {
    fn default() -> Self {
        RuleConfig {
            broadcaster_pattern: "CCTV|CETV".to_string(),
            broadcaster_label: "央视频道".to_string(),
            satellite_marker: "卫视".to_string(),
            satellite_label: "卫视频道".to_string(),
            province_suffix: "频道".to_string(),
            fallback_label: "其他频道".to_string(),
            provinces: to_strings(&[
                "北京", "天津", "河北", "山西", "内蒙古", "辽宁", "吉林", "黑龙江", "上海",
                "江苏", "浙江", "安徽", "福建", "江西", "山东", "河南", "湖北", "湖南", "广东",
                "广西", "海南", "重庆", "四川", "贵州", "云南", "西藏", "陕西", "甘肃", "青海",
                "宁夏", "新疆", "港澳台",
            ]),
        }
    }
}

// Everything the pipeline needs to run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum number of probes in flight at once
    pub concurrency: usize,
    /// Overall deadline for one probe, in milliseconds
    pub timeout_ms: u64,
    /// How many body bytes each probe reads
    pub read_bytes: usize,
    /// Minimum throughput (KB/s) for a probe to count as reachable
    pub min_kbps: f64,
    /// Measure a body that ends before `read_bytes` instead of failing it
    pub accept_short_reads: bool,
    /// Drop or keep unreachable entries
    pub unreachable: UnreachablePolicy,
    /// Emit categories that ended up with no entries
    pub keep_empty_categories: bool,
    /// Duplicate-name grouping for every category...
    pub grouping: Grouping,
    /// ...unless a category label has its own setting here
    pub grouping_overrides: HashMap<String, Grouping>,
    /// User-Agent header sent with every probe
    pub user_agent: String,
    /// Fixed channel order for the broadcaster category
    pub canonical_order: Vec<String>,
    pub rules: RuleConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            concurrency: 200,
            timeout_ms: 5_000,
            read_bytes: 1024,
            min_kbps: 0.0,
            accept_short_reads: false,
            unreachable: UnreachablePolicy::Retain,
            keep_empty_categories: true,
            grouping: Grouping::ByName,
            grouping_overrides: HashMap::new(),
            user_agent: concat!("iptv-sorter/", env!("CARGO_PKG_VERSION")).to_string(),
            canonical_order: default_canonical_order(),
            rules: RuleConfig::default(),
        }
    }
}

impl PipelineConfig {
    // Reads a TOML file and fills in anything it leaves out with defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    // Loads from a file when one is given, otherwise starts from defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    // Checks that the merged values make sense
    //
    // The regex itself is compiled (and checked) by the classifier.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(invalid("concurrency", "must be at least 1"));
        }
        if self.timeout_ms == 0 {
            return Err(invalid("timeout_ms", "must be greater than 0"));
        }
        if self.read_bytes == 0 {
            return Err(invalid("read_bytes", "must be greater than 0"));
        }
        if !self.min_kbps.is_finite() || self.min_kbps < 0.0 {
            return Err(invalid("min_kbps", "must be a finite number >= 0"));
        }
        if self.rules.satellite_marker.is_empty() {
            return Err(invalid("rules.satellite_marker", "must not be empty"));
        }
        if self.rules.provinces.iter().all(|p| p.is_empty()) {
            return Err(invalid("rules.provinces", "needs at least one keyword"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_canonical_order() -> Vec<String> {
    to_strings(&[
        "CCTV-1综合", "CCTV-2财经", "CCTV-3综艺", "CCTV-4中文国际", "CCTV-5体育",
        "CCTV-5+体育赛事", "CCTV-6电影", "CCTV-7国防军事", "CCTV-8电视剧", "CCTV-9纪录",
        "CCTV-10科教", "CCTV-11戏曲", "CCTV-12社会与法", "CCTV-13新闻", "CCTV-14少儿",
        "CCTV-15音乐", "CCTV-16奥林匹克", "CCTV-17农业农村", "CETV-1", "CETV-2", "CETV-3",
        "CETV-4",
    ])
}
