// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// clap is a popular Rust library for parsing command-line arguments.
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things).
//
// Flags shared by both subcommands live in SourceArgs and are pulled in
// with #[command(flatten)].
// =============================================================================

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{PipelineConfig, UnreachablePolicy};
use crate::playlist::DEFAULT_SOURCE;

// This struct represents our entire CLI application
#[derive(Parser, Debug)]
#[command(
    name = "iptv-sorter",
    version,
    about = "Classify an IPTV channel list and rank every stream by measured speed",
    long_about = "iptv-sorter downloads a `name,url` channel list, sorts the channels into categories \
                  (CCTV, satellite, per province, other), probes every stream concurrently and writes \
                  the list back with the fastest sources first."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Probe every stream and write the ranked list
    ///
    /// Example: iptv-sorter update --output cmlive.txt --concurrency 500
    Update {
        #[command(flatten)]
        source: SourceArgs,

        /// Where to write the ranked list
        #[arg(long, short, default_value = "cmlive.txt")]
        output: PathBuf,

        /// Maximum probes in flight at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Per-probe deadline in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Body bytes to read from each stream
        #[arg(long)]
        read_bytes: Option<usize>,

        /// Streams slower than this (KB/s) count as unreachable
        #[arg(long)]
        min_kbps: Option<f64>,

        /// Leave unreachable streams out instead of listing them last
        #[arg(long)]
        drop_unreachable: bool,
    },

    /// Show how the list would be categorized, without probing anything
    ///
    /// Example: iptv-sorter classify --source zubo_all.txt --json
    Classify {
        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Channel list to read: an http(s) URL or a local file
    #[arg(long, short, default_value = DEFAULT_SOURCE)]
    pub source: String,

    /// TOML file with pipeline settings
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Output results in JSON format instead of a table
    #[arg(long)]
    pub json: bool,
}

// Command-line overrides for the config file
#[derive(Debug, Default)]
pub struct Overrides {
    pub concurrency: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub read_bytes: Option<usize>,
    pub min_kbps: Option<f64>,
    pub drop_unreachable: bool,
}

impl Overrides {
    // Flags win over whatever the config file said
    pub fn apply(self, config: &mut PipelineConfig) {
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if let Some(read_bytes) = self.read_bytes {
            config.read_bytes = read_bytes;
        }
        if let Some(min_kbps) = self.min_kbps {
            config.min_kbps = min_kbps;
        }
        if self.drop_unreachable {
            config.unreachable = UnreachablePolicy::Drop;
        }
    }
}
