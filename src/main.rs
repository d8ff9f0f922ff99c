// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Set up logging (RUST_LOG controls the level, default "info")
// 2. Parse command-line arguments using clap
// 3. Load the config file and apply command-line overrides
// 4. Fetch the channel list, run the pipeline, write the output
// 5. Exit with proper code (0 = success, 1 = nothing reachable, 2 = error)
// =============================================================================

// Module declarations - tells Rust about our other source files
mod cli;           // src/cli.rs - command-line parsing
mod classify;      // src/classify/ - category rules
mod config;        // src/config.rs - pipeline settings
mod pipeline;      // src/pipeline/ - classify -> probe -> rank
mod playlist;      // src/playlist/ - text list in and out
mod probe;         // src/probe/ - stream speed measurement
mod rank;          // src/rank/ - ordering inside categories

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use tracing::{info, warn};

use classify::Classifier;
use cli::{Cli, Commands, Overrides, SourceArgs};
use config::PipelineConfig;
use pipeline::{Pipeline, PipelineOutput};
use probe::HttpProbe;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Returns:
//   Ok(0) = list written, at least one stream reachable
//   Ok(1) = list written, but no stream was reachable
//   Err   = fatal error (no source, bad config, output not writable)
async fn run() -> Result<i32> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Update {
            source,
            output,
            concurrency,
            timeout_ms,
            read_bytes,
            min_kbps,
            drop_unreachable,
        } => {
            let overrides = Overrides {
                concurrency,
                timeout_ms,
                read_bytes,
                min_kbps,
                drop_unreachable,
            };
            handle_update(&source, overrides, &output).await
        }
        Commands::Classify { source } => handle_classify(&source).await,
    }
}

fn load_config(args: &SourceArgs, overrides: Overrides) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::load_or_default(args.config.as_deref())?;
    overrides.apply(&mut config);
    Ok(config)
}

// Handles the 'update' subcommand
async fn handle_update(args: &SourceArgs, overrides: Overrides, output: &Path) -> Result<i32> {
    let config = load_config(args, overrides)?;

    let probe = HttpProbe::new(config.timeout(), &config.user_agent)
        .context("failed to create HTTP client")?
        .accept_short_reads(config.accept_short_reads);
    let pipeline = Pipeline::new(&config, probe)?;

    println!("📡 Downloading channel list: {}", args.source);
    let lines = playlist::fetch_source(&args.source).await?;

    info!(
        concurrency = config.concurrency,
        timeout_ms = config.timeout_ms,
        read_bytes = config.read_bytes,
        "probing streams"
    );
    let result = pipeline.run(&lines).await;

    let text = playlist::render_playlist(&result.categories);
    playlist::write_playlist(output, &text).await?;
    info!(path = %output.display(), entries = result.total_kept(), "output written");

    print_summary(&result, args.json)?;

    if result.total_reachable() == 0 {
        warn!("no stream was reachable");
        Ok(1)
    } else {
        Ok(0)
    }
}

// Handles the 'classify' subcommand (dry run, no probing)
async fn handle_classify(args: &SourceArgs) -> Result<i32> {
    let config = load_config(args, Overrides::default())?;
    config.validate()?;
    let classifier = Classifier::new(&config.rules)?;

    let lines = playlist::fetch_source(&args.source).await?;
    let classification = classifier.classify_all(playlist::parse_lines(&lines));

    if args.json {
        println!("{}", serde_json::to_string_pretty(&classification)?);
    } else {
        println!("{:<20} {:>8}", "CATEGORY", "ENTRIES");
        println!("{}", "=".repeat(29));
        for category in &classification.categories {
            println!("{:<20} {:>8}", category.label, category.entries.len());
        }
        println!();
        println!("📋 Total: {}", classification.total_entries());
    }

    Ok(0)
}

// Prints the run either as a summary table or as full JSON
// (every ranked entry with its measurements and failure reason)
fn print_summary(result: &PipelineOutput, json: bool) -> Result<()> {
    if json {
        let json_output = serde_json::to_string_pretty(result)?;
        println!("{}", json_output);
    } else {
        print_table(result);
    }
    Ok(())
}

// Prints results as a human-readable table in the terminal
fn print_table(result: &PipelineOutput) {
    println!(
        "{:<20} {:>8} {:>10} {:>8} {:>8}",
        "CATEGORY", "PROBED", "REACHABLE", "DROPPED", "KEPT"
    );
    println!("{}", "=".repeat(58));

    for row in &result.summary {
        println!(
            "{:<20} {:>8} {:>10} {:>8} {:>8}",
            row.label, row.probed, row.reachable, row.dropped, row.kept
        );
    }

    println!();
    println!("📊 Summary:");
    println!("   ✅ Reachable: {}", result.total_reachable());
    println!("   📋 Written: {}", result.total_kept());
    println!("   ⏱  Took: {:.1}s", result.elapsed.as_secs_f64());
}
