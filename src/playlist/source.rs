// src/playlist/source.rs
// =============================================================================
// This module gets the raw channel list.
//
// Strategy:
// - If the location is an http(s) URL, download it
// - Otherwise treat it as a path on disk
//
// Without a source list there is nothing to classify or probe, so any
// failure here is returned to main.rs and ends the run.
//
// Rust concepts:
// - async functions: For network and file I/O
// - anyhow::Context: Attach a readable message to an error on its way up
// =============================================================================

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::info;
use url::Url;

/// Upstream list used when no --source is given
pub const DEFAULT_SOURCE: &str =
    "https://raw.githubusercontent.com/q1017673817/iptvz/refs/heads/main/zubo_all.txt";

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

// Loads the source text from a URL or a file
//
// Returns: trimmed, non-empty lines in source order
pub async fn fetch_source(location: &str) -> Result<Vec<String>> {
    let text = match remote_url(location) {
        Some(url) => download(url).await?,
        None => tokio::fs::read_to_string(location)
            .await
            .with_context(|| format!("failed to read source file {}", location))?,
    };

    let lines = clean_lines(&text);
    info!(source = location, lines = lines.len(), "source list loaded");
    Ok(lines)
}

// Splits text into trimmed lines and drops the blank ones
pub fn clean_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

// Returns the parsed URL only for http and https locations
//
// "C:\lists\a.txt" parses as a URL with scheme "c", which is why we check
// the scheme instead of trusting Url::parse alone.
fn remote_url(location: &str) -> Option<Url> {
    Url::parse(location)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}

async fn download(url: Url) -> Result<String> {
    let client = Client::builder().timeout(DOWNLOAD_TIMEOUT).build()?;

    let response = client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("failed to download {}", url))?;

    if !response.status().is_success() {
        return Err(anyhow!("Failed to fetch {}: HTTP {}", url, response.status()));
    }

    // reqwest falls back to UTF-8 when the server sends no charset
    let text = response.text().await?;
    Ok(text)
}
