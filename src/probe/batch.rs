// src/probe/batch.rs
// =============================================================================
// This module probes a whole category at once.
//
// How it works:
// 1. Every entry gets its own tokio task
// 2. Each task waits for a permit from the shared semaphore, so at most
//    `concurrency` probes touch the network at the same time
// 3. The probe runs under a hard deadline (tokio::time::timeout)
// 4. Bytes read / elapsed time gives throughput in KB/s
// 5. We wait for every task before returning; nothing is ranked early
//
// Failure isolation:
// - A failed or timed-out probe only affects its own entry
// - A panicking probe shows up as a JoinError and becomes "unreachable"
// - The semaphore is the only thing tasks share
//
// The semaphore lives as long as the Prober, so every category batch in a
// run draws from the same pool of permits.
// =============================================================================

use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::{timeout, Instant};
use tracing::debug;

use super::http::{ProbeError, StreamProbe};
use crate::config::PipelineConfig;
use crate::playlist::Entry;

// Knobs for a single probe
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeSettings {
    pub timeout: Duration,
    pub read_bytes: usize,
    pub min_kbps: f64,
}

impl ProbeSettings {
    pub fn from_config(config: &PipelineConfig) -> Self {
        ProbeSettings {
            timeout: config.timeout(),
            read_bytes: config.read_bytes,
            min_kbps: config.min_kbps,
        }
    }
}

// Raw measurement of one successful read
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub bytes: usize,
    pub elapsed: Duration,
}

impl Sample {
    // KB per second; zero when no time was measured
    pub fn throughput_kbps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.bytes as f64 / 1024.0 / secs
        } else {
            0.0
        }
    }
}

// The measured quality of one entry
//
// Unreachable entries carry an infinite latency and zero throughput so they
// always sort after reachable ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeResult {
    pub entry: Entry,
    pub reachable: bool,
    pub latency_secs: f64,
    pub throughput_kbps: f64,
    /// Why the entry is unreachable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl ProbeResult {
    // Turns a probe outcome into a result
    //
    // A successful read that is slower than `min_kbps` is treated the same
    // as a failed one.
    pub fn from_outcome(entry: Entry, outcome: Result<Sample, ProbeError>, min_kbps: f64) -> Self {
        match outcome {
            Ok(sample) if sample.throughput_kbps() >= min_kbps => ProbeResult {
                entry,
                reachable: true,
                latency_secs: sample.elapsed.as_secs_f64(),
                throughput_kbps: sample.throughput_kbps(),
                failure: None,
            },
            Ok(sample) => {
                let reason = format!(
                    "below threshold ({:.1} KB/s < {:.1} KB/s)",
                    sample.throughput_kbps(),
                    min_kbps
                );
                Self::unreachable(entry, reason)
            }
            Err(error) => Self::unreachable(entry, error.to_string()),
        }
    }

    fn unreachable(entry: Entry, reason: String) -> Self {
        ProbeResult {
            entry,
            reachable: false,
            latency_secs: f64::INFINITY,
            throughput_kbps: 0.0,
            failure: Some(reason),
        }
    }
}

// Runs batches of probes against a shared concurrency limit
pub struct Prober<P> {
    probe: Arc<P>,
    limiter: Arc<Semaphore>,
    settings: ProbeSettings,
}

impl<P: StreamProbe> Prober<P> {
    pub fn new(probe: P, concurrency: usize, settings: ProbeSettings) -> Self {
        Prober {
            probe: Arc::new(probe),
            limiter: Arc::new(Semaphore::new(concurrency)),
            settings,
        }
    }

    // Probes every entry and returns one result per entry
    //
    // The order of the returned results carries no meaning; ranking is done
    // later by the ranker.
    pub async fn probe_batch(&self, entries: Vec<Entry>) -> Vec<ProbeResult> {
        let tasks = entries.iter().cloned().map(|entry| {
            let probe = Arc::clone(&self.probe);
            let limiter = Arc::clone(&self.limiter);
            let settings = self.settings.clone();

            tokio::spawn(async move {
                let outcome = match limiter.acquire_owned().await {
                    Ok(permit) => {
                        let outcome = measure(probe.as_ref(), &settings, &entry.url).await;
                        drop(permit);
                        outcome
                    }
                    Err(_) => Err(ProbeError::Aborted("limiter closed".to_string())),
                };

                if let Err(error) = &outcome {
                    debug!(name = %entry.name, url = %entry.url, %error, "probe failed");
                }
                ProbeResult::from_outcome(entry, outcome, settings.min_kbps)
            })
        });

        // Wait for the whole batch
        let joined = join_all(tasks).await;

        // A task that panicked still owes us a result for its entry
        joined
            .into_iter()
            .zip(entries)
            .map(|(joined, entry)| match joined {
                Ok(result) => result,
                Err(join_error) => ProbeResult::from_outcome(
                    entry,
                    Err(ProbeError::Aborted(join_error.to_string())),
                    self.settings.min_kbps,
                ),
            })
            .collect()
    }
}

// Times one probe from the moment it is allowed to run
//
// The clock starts after the permit is granted, so time spent queueing
// behind other probes is never charged to this endpoint.
async fn measure<P: StreamProbe>(
    probe: &P,
    settings: &ProbeSettings,
    url: &str,
) -> Result<Sample, ProbeError> {
    let start = Instant::now();

    let bytes = timeout(settings.timeout, probe.read_prefix(url, settings.read_bytes))
        .await
        .map_err(|_| ProbeError::Timeout)??;

    Ok(Sample {
        bytes,
        elapsed: start.elapsed(),
    })
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why a Semaphore instead of buffer_unordered?
//    - buffer_unordered(N) limits one stream of futures
//    - A Semaphore can be shared, so several batches draw from one limit
//    - acquire_owned() gives a permit we can move into a spawned task
//
// 2. Why tokio::spawn for every probe?
//    - Each probe becomes its own task, so a panic only kills that task
//    - join_all waits for all of them and hands back Result<_, JoinError>
//
// 3. What does the double ?? in measure() do?
//    - timeout() wraps the result: Result<Result<usize, ProbeError>, Elapsed>
//    - The first ? handles the deadline, the second one the probe error
//
// 4. Why tokio::time::Instant and not std::time::Instant?
//    - Tests can pause tokio's clock and jump it forward
//    - That makes timing tests fast and exact
// -----------------------------------------------------------------------------
