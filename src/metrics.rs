//! Metric names and progress telemetry.
//!
//! The engine publishes through the `metrics` facade; wiring a recorder
//! (Prometheus exporter or otherwise) is the embedding application's job.

use std::time::Instant;

use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};

/// Counter, by `network` and `event_source`: blocks committed to the store.
pub const COMPLETED_BLOCKS: &str = "historical_completed_blocks";
/// Gauge, by `network` and `event_source`: blocks in the target range.
pub const TOTAL_BLOCKS: &str = "historical_total_blocks";
/// Gauge, by `network` and `event_source`: blocks already cached at setup.
pub const CACHED_BLOCKS: &str = "historical_cached_blocks";
/// Histogram, by `method` and `network`: RPC request duration in seconds.
pub const RPC_REQUEST_DURATION_SECONDS: &str = "historical_rpc_request_duration_seconds";
/// Gauge, by `network`: fraction of the target range that is cached.
pub const COMPLETION_RATE: &str = "historical_completion_rate";
/// Gauge, by `network`: estimated seconds until the sync completes.
pub const COMPLETION_ETA_SECONDS: &str = "historical_completion_eta_seconds";

/// Registers metric descriptions with the installed recorder.
pub fn describe() {
    describe_counter!(COMPLETED_BLOCKS, "Blocks committed to the event store");
    describe_gauge!(TOTAL_BLOCKS, "Blocks in the historical target range");
    describe_gauge!(CACHED_BLOCKS, "Blocks already cached at setup");
    describe_histogram!(RPC_REQUEST_DURATION_SECONDS, "RPC request duration in seconds");
    describe_gauge!(COMPLETION_RATE, "Fraction of the historical target range cached");
    describe_gauge!(COMPLETION_ETA_SECONDS, "Estimated seconds until historical sync completes");
}

/// Tracks overall completion and refreshes the rate/ETA gauges on commit.
#[derive(Debug)]
pub(crate) struct ProgressMeter {
    network: String,
    started: Instant,
    total_blocks: u64,
    cached_blocks: u64,
    completed_blocks: u64,
}

impl ProgressMeter {
    pub(crate) fn new(network: impl Into<String>, total_blocks: u64, cached_blocks: u64) -> Self {
        Self {
            network: network.into(),
            started: Instant::now(),
            total_blocks,
            cached_blocks,
            completed_blocks: 0,
        }
    }

    /// Records `width` newly committed blocks and refreshes the gauges.
    pub(crate) fn on_commit(&mut self, width: u64) {
        self.completed_blocks += width;

        gauge!(COMPLETION_RATE, "network" => self.network.clone()).set(self.completion_rate());
        if let Some(eta) = self.eta_seconds(self.started.elapsed().as_secs_f64()) {
            gauge!(COMPLETION_ETA_SECONDS, "network" => self.network.clone()).set(eta);
        }
    }

    pub(crate) fn completion_rate(&self) -> f64 {
        completion_rate(self.total_blocks, self.cached_blocks + self.completed_blocks)
    }

    fn eta_seconds(&self, elapsed: f64) -> Option<f64> {
        eta_seconds(self.remaining_blocks(), self.completed_blocks, elapsed)
    }

    fn remaining_blocks(&self) -> u64 {
        self.total_blocks.saturating_sub(self.cached_blocks + self.completed_blocks)
    }
}

fn completion_rate(total: u64, done: u64) -> f64 {
    if total == 0 {
        return 1.0;
    }
    (done.min(total) as f64) / (total as f64)
}

fn eta_seconds(remaining: u64, completed_this_run: u64, elapsed: f64) -> Option<f64> {
    if completed_this_run == 0 || elapsed <= 0.0 {
        return None;
    }
    let rate = completed_this_run as f64 / elapsed;
    Some(remaining as f64 / rate)
}
