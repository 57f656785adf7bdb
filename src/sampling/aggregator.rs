//! # Sampling Aggregator
//!
//! Repeats timed requests sequentially, paces them, and collects the
//! latencies of the ones that succeeded.
//!
//! Reads are spread over a target population chosen uniformly at random
//! (with replacement) from an injected [`Rng`], so a seeded generator
//! replays the exact same target sequence. Writes always hit one target and
//! additionally track how many purchases the service actually accepted.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::client::{RequestExecutor, ServiceClient};
use crate::core::config::ProbeConfig;
use crate::core::types::Target;
use crate::sampling::stats::SampleSet;

/// Pauses inserted after each request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub priming_delay: Duration,
    pub sample_delay: Duration,
    pub purchase_delay: Duration,
}

impl Pacing {
    pub fn from_config(config: &ProbeConfig) -> Self {
        Self {
            priming_delay: config.priming_delay,
            sample_delay: config.sample_delay,
            purchase_delay: config.purchase_delay,
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::from_config(&ProbeConfig::default())
    }
}

/// Outcome of a purchase series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteSampleSet {
    /// Latencies of purchases that completed at the transport level
    pub samples: SampleSet,
    pub attempts: usize,
    /// Purchases whose message reported success
    pub semantic_successes: usize,
}

impl WriteSampleSet {
    pub fn transport_successes(&self) -> usize {
        self.samples.len()
    }
}

/// Drives sequential sampling runs against one service.
pub struct Aggregator<'a, E> {
    client: &'a ServiceClient<E>,
    pacing: Pacing,
}

impl<'a, E: RequestExecutor> Aggregator<'a, E> {
    pub fn new(client: &'a ServiceClient<E>, pacing: Pacing) -> Self {
        Self { client, pacing }
    }

    /// Sample read latency over `targets`.
    ///
    /// `priming_count` reads go to the first target beforehand and are
    /// discarded. The returned set holds at most `sample_count` latencies.
    pub async fn measure_reads<R: Rng + ?Sized>(
        &self,
        targets: &[Target],
        sample_count: usize,
        priming_count: usize,
        rng: &mut R,
    ) -> SampleSet {
        let mut samples = SampleSet::new();

        info!(
            "--- Measuring average response time for GET /info (Total {} actual measurement requests) ---",
            sample_count
        );

        let Some(&first) = targets.first() else {
            error!("No read targets given, nothing to measure");
            return samples;
        };

        if priming_count > 0 {
            info!(
                "Priming cache with {} requests to item {}...",
                priming_count, first
            );
            for _ in 0..priming_count {
                self.client.info(first).await;
                sleep(self.pacing.priming_delay).await;
            }
        }

        for i in 0..sample_count {
            let target = *targets.choose(rng).unwrap_or(&first);

            info!("INFO Request {}/{} for item {}...", i + 1, sample_count, target);
            let measurement = self.client.info(target).await;
            samples.record(&measurement);

            sleep(self.pacing.sample_delay).await;
        }

        report_reads(&samples);
        samples
    }

    /// Purchase `target` `attempt_count` times and time each attempt.
    pub async fn measure_writes(&self, target: Target, attempt_count: usize) -> WriteSampleSet {
        let mut result = WriteSampleSet {
            attempts: attempt_count,
            ..WriteSampleSet::default()
        };

        info!(
            "--- Measuring average response time for POST /purchase (Total {} requests) ---",
            attempt_count
        );

        for i in 0..attempt_count {
            info!("PURCHASE Request {}/{} for item {}...", i + 1, attempt_count, target);
            let measurement = self.client.purchase(target).await;
            result.samples.record(&measurement);

            match measurement.success_payload() {
                Some(payload) if payload.is_purchase_success() => result.semantic_successes += 1,
                Some(payload) => warn!(
                    "Purchase request {} for item {} was not accepted: {}",
                    i + 1,
                    target,
                    payload.display("message")
                ),
                None => warn!(
                    "Purchase request {} for item {} failed to get a response time.",
                    i + 1,
                    target
                ),
            }

            sleep(self.pacing.purchase_delay).await;
        }

        report_writes(&result);
        result
    }
}

fn report_reads(samples: &SampleSet) {
    match samples.summary() {
        Some(summary) => {
            info!(
                "GET /info - Average Response Time: {:.2} ms from {} successful requests.",
                summary.mean, summary.count
            );
            info!(
                "GET /info - min {:.2} ms, median {:.2} ms, p95 {:.2} ms, max {:.2} ms ({} failed)",
                summary.min,
                summary.median,
                summary.p95,
                summary.max,
                samples.tally().failures()
            );
        }
        None => warn!("GET /info - No successful requests to calculate average."),
    }
}

fn report_writes(result: &WriteSampleSet) {
    match result.samples.mean() {
        Some(mean) => info!(
            "POST /purchase - Average Response Time: {:.2} ms from {} responses ({} of {} purchases successful).",
            mean,
            result.transport_successes(),
            result.semantic_successes,
            result.attempts
        ),
        None => warn!("POST /purchase - No successful requests to calculate average."),
    }
}
