//! # Sample Statistics
//!
//! Latencies of successful requests plus a tally of every outcome class.
//! Failed requests are counted but never contribute a latency, so the
//! statistics below describe successful round-trips only.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::core::types::{Measurement, OutcomeClass};

/// Number of requests per outcome class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeTally {
    pub success: usize,
    pub timeout: usize,
    pub http_error: usize,
    pub network_error: usize,
    pub unsupported: usize,
}

impl OutcomeTally {
    pub fn record(&mut self, class: OutcomeClass) {
        match class {
            OutcomeClass::Success => self.success += 1,
            OutcomeClass::Timeout => self.timeout += 1,
            OutcomeClass::HttpError => self.http_error += 1,
            OutcomeClass::NetworkError => self.network_error += 1,
            OutcomeClass::Unsupported => self.unsupported += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.success + self.failures()
    }

    pub fn failures(&self) -> usize {
        self.timeout + self.http_error + self.network_error + self.unsupported
    }
}

/// Descriptive statistics of a non-empty sample, all in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub p95: f64,
}

/// Ordered latencies (ms) of the successful requests of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleSet {
    samples: Vec<f64>,
    tally: OutcomeTally,
}

impl SampleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from already-successful latencies
    pub fn from_latencies(samples: Vec<f64>) -> Self {
        let tally = OutcomeTally {
            success: samples.len(),
            ..OutcomeTally::default()
        };
        Self { samples, tally }
    }

    /// Count the measurement; keep its latency only if it succeeded.
    pub fn record(&mut self, measurement: &Measurement) {
        self.tally.record(measurement.outcome.class());
        if let Some(latency) = measurement.latency_ms() {
            self.samples.push(latency);
        }
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn tally(&self) -> &OutcomeTally {
        &self.tally
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Arithmetic mean, `None` for an empty set
    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    pub fn min(&self) -> Option<f64> {
        self.samples.iter().copied().min_by(cmp_f64)
    }

    pub fn max(&self) -> Option<f64> {
        self.samples.iter().copied().max_by(cmp_f64)
    }

    pub fn median(&self) -> Option<f64> {
        let sorted = self.sorted();
        let len = sorted.len();
        if len == 0 {
            return None;
        }
        if len % 2 == 0 {
            Some((sorted[len / 2 - 1] + sorted[len / 2]) / 2.0)
        } else {
            Some(sorted[len / 2])
        }
    }

    /// Nearest-rank percentile, `p` in `0.0..=100.0`
    pub fn percentile(&self, p: f64) -> Option<f64> {
        let sorted = self.sorted();
        if sorted.is_empty() {
            return None;
        }
        let p = p.clamp(0.0, 100.0);
        let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
        Some(sorted[rank.saturating_sub(1).min(sorted.len() - 1)])
    }

    pub fn summary(&self) -> Option<LatencySummary> {
        Some(LatencySummary {
            count: self.len(),
            mean: self.mean()?,
            min: self.min()?,
            max: self.max()?,
            median: self.median()?,
            p95: self.percentile(95.0)?,
        })
    }

    fn sorted(&self) -> Vec<f64> {
        let mut sorted = self.samples.clone();
        sorted.sort_by(cmp_f64);
        sorted
    }
}

fn cmp_f64(a: &f64, b: &f64) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}
