//! # Cache-Behavior Probe
//!
//! Four requests against one item, strictly in order:
//!
//! 1. read (expected cache miss)
//! 2. read again (expected cache hit)
//! 3. purchase (expected to invalidate the cached entry)
//! 4. read after a settle delay (expected miss, with the new stock)
//!
//! A step that gets no latency aborts the probe; later steps are never
//! sent. The hit/miss speed-up is reported, not asserted: a slower "hit"
//! is a finding, not a failure.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::client::{RequestExecutor, ServiceClient};
use crate::core::types::{display_field, display_stock, Measurement, Target, NEW_STOCK_FIELD};

/// The four probe steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStep {
    InitialMiss,
    Hit,
    Purchase,
    PostInvalidationMiss,
}

impl ProbeStep {
    pub const ALL: [ProbeStep; 4] = [
        ProbeStep::InitialMiss,
        ProbeStep::Hit,
        ProbeStep::Purchase,
        ProbeStep::PostInvalidationMiss,
    ];

    /// 1-based position in the probe
    pub fn number(&self) -> usize {
        match self {
            Self::InitialMiss => 1,
            Self::Hit => 2,
            Self::Purchase => 3,
            Self::PostInvalidationMiss => 4,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::InitialMiss => "Initial Miss",
            Self::Hit => "Cache Hit",
            Self::Purchase => "Purchase",
            Self::PostInvalidationMiss => "Post-Invalidation Miss",
        }
    }
}

impl fmt::Display for ProbeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} ({})", self.number(), self.label())
    }
}

/// Latency gained by the cache hit over the initial miss
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencyReduction {
    pub miss_ms: f64,
    pub hit_ms: f64,
    /// `miss_ms - hit_ms`; negative when the hit was slower
    pub absolute_ms: f64,
    /// `absolute_ms / miss_ms * 100`, or 0 when `miss_ms` is 0
    pub percent: f64,
}

impl LatencyReduction {
    pub fn between(miss_ms: f64, hit_ms: f64) -> Self {
        let absolute_ms = miss_ms - hit_ms;
        let percent = if miss_ms > 0.0 {
            absolute_ms / miss_ms * 100.0
        } else {
            0.0
        };
        Self {
            miss_ms,
            hit_ms,
            absolute_ms,
            percent,
        }
    }
}

/// Everything one probe observed.
///
/// A step's measurement is present once the step ran, even if it failed;
/// steps after a failed one are absent.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeTrace {
    pub target: Target,
    pub initial_miss: Option<Measurement>,
    pub hit: Option<Measurement>,
    pub purchase: Option<Measurement>,
    pub post_miss: Option<Measurement>,
    /// Step that aborted the probe
    pub failed_step: Option<ProbeStep>,
    /// The purchase was refused because the item ran out
    pub out_of_stock: bool,
}

impl ProbeTrace {
    fn new(target: Target) -> Self {
        Self {
            target,
            initial_miss: None,
            hit: None,
            purchase: None,
            post_miss: None,
            failed_step: None,
            out_of_stock: false,
        }
    }

    pub fn step(&self, step: ProbeStep) -> Option<&Measurement> {
        match step {
            ProbeStep::InitialMiss => self.initial_miss.as_ref(),
            ProbeStep::Hit => self.hit.as_ref(),
            ProbeStep::Purchase => self.purchase.as_ref(),
            ProbeStep::PostInvalidationMiss => self.post_miss.as_ref(),
        }
    }

    fn slot(&mut self, step: ProbeStep) -> &mut Option<Measurement> {
        match step {
            ProbeStep::InitialMiss => &mut self.initial_miss,
            ProbeStep::Hit => &mut self.hit,
            ProbeStep::Purchase => &mut self.purchase,
            ProbeStep::PostInvalidationMiss => &mut self.post_miss,
        }
    }

    /// Latency of each step in step order
    pub fn latencies(&self) -> [Option<f64>; 4] {
        ProbeStep::ALL.map(|step| self.step(step).and_then(Measurement::latency_ms))
    }

    pub fn is_complete(&self) -> bool {
        self.failed_step.is_none() && self.latencies().iter().all(Option::is_some)
    }

    /// Miss-vs-hit reduction from steps 1 and 2
    pub fn hit_reduction(&self) -> Option<LatencyReduction> {
        let [miss, hit, _, _] = self.latencies();
        Some(LatencyReduction::between(miss?, hit?))
    }

    /// Stock reported by step 1 and step 4
    pub fn stock_before_after(&self) -> (Option<i64>, Option<i64>) {
        let stock = |step| {
            self.step(step)
                .and_then(Measurement::success_payload)
                .and_then(|payload| payload.stock())
        };
        (
            stock(ProbeStep::InitialMiss),
            stock(ProbeStep::PostInvalidationMiss),
        )
    }

    /// Whether the final read saw a different stock than the first one
    pub fn stock_changed(&self) -> Option<bool> {
        match self.stock_before_after() {
            (Some(before), Some(after)) => Some(before != after),
            _ => None,
        }
    }
}

/// Runs the four-step cache probe.
pub struct CacheProbe<'a, E> {
    client: &'a ServiceClient<E>,
    settle_delay: Duration,
}

impl<'a, E: RequestExecutor> CacheProbe<'a, E> {
    pub fn new(client: &'a ServiceClient<E>, settle_delay: Duration) -> Self {
        Self {
            client,
            settle_delay,
        }
    }

    pub async fn probe(&self, target: Target) -> ProbeTrace {
        let mut trace = ProbeTrace::new(target);
        info!("--- Cache Behavior Experiment for item {} ---", target);

        info!("Step 1: Initial GET /info (expect miss, prime cache)");
        if !self.read_step(&mut trace, ProbeStep::InitialMiss).await {
            error!("Failed initial info request for item {}", target);
            return trace;
        }

        info!("Step 2: Second GET /info (expect hit)");
        if !self.read_step(&mut trace, ProbeStep::Hit).await {
            error!("Failed second info request (expected hit) for item {}", target);
            return trace;
        }

        info!("Step 3: POST /purchase (triggers invalidation)");
        let purchase = self.client.purchase(target).await;
        match purchase.latency_ms() {
            Some(latency) => {
                info!(
                    "Result: {:.2} ms, New Stock (from purchase response): {}",
                    latency,
                    display_field(purchase.success_payload(), NEW_STOCK_FIELD)
                );
                if let Some(payload) = purchase.success_payload() {
                    if !payload.is_purchase_success() {
                        warn!(
                            "Purchase for item {} was answered but not accepted: {}",
                            target,
                            payload.display("message")
                        );
                    }
                }
                trace.purchase = Some(purchase);
            }
            None => {
                error!(
                    "Purchase failed for item {}. Cannot reliably test post-invalidation miss.",
                    target
                );
                if purchase.payload().map(|p| p.is_out_of_stock()).unwrap_or(false) {
                    error!("Reason: Item is out of stock.");
                    trace.out_of_stock = true;
                }
                trace.purchase = Some(purchase);
                trace.failed_step = Some(ProbeStep::Purchase);
                return trace;
            }
        }

        sleep(self.settle_delay).await;

        info!("Step 4: GET /info after purchase (expect miss due to invalidation)");
        if !self.read_step(&mut trace, ProbeStep::PostInvalidationMiss).await {
            error!(
                "Failed info request (expected miss) for item {} after purchase",
                target
            );
            return trace;
        }

        report_trace(&trace);
        trace
    }

    /// Run one read step; false when it produced no latency.
    async fn read_step(&self, trace: &mut ProbeTrace, step: ProbeStep) -> bool {
        let measurement = self.client.info(trace.target).await;
        let succeeded = match measurement.latency_ms() {
            Some(latency) => {
                info!(
                    "Result: {:.2} ms, Stock: {}",
                    latency,
                    display_stock(measurement.success_payload())
                );
                true
            }
            None => {
                trace.failed_step = Some(step);
                false
            }
        };
        *trace.slot(step) = Some(measurement);
        succeeded
    }
}

fn report_trace(trace: &ProbeTrace) {
    info!("Cache Behavior Experiment Summary:");
    for (step, latency) in ProbeStep::ALL.iter().zip(trace.latencies()) {
        if let Some(latency) = latency {
            info!("  Latency - {}: {:.2} ms", step.label(), latency);
        }
    }

    if let Some(reduction) = trace.hit_reduction() {
        info!(
            "Caching reduced latency by approx: {:.2} ms ({:.1}%)",
            reduction.absolute_ms, reduction.percent
        );
    }

    match trace.stock_before_after() {
        (Some(before), Some(after)) if before != after => {
            info!("Stock went from {} to {}: invalidation observed", before, after)
        }
        (Some(before), Some(_)) => warn!(
            "Stock still {} after purchase: cached entry may not have been invalidated",
            before
        ),
        _ => warn!("Stock not reported by the service, invalidation not verifiable"),
    }
}
