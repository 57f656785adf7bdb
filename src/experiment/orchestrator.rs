//! # Experiment Orchestrator
//!
//! One run = three independent phases, always in this order:
//!
//! 1. read sampling with the cache warmed (priming + warm-up sample, then
//!    the main sample)
//! 2. a purchase series, preceded by an advisory stock check
//! 3. the cache-behavior probe, skipped when its item has no stock
//!
//! Nothing in a phase can stop a later phase from running. The only
//! decisions taken on outcomes are the two pre-flight stock checks.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{error, info, info_span, warn, Instrument};

use crate::client::{RequestExecutor, ServiceClient, TimedExecutor};
use crate::core::config::ProbeConfig;
use crate::core::error::ProbeResult;
use crate::core::types::Target;
use crate::experiment::cache_probe::{CacheProbe, ProbeTrace};
use crate::observability::RunId;
use crate::sampling::{Aggregator, Pacing, SampleSet, WriteSampleSet};

/// Result of an advisory stock read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockCheck {
    /// The service reported this many units
    Reported(i64),
    /// The read succeeded but carried no stock field
    Missing,
    /// The read itself failed
    Failed,
}

impl StockCheck {
    /// Stock used for the pre-flight decision; a missing field counts as 0.
    pub fn effective_stock(&self) -> Option<i64> {
        match self {
            Self::Reported(stock) => Some(*stock),
            Self::Missing => Some(0),
            Self::Failed => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadPhaseReport {
    pub priming_count: usize,
    /// Small sample taken right after priming
    pub warmup: SampleSet,
    /// Larger sample over the whole target population
    pub main: SampleSet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WritePhaseReport {
    pub target: Target,
    pub stock_check: StockCheck,
    /// Stock was known to be below the number of planned purchases
    pub insufficient_stock: bool,
    pub result: WriteSampleSet,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProbePhaseReport {
    Ran {
        stock_check: StockCheck,
        trace: ProbeTrace,
    },
    Skipped {
        target: Target,
        stock_check: StockCheck,
    },
}

impl ProbePhaseReport {
    pub fn trace(&self) -> Option<&ProbeTrace> {
        match self {
            Self::Ran { trace, .. } => Some(trace),
            Self::Skipped { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentReport {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub base_url: String,
    pub reads: ReadPhaseReport,
    pub writes: WritePhaseReport,
    pub probe: ProbePhaseReport,
}

/// Sequences the sampling phases and the cache probe for one configuration.
pub struct Experiment<E, R> {
    config: ProbeConfig,
    client: ServiceClient<E>,
    rng: R,
}

impl Experiment<TimedExecutor, StdRng> {
    /// Production wiring: reqwest executor, seeded or entropy-backed RNG
    pub fn from_config(config: ProbeConfig) -> ProbeResult<Self> {
        config.validate()?;
        let client = ServiceClient::from_config(&config)?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self::new(config, client, rng))
    }
}

impl<E: RequestExecutor, R: Rng> Experiment<E, R> {
    pub fn new(config: ProbeConfig, client: ServiceClient<E>, rng: R) -> Self {
        Self {
            config,
            client,
            rng,
        }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    pub fn client(&self) -> &ServiceClient<E> {
        &self.client
    }

    /// Run all three phases and return what each observed.
    pub async fn run(&mut self) -> ExperimentReport {
        let run_id = RunId::new();
        let started_at = Utc::now();
        let span = info_span!("run", run_id = %run_id);

        async move {
            info!("===== Starting Performance Tests =====");
            info!(
                "Targeting Frontend at: {} (run started {})",
                self.client.base_url(),
                started_at.format("%Y/%m/%d %H:%M:%S")
            );

            let reads = self
                .run_read_phase()
                .instrument(info_span!("phase", phase = "reads"))
                .await;
            let writes = self
                .run_write_phase()
                .instrument(info_span!("phase", phase = "writes"))
                .await;
            let probe = self
                .run_probe_phase()
                .instrument(info_span!("phase", phase = "cache_probe"))
                .await;

            info!("===== Performance Tests Finished =====");

            ExperimentReport {
                run_id,
                started_at,
                base_url: self.client.base_url().to_string(),
                reads,
                writes,
                probe,
            }
        }
        .instrument(span)
        .await
    }

    /// Phase 1: priming, warm-up sample, then the main sample.
    pub async fn run_read_phase(&mut self) -> ReadPhaseReport {
        info!("======== Testing INFO requests with Cache ENABLED in Frontend ========");

        let aggregator = Aggregator::new(&self.client, Pacing::from_config(&self.config));
        let priming_count = self.config.priming_count();

        let warmup = aggregator
            .measure_reads(
                &self.config.read_targets,
                self.config.warmup_sample_count,
                priming_count,
                &mut self.rng,
            )
            .await;

        info!("--- Subsequent INFO requests (should be mostly cache hits) ---");
        let main = aggregator
            .measure_reads(
                &self.config.read_targets,
                self.config.read_sample_count,
                0,
                &mut self.rng,
            )
            .await;

        ReadPhaseReport {
            priming_count,
            warmup,
            main,
        }
    }

    /// Phase 2: advisory stock check, then the purchase series.
    pub async fn run_write_phase(&self) -> WritePhaseReport {
        info!("======== Testing PURCHASE requests ========");

        let target = self.config.write_target;
        let attempts = self.config.write_attempt_count;

        info!("Checking stock for purchase test item {}...", target);
        let stock_check = self.check_stock(target).await;
        let insufficient_stock = match stock_check.effective_stock() {
            Some(stock) if stock < attempts as i64 => {
                warn!(
                    "WARNING: Item {} has insufficient stock ({}) for {} purchases.",
                    target, stock, attempts
                );
                warn!("Consider resetting DB or choosing an item with more stock.");
                true
            }
            Some(_) => false,
            None => {
                error!("Could not check initial stock for item {}", target);
                false
            }
        };

        let aggregator = Aggregator::new(&self.client, Pacing::from_config(&self.config));
        let result = aggregator.measure_writes(target, attempts).await;

        WritePhaseReport {
            target,
            stock_check,
            insufficient_stock,
            result,
        }
    }

    /// Phase 3: advisory stock check, then the probe if anything is left to buy.
    pub async fn run_probe_phase(&self) -> ProbePhaseReport {
        info!("======== Cache Invalidation Behavior Experiment ========");

        let target = self.config.probe_target;
        info!("Checking stock for cache experiment item {}...", target);
        let stock_check = self.check_stock(target).await;

        match stock_check.effective_stock() {
            Some(stock) if stock >= 1 => {
                let probe = CacheProbe::new(&self.client, self.config.settle_delay);
                let trace = probe.probe(target).await;
                ProbePhaseReport::Ran { stock_check, trace }
            }
            Some(_) => {
                error!(
                    "ERROR: Item {} is out of stock. Cache invalidation experiment cannot run correctly.",
                    target
                );
                ProbePhaseReport::Skipped {
                    target,
                    stock_check,
                }
            }
            None => {
                error!(
                    "Could not check initial stock for cache experiment item {}, skipping experiment",
                    target
                );
                ProbePhaseReport::Skipped {
                    target,
                    stock_check,
                }
            }
        }
    }

    async fn check_stock(&self, target: Target) -> StockCheck {
        let measurement = self.client.info(target).await;
        let Some(payload) = measurement.success_payload() else {
            return StockCheck::Failed;
        };

        info!(
            "Initial stock for item {}: {}",
            target,
            payload.display_stock()
        );
        match payload.stock() {
            Some(stock) => StockCheck::Reported(stock),
            None => StockCheck::Missing,
        }
    }
}
