//! # Cache Latency Probe - Main Entry Point
//!
//! Loads the configuration (`PROBE_CONFIG_PATH`, default
//! `config/probe.yaml`, built-in defaults when the file is absent), installs
//! logging, and runs one experiment against the configured service.
//!
//! The run is best-effort: individual request failures are logged and the
//! process still exits 0 once the last phase is done. Only an invalid
//! configuration or an HTTP client that cannot be built stops start-up.

use tracing::{error, info};

use cache_latency_probe::core::config::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use cache_latency_probe::observability::init_logging;
use cache_latency_probe::{Experiment, ProbeConfig, ProbeResult};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        // Logging may not be up yet if the configuration itself was bad.
        eprintln!("cache-latency-probe: {}", e);
        error!("Probe aborted: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> ProbeResult<()> {
    let config_path =
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let (config, source) = ProbeConfig::load_or_default(&config_path).await?;
    init_logging(&config.logging)?;
    source.log();

    info!("Cache latency probe v{}", env!("CARGO_PKG_VERSION"));

    let mut experiment = Experiment::from_config(config)?;
    let report = experiment.run().await;

    info!(
        "Run {} complete: {} read samples, {}/{} purchases accepted, cache probe {}",
        report.run_id,
        report.reads.main.len(),
        report.writes.result.semantic_successes,
        report.writes.result.attempts,
        if report.probe.trace().is_some() { "ran" } else { "skipped" }
    );

    Ok(())
}
