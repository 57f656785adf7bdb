//! # Experiment Orchestrator Integration Tests
//!
//! Full runs against the fake frontend: phase sequencing, pre-flight stock
//! checks, and independence of phases when the service misbehaves.

mod common;

use cache_latency_probe::experiment::{ProbePhaseReport, StockCheck};
use cache_latency_probe::Experiment;
use common::{client_for, fast_config, received_paths, FakeFrontend};
use rand::rngs::StdRng;
use rand::SeedableRng;
use wiremock::MockServer;

fn all_items(stock: i64) -> Vec<(u64, i64)> {
    (1..=7).map(|id| (id, stock)).collect()
}

/// A healthy service gets every phase, in order
#[tokio::test]
async fn test_full_run_against_healthy_service() {
    let server = MockServer::start().await;
    let frontend = FakeFrontend::with_stock(&all_items(10));
    frontend.mount(&server).await;

    let config = fast_config(&server.uri());
    let mut experiment = Experiment::new(config.clone(), client_for(&config), StdRng::seed_from_u64(9));
    let report = experiment.run().await;

    assert_eq!(report.reads.priming_count, 3);
    assert_eq!(report.reads.warmup.len(), 2);
    assert_eq!(report.reads.main.len(), 6);

    assert_eq!(report.writes.stock_check, StockCheck::Reported(10));
    assert!(!report.writes.insufficient_stock);
    assert_eq!(report.writes.result.semantic_successes, 3);
    assert_eq!(frontend.stock(7), Some(7));

    let trace = report.probe.trace().expect("probe should run");
    assert!(trace.is_complete());
    assert_eq!(trace.stock_changed(), Some(true));

    // priming + warm-up + main, stock check + purchases, stock check + 4 probe steps
    let expected = 3 + 2 + 6 + 1 + 3 + 1 + 4;
    assert_eq!(received_paths(&server).await.len(), expected);
}

/// Low stock on the write target only produces a warning
#[tokio::test]
async fn test_insufficient_stock_still_runs_purchases() {
    let server = MockServer::start().await;
    let mut items = all_items(10);
    items[6] = (7, 1);
    FakeFrontend::with_stock(&items).mount(&server).await;

    let config = fast_config(&server.uri());
    let mut experiment = Experiment::new(config.clone(), client_for(&config), StdRng::seed_from_u64(9));
    let report = experiment.run().await;

    assert_eq!(report.writes.stock_check, StockCheck::Reported(1));
    assert!(report.writes.insufficient_stock);
    assert_eq!(report.writes.result.attempts, 3);
    assert_eq!(report.writes.result.semantic_successes, 1);
    assert!(report.probe.trace().is_some());
}

/// An empty probe item skips the probe but not the other phases
#[tokio::test]
async fn test_probe_skipped_when_out_of_stock() {
    let server = MockServer::start().await;
    let mut items = all_items(10);
    items[5] = (6, 0);
    FakeFrontend::with_stock(&items).mount(&server).await;

    let config = fast_config(&server.uri());
    let mut experiment = Experiment::new(config.clone(), client_for(&config), StdRng::seed_from_u64(9));
    let report = experiment.run().await;

    assert_eq!(report.reads.main.len(), 6);
    assert_eq!(report.writes.result.semantic_successes, 3);
    match report.probe {
        ProbePhaseReport::Skipped {
            target,
            stock_check,
        } => {
            assert_eq!(target.id(), 6);
            assert_eq!(stock_check, StockCheck::Reported(0));
        }
        other => panic!("probe should have been skipped: {:?}", other),
    }

    let purchases_of_probe_item = received_paths(&server)
        .await
        .iter()
        .filter(|p| p.as_str() == "POST /purchase/6")
        .count();
    assert_eq!(purchases_of_probe_item, 0);
}

/// An unreachable service fails every request, yet the run completes
#[tokio::test]
async fn test_unreachable_service_completes_run() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = fast_config(&format!("http://127.0.0.1:{}", port));
    let mut experiment = Experiment::new(config.clone(), client_for(&config), StdRng::seed_from_u64(9));

    let report = experiment.run().await;

    assert!(report.reads.warmup.is_empty());
    assert!(report.reads.main.is_empty());
    assert_eq!(report.reads.main.tally().network_error, 6);
    assert_eq!(report.writes.stock_check, StockCheck::Failed);
    assert!(!report.writes.insufficient_stock);
    assert_eq!(report.writes.result.attempts, 3);
    assert_eq!(report.writes.result.transport_successes(), 0);
    assert!(matches!(
        report.probe,
        ProbePhaseReport::Skipped {
            stock_check: StockCheck::Failed,
            ..
        }
    ));
}

/// Unknown items fail their reads without stopping the run
#[tokio::test]
async fn test_unknown_items_do_not_stop_the_run() {
    let server = MockServer::start().await;
    FakeFrontend::with_stock(&[(6, 2)]).mount(&server).await;

    let config = fast_config(&server.uri());
    let mut experiment = Experiment::new(config.clone(), client_for(&config), StdRng::seed_from_u64(9));
    let report = experiment.run().await;

    assert_eq!(report.reads.main.tally().total(), 6);
    assert_eq!(report.writes.stock_check, StockCheck::Failed);
    assert_eq!(report.writes.result.samples.tally().http_error, 3);
    assert!(report.probe.trace().map(|t| t.is_complete()).unwrap_or(false));
}
