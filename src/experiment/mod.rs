// Four-step miss/hit/purchase/miss probe
pub mod cache_probe;

// Phase sequencing for a full run
pub mod orchestrator;

pub use cache_probe::{CacheProbe, LatencyReduction, ProbeStep, ProbeTrace};
pub use orchestrator::{
    Experiment, ExperimentReport, ProbePhaseReport, ReadPhaseReport, StockCheck, WritePhaseReport,
};
