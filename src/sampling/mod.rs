// Sequential read/purchase sampling with pacing
pub mod aggregator;

// Latency statistics and outcome tallies
pub mod stats;

pub use aggregator::{Aggregator, Pacing, WriteSampleSet};
pub use stats::{LatencySummary, OutcomeTally, SampleSet};
