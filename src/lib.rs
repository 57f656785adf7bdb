//! # Cache Latency Probe - Core Library Crate
//!
//! A sequential latency harness for an HTTP service that exposes an
//! idempotent read (`GET /info/<id>`) and a stateful write
//! (`POST /purchase/<id>`) which should invalidate the service's cache entry
//! for the purchased item.
//!
//! The harness measures average latency per operation and the latency
//! signature of cache hits versus misses around a purchase. It never issues
//! two requests at once: every request is awaited before the next one starts.
//!
//! ## Layout
//! - `core`: error type, configuration, data model
//! - `client`: timed request executor and the service routes
//! - `sampling`: paced read/purchase sampling and statistics
//! - `experiment`: the four-step cache probe and the run orchestrator
//! - `observability`: logging setup

/// Error types, configuration and the transient data model
pub mod core;

/// One timed HTTP request at a time
pub mod client;

/// Repeated, paced requests and the statistics derived from them
pub mod sampling;

/// Cache-behavior probe and full-run orchestration
pub mod experiment;

/// Logging: the harness's only output channel
pub mod observability;

/// Main error type used throughout the probe
pub use crate::core::error::{ProbeError, ProbeResult};

/// Configuration for a run
pub use crate::core::config::{ConfigSource, ProbeConfig};

pub use crate::core::types::{Measurement, Operation, Outcome, Payload, Target};

pub use crate::client::{RequestExecutor, ServiceClient, TimedExecutor};
pub use crate::experiment::{CacheProbe, Experiment, ExperimentReport, ProbeTrace};
pub use crate::sampling::{Aggregator, Pacing, SampleSet, WriteSampleSet};
