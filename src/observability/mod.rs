// Logging configuration
pub mod config;

// Structured logging
pub mod logging;

pub use config::{LogConfig, LogFormat};
pub use logging::{init_logging, RunId};
