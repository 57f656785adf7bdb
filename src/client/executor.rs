//! # Timed Request Executor
//!
//! Issues exactly one HTTP request and reports how long it took.
//!
//! The clock starts right before the request is dispatched and stops once
//! the full body has arrived, so body transfer counts towards latency. The
//! whole exchange runs under the operation's time budget (reads and writes
//! have separate budgets). Every failure becomes an [`Outcome`] value and
//! one log line; nothing here returns an error or panics.

use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method, StatusCode};
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::core::config::ProbeConfig;
use crate::core::error::ProbeResult;
use crate::core::types::{duration_ms, Measurement, Operation, Outcome, Payload};

/// Number of characters of an error body kept for diagnostics.
pub const ERROR_BODY_PREFIX_CHARS: usize = 100;

/// Anything that can perform one timed request.
///
/// The aggregator and the cache probe only talk to this trait, which keeps
/// them independent of the HTTP stack.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    /// Perform one request. `payload` is only sent for writes.
    async fn execute(&self, method: &Method, url: &str, payload: Option<&Value>) -> Measurement;
}

/// reqwest-backed executor. One client is reused for every call.
#[derive(Debug, Clone)]
pub struct TimedExecutor {
    client: HttpClient,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl TimedExecutor {
    /// Create an executor with explicit read and write budgets
    pub fn new(read_timeout: Duration, write_timeout: Duration) -> ProbeResult<Self> {
        let client = HttpClient::builder().build()?;

        Ok(Self {
            client,
            read_timeout,
            write_timeout,
        })
    }

    pub fn from_config(config: &ProbeConfig) -> ProbeResult<Self> {
        Self::new(config.read_timeout, config.write_timeout)
    }

    /// Time budget for an operation
    pub fn timeout_for(&self, operation: Operation) -> Duration {
        match operation {
            Operation::Read => self.read_timeout,
            Operation::Write => self.write_timeout,
        }
    }

    async fn send(
        &self,
        operation: Operation,
        url: &str,
        payload: Option<&Value>,
    ) -> Result<(StatusCode, Vec<u8>), reqwest::Error> {
        let mut request = self.client.request(operation.method(), url);
        if let (Operation::Write, Some(body)) = (operation, payload) {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        Ok((status, body.to_vec()))
    }
}

#[async_trait]
impl RequestExecutor for TimedExecutor {
    async fn execute(&self, method: &Method, url: &str, payload: Option<&Value>) -> Measurement {
        let operation = match Operation::from_method(method) {
            Ok(operation) => operation,
            Err(e) => {
                error!("{} for {}", e, url);
                return Measurement {
                    operation: None,
                    method: method.to_string(),
                    url: url.to_string(),
                    status: None,
                    elapsed: Duration::ZERO,
                    outcome: Outcome::Unsupported {
                        method: method.to_string(),
                    },
                };
            }
        };

        let budget = self.timeout_for(operation);

        let start_time = Instant::now();
        let result = timeout(budget, self.send(operation, url, payload)).await;
        let elapsed = start_time.elapsed();

        let (status, outcome) = match result {
            Ok(Ok((status, body))) => (Some(status.as_u16()), classify_response(status, &body)),
            Ok(Err(e)) if e.is_timeout() => (None, Outcome::Timeout { budget }),
            Ok(Err(e)) => (
                e.status().map(|s| s.as_u16()),
                Outcome::NetworkError {
                    message: describe_transport_error(&e),
                },
            ),
            Err(_) => (None, Outcome::Timeout { budget }),
        };

        let measurement = Measurement {
            operation: Some(operation),
            method: method.to_string(),
            url: url.to_string(),
            status,
            elapsed,
            outcome,
        };
        log_measurement(&measurement);
        measurement
    }
}

/// Turn a complete response into an outcome.
///
/// 2xx bodies must decode as JSON; 4xx/5xx bodies are kept as a bounded
/// text prefix and, when they happen to be JSON, as a payload too. Any other
/// status (1xx, 3xx) counts as a network error.
pub fn classify_response(status: StatusCode, body: &[u8]) -> Outcome {
    if status.is_success() {
        return match serde_json::from_slice::<Value>(body) {
            Ok(value) => Outcome::Success(Payload::new(value)),
            Err(e) => Outcome::NetworkError {
                message: format!("Malformed response body: {}", e),
            },
        };
    }

    if !status.is_client_error() && !status.is_server_error() {
        return Outcome::NetworkError {
            message: format!("Unexpected status {}", status),
        };
    }

    let text = String::from_utf8_lossy(body);
    Outcome::HttpError {
        status: status.as_u16(),
        body_prefix: truncate_chars(&text, ERROR_BODY_PREFIX_CHARS),
        payload: serde_json::from_slice::<Value>(body).ok().map(Payload::new),
    }
}

/// First `max` characters of `text`, on a character boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    let class = if e.is_connect() {
        "Connection refused or host unreachable"
    } else if e.is_request() {
        "Request could not be sent"
    } else if e.is_body() || e.is_decode() {
        "Malformed response"
    } else if e.is_redirect() {
        "Redirect loop"
    } else {
        "Unknown network error"
    };
    format!("{}: {}", class, e)
}

fn log_measurement(m: &Measurement) {
    let elapsed_ms = duration_ms(m.elapsed);
    match &m.outcome {
        Outcome::Success(_) => {
            info!(
                "{} {} - Status: {}, Time: {:.2} ms",
                m.method,
                m.url,
                m.status.unwrap_or_default(),
                elapsed_ms
            );
        }
        Outcome::HttpError {
            status,
            body_prefix,
            ..
        } => {
            warn!(
                "{} {} - Status: {}, Time: {:.2} ms - HTTP error, response: {}",
                m.method, m.url, status, elapsed_ms, body_prefix
            );
        }
        Outcome::Timeout { budget } => {
            warn!(
                "Request TIMEOUT: {} {} after {:.2} ms (budget {:?})",
                m.method, m.url, elapsed_ms, budget
            );
        }
        Outcome::NetworkError { message } => {
            error!("Request failed: {} for {} {}", message, m.method, m.url);
        }
        // Logged before the early return in `execute`.
        Outcome::Unsupported { .. } => {}
    }
}
