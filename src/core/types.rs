//! # Core Types
//!
//! Transient data carried between the executor, the aggregator and the
//! cache probe. Nothing here is persisted; every value lives for the
//! duration of one request or one phase.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::core::error::{ProbeError, ProbeResult};

/// Wire key of the stock count in info responses.
pub const STOCK_FIELD: &str = "Stock";
/// Wire key of the result message in purchase responses.
pub const MESSAGE_FIELD: &str = "message";
/// Wire key of the post-purchase stock count.
pub const NEW_STOCK_FIELD: &str = "new_stock";
/// Rendered in place of any field the service left out.
pub const MISSING_FIELD: &str = "N/A";

/// Identifier of an item in the service's catalog.
///
/// Always positive; zero is rejected on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Target(u64);

impl Target {
    /// Create a target, rejecting zero
    pub fn new(id: u64) -> ProbeResult<Self> {
        if id == 0 {
            return Err(ProbeError::invalid_target("0"));
        }
        Ok(Self(id))
    }

    /// Built-in defaults only; `id` must be non-zero.
    pub(crate) const fn new_unchecked(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for Target {
    type Error = ProbeError;

    fn try_from(id: u64) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<Target> for u64 {
    fn from(target: Target) -> Self {
        target.0
    }
}

impl FromStr for Target {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id: u64 = s
            .trim()
            .parse()
            .map_err(|_| ProbeError::invalid_target(s))?;
        Self::new(id)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two operations the service exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// `GET /info/<id>`, idempotent
    Read,
    /// `POST /purchase/<id>`, mutates inventory
    Write,
}

impl Operation {
    /// Map an HTTP method onto an operation. Only GET and POST are supported.
    pub fn from_method(method: &Method) -> ProbeResult<Self> {
        match *method {
            Method::GET => Ok(Self::Read),
            Method::POST => Ok(Self::Write),
            ref other => Err(ProbeError::unsupported_method(other.as_str())),
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Self::Read => Method::GET,
            Self::Write => Method::POST,
        }
    }

}

/// Decoded JSON body of a response.
///
/// The harness only cares about a handful of well-known fields and reads
/// them through the optional accessors below; any other shape is tolerated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Value);

impl Payload {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Look up a top-level field.
    ///
    /// Row-list bodies (a JSON array of objects) are read through their
    /// first element.
    pub fn field(&self, key: &str) -> Option<&Value> {
        let record = match &self.0 {
            Value::Array(rows) => rows.first()?,
            other => other,
        };
        record.as_object()?.get(key)
    }

    fn stock_field(&self) -> Option<&Value> {
        self.field(STOCK_FIELD).or_else(|| self.field("stock"))
    }

    /// Stock count from an info response (`Stock`, falling back to `stock`).
    ///
    /// Fractional values are truncated; use [`display_stock`](Self::display_stock)
    /// to show what the service actually sent.
    pub fn stock(&self) -> Option<i64> {
        self.stock_field().and_then(integer_value)
    }

    /// Result message from a purchase response
    pub fn message(&self) -> Option<&str> {
        self.field(MESSAGE_FIELD).and_then(Value::as_str)
    }

    /// Post-purchase stock count
    pub fn new_stock(&self) -> Option<i64> {
        self.field(NEW_STOCK_FIELD).and_then(integer_value)
    }

    /// Render a field for display, `N/A` when absent
    pub fn display(&self, key: &str) -> String {
        render_value(self.field(key))
    }

    /// Stock exactly as reported, `N/A` when absent
    pub fn display_stock(&self) -> String {
        render_value(self.stock_field())
    }

    /// A purchase counts as successful when its message mentions "successfully".
    pub fn is_purchase_success(&self) -> bool {
        self.message_contains("successfully")
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.message_contains("out of stock")
    }

    fn message_contains(&self, needle: &str) -> bool {
        self.message()
            .map(|message| message.to_lowercase().contains(needle))
            .unwrap_or(false)
    }
}

/// Render an optional payload's field, `N/A` when there is no payload at all.
pub fn display_field(payload: Option<&Payload>, key: &str) -> String {
    payload
        .map(|p| p.display(key))
        .unwrap_or_else(|| MISSING_FIELD.to_string())
}

/// Render an optional payload's stock count.
pub fn display_stock(payload: Option<&Payload>) -> String {
    payload
        .map(Payload::display_stock)
        .unwrap_or_else(|| MISSING_FIELD.to_string())
}

fn render_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => MISSING_FIELD.to_string(),
        Some(other) => other.to_string(),
    }
}

fn integer_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Result class of a single timed request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// 2xx with a JSON body
    Success(Payload),
    /// No complete response within the operation's budget
    Timeout { budget: Duration },
    /// 4xx/5xx; the body prefix is bounded, the payload is kept when it decodes
    HttpError {
        status: u16,
        body_prefix: String,
        payload: Option<Payload>,
    },
    /// Refused connection, DNS failure, malformed response and similar
    NetworkError { message: String },
    /// The request was never attempted
    Unsupported { method: String },
}

impl Outcome {
    pub fn class(&self) -> OutcomeClass {
        match self {
            Self::Success(_) => OutcomeClass::Success,
            Self::Timeout { .. } => OutcomeClass::Timeout,
            Self::HttpError { .. } => OutcomeClass::HttpError,
            Self::NetworkError { .. } => OutcomeClass::NetworkError,
            Self::Unsupported { .. } => OutcomeClass::Unsupported,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeClass {
    Success,
    Timeout,
    HttpError,
    NetworkError,
    Unsupported,
}

impl fmt::Display for OutcomeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "success",
            Self::Timeout => "timeout",
            Self::HttpError => "http_error",
            Self::NetworkError => "network_error",
            Self::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// One timed request, as observed from the client side.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// `None` only when the method was unsupported
    pub operation: Option<Operation>,
    pub method: String,
    pub url: String,
    /// HTTP status, when a response arrived
    pub status: Option<u16>,
    /// Wall-clock time spent; zero when nothing was sent
    pub elapsed: Duration,
    pub outcome: Outcome,
}

impl Measurement {
    /// Elapsed milliseconds, present only for successful requests
    pub fn latency_ms(&self) -> Option<f64> {
        match self.outcome {
            Outcome::Success(_) => Some(duration_ms(self.elapsed)),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    /// Body of a successful response
    pub fn success_payload(&self) -> Option<&Payload> {
        match &self.outcome {
            Outcome::Success(payload) => Some(payload),
            _ => None,
        }
    }

    /// Any decoded body, including the body of an HTTP error response
    pub fn payload(&self) -> Option<&Payload> {
        match &self.outcome {
            Outcome::Success(payload) => Some(payload),
            Outcome::HttpError { payload, .. } => payload.as_ref(),
            _ => None,
        }
    }
}

/// Milliseconds with sub-millisecond precision.
pub fn duration_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
