//! # Error Handling Module
//!
//! Start-up and wiring errors for the probe, built with `thiserror`.
//!
//! Individual request failures (timeouts, HTTP errors, refused connections)
//! are *not* errors in this sense: the harness records them as
//! [`Outcome`](crate::core::types::Outcome) values and keeps going. The types
//! here cover what can stop a run before it starts: unreadable or invalid
//! configuration, an HTTP client that cannot be built, a malformed URL.

use thiserror::Error;

/// Result alias used for every fallible operation in the crate.
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that abort probe start-up or reject invalid input.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProbeError {
    /// Configuration-related errors (invalid values, unreadable files, etc.)
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// A target identifier that is not a positive integer
    #[error("Invalid target: {value}")]
    InvalidTarget { value: String },

    /// The executor was asked for a method other than GET or POST
    #[error("Unsupported method: {method}")]
    UnsupportedMethod { method: String },

    /// Failure to build or use the HTTP client
    #[error("HTTP client error: {message}")]
    HttpClient { message: String },

    /// URL parsing or joining errors
    #[error("URL error: {message}")]
    Url { message: String },

    /// I/O errors (config file reads)
    #[error("I/O error: {message}")]
    Io { message: String },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json { message: String },

    /// YAML parsing errors for configuration files
    #[error("YAML error: {message}")]
    Yaml { message: String },

    /// Logging subscriber could not be installed
    #[error("Logging error: {message}")]
    Logging { message: String },
}

impl ProbeError {
    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an invalid target error for the offending input
    pub fn invalid_target<S: Into<String>>(value: S) -> Self {
        Self::InvalidTarget {
            value: value.into(),
        }
    }

    /// Create an unsupported method error
    pub fn unsupported_method<S: Into<String>>(method: S) -> Self {
        Self::UnsupportedMethod {
            method: method.into(),
        }
    }

    /// Create a logging setup error
    pub fn logging<S: Into<String>>(message: S) -> Self {
        Self::Logging {
            message: message.into(),
        }
    }

    /// Short machine-friendly name of the error class
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration_error",
            Self::InvalidTarget { .. } => "invalid_target",
            Self::UnsupportedMethod { .. } => "unsupported_method",
            Self::HttpClient { .. } => "http_client_error",
            Self::Url { .. } => "url_error",
            Self::Io { .. } => "io_error",
            Self::Json { .. } => "json_error",
            Self::Yaml { .. } => "yaml_error",
            Self::Logging { .. } => "logging_error",
        }
    }
}

impl From<std::io::Error> for ProbeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ProbeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for ProbeError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        Self::HttpClient {
            message: err.to_string(),
        }
    }
}

impl From<url::ParseError> for ProbeError {
    fn from(err: url::ParseError) -> Self {
        Self::Url {
            message: err.to_string(),
        }
    }
}
