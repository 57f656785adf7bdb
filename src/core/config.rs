//! # Configuration Module
//!
//! The probe reads one configuration structure at start-up and never
//! reloads it. Values come from a YAML (or JSON) file, then environment
//! overrides, then validation.
//!
//! ## Key Features
//! - YAML/JSON parsing with serde, durations in humantime notation (`250ms`, `5s`)
//! - Every field optional in the file; omitted fields take the defaults below
//! - Environment variable overrides (`PROBE_*`)
//! - Validation that reports every problem at once

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use crate::core::error::{ProbeError, ProbeResult};
use crate::core::types::Target;
use crate::observability::config::{LogConfig, LogFormat};

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "PROBE_CONFIG_PATH";
/// Configuration file used when `PROBE_CONFIG_PATH` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config/probe.yaml";

/// Where [`ProbeConfig::load_or_default`] found its values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Read from this file
    File(PathBuf),
    /// This file was absent, built-in defaults were used
    Defaults(PathBuf),
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            Self::File(path) => info!("Loaded configuration from {}", path.display()),
            Self::Defaults(path) => warn!(
                "Configuration file {} not found, using built-in defaults",
                path.display()
            ),
        }
    }
}

/// Complete configuration for one probe run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Root URL of the service under test
    pub base_url: String,

    /// Time budget for a read (`GET /info/<id>`)
    #[serde(with = "humantime_serde")]
    pub read_timeout: Duration,

    /// Time budget for a write (`POST /purchase/<id>`)
    #[serde(with = "humantime_serde")]
    pub write_timeout: Duration,

    /// Pause after each cache-priming read
    #[serde(with = "humantime_serde")]
    pub priming_delay: Duration,

    /// Pause after each sampled read
    #[serde(with = "humantime_serde")]
    pub sample_delay: Duration,

    /// Pause after each purchase
    #[serde(with = "humantime_serde")]
    pub purchase_delay: Duration,

    /// Pause between the probe's purchase and its final read
    #[serde(with = "humantime_serde")]
    pub settle_delay: Duration,

    /// Population that sampled reads are drawn from
    pub read_targets: Vec<Target>,

    /// Size of the main read sample; half of it is spent priming
    pub read_sample_count: usize,

    /// Size of the read sample taken right after priming
    pub warmup_sample_count: usize,

    /// Item bought during the purchase series
    pub write_target: Target,

    /// Number of purchases in the series
    pub write_attempt_count: usize,

    /// Item used by the cache-behavior probe
    pub probe_target: Target,

    /// Seed for target selection; entropy when absent
    pub seed: Option<u64>,

    pub logging: LogConfig,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(10),
            priming_delay: Duration::from_millis(50),
            sample_delay: Duration::from_millis(100),
            purchase_delay: Duration::from_millis(200),
            settle_delay: Duration::from_millis(500),
            read_targets: (1..=7).map(Target::new_unchecked).collect(),
            read_sample_count: 30,
            warmup_sample_count: 5,
            write_target: Target::new_unchecked(7),
            write_attempt_count: 5,
            probe_target: Target::new_unchecked(6),
            seed: None,
            logging: LogConfig::default(),
        }
    }
}

impl ProbeConfig {
    /// Load configuration from a YAML file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> ProbeResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ProbeError::config(format!("Failed to read config file: {}", e)))?;

        let mut config: ProbeConfig = serde_yaml::from_str(&content)
            .map_err(|e| ProbeError::config(format!("Failed to parse config: {}", e)))?;

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from JSON
    pub async fn load_from_json<P: AsRef<Path>>(path: P) -> ProbeResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ProbeError::config(format!("Failed to read config file: {}", e)))?;

        let mut config: ProbeConfig = serde_json::from_str(&content)
            .map_err(|e| ProbeError::config(format!("Failed to parse JSON config: {}", e)))?;

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when it exists, otherwise start from the defaults.
    ///
    /// Environment overrides and validation apply either way. Nothing is
    /// logged here since logging is configured from the result; call
    /// [`ConfigSource::log`] once the subscriber is installed.
    pub async fn load_or_default<P: AsRef<Path>>(path: P) -> ProbeResult<(Self, ConfigSource)> {
        let path = path.as_ref();
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            let config = Self::load_from_file(path).await?;
            return Ok((config, ConfigSource::File(path.to_path_buf())));
        }

        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok((config, ConfigSource::Defaults(path.to_path_buf())))
    }

    /// Apply `PROBE_*` environment variable overrides
    pub fn apply_env_overrides(&mut self) -> ProbeResult<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup.
    ///
    /// Recognized keys: `PROBE_BASE_URL`, `PROBE_READ_TIMEOUT`,
    /// `PROBE_WRITE_TIMEOUT`, `PROBE_SEED`, `PROBE_LOG_LEVEL`,
    /// `PROBE_LOG_FORMAT`.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> ProbeResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("PROBE_BASE_URL") {
            self.base_url = url;
        }

        if let Some(timeout) = lookup("PROBE_READ_TIMEOUT") {
            self.read_timeout = humantime::parse_duration(&timeout)
                .map_err(|e| ProbeError::config(format!("Invalid PROBE_READ_TIMEOUT: {}", e)))?;
        }

        if let Some(timeout) = lookup("PROBE_WRITE_TIMEOUT") {
            self.write_timeout = humantime::parse_duration(&timeout)
                .map_err(|e| ProbeError::config(format!("Invalid PROBE_WRITE_TIMEOUT: {}", e)))?;
        }

        if let Some(seed) = lookup("PROBE_SEED") {
            self.seed = Some(
                seed.parse()
                    .map_err(|e| ProbeError::config(format!("Invalid PROBE_SEED: {}", e)))?,
            );
        }

        if let Some(level) = lookup("PROBE_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Some(format) = lookup("PROBE_LOG_FORMAT") {
            self.logging.format = format.parse::<LogFormat>()?;
        }

        Ok(())
    }

    /// Validate the configuration, reporting every problem found
    pub fn validate(&self) -> ProbeResult<()> {
        let mut errors = Vec::new();

        match Url::parse(&self.base_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => errors.push(format!(
                "base_url must use http or https, got '{}'",
                url.scheme()
            )),
            Err(e) => errors.push(format!("base_url '{}' is invalid: {}", self.base_url, e)),
        }

        if self.read_timeout.is_zero() {
            errors.push("read_timeout must be greater than 0".to_string());
        }
        if self.write_timeout.is_zero() {
            errors.push("write_timeout must be greater than 0".to_string());
        }

        if self.read_targets.is_empty() {
            errors.push("read_targets must contain at least one target".to_string());
        }
        if self.read_sample_count == 0 {
            errors.push("read_sample_count must be greater than 0".to_string());
        }
        if self.warmup_sample_count == 0 {
            errors.push("warmup_sample_count must be greater than 0".to_string());
        }
        if self.write_attempt_count == 0 {
            errors.push("write_attempt_count must be greater than 0".to_string());
        }

        if self.logging.level.trim().is_empty() {
            errors.push("logging.level cannot be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProbeError::config(errors.join("; ")))
        }
    }

    /// Parsed base URL with a trailing slash, ready for joining paths
    pub fn base_url(&self) -> ProbeResult<Url> {
        let mut url = Url::parse(&self.base_url)?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    /// Number of priming reads issued before the warm-up sample
    pub fn priming_count(&self) -> usize {
        self.read_sample_count / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_validation() {
        let config = ProbeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.read_targets.len(), 7);
        assert_eq!(config.priming_count(), 15);
        assert_eq!(config.write_target.id(), 7);
        assert_eq!(config.probe_target.id(), 6);
        assert_eq!(config.read_timeout, Duration::from_secs(5));
        assert_eq!(config.write_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_config_serialization_yaml() {
        let config = ProbeConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("read_timeout: 5s"));
        assert!(yaml.contains("settle_delay: 500ms"));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
base_url: "http://catalog.test:3000"
read_targets: [2, 4]
sample_delay: 10ms
"#;
        let config: ProbeConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.base_url, "http://catalog.test:3000");
        assert_eq!(config.read_targets, vec![Target::new(2).unwrap(), Target::new(4).unwrap()]);
        assert_eq!(config.sample_delay, Duration::from_millis(10));
        assert_eq!(config.purchase_delay, Duration::from_millis(200));
        assert_eq!(config.write_attempt_count, 5);
    }

    #[test]
    fn test_zero_target_is_rejected() {
        let yaml = "probe_target: 0\n";
        assert!(serde_yaml::from_str::<ProbeConfig>(yaml).is_err());
    }

    #[tokio::test]
    async fn test_load_config_from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "base_url: http://127.0.0.1:3000\nwrite_attempt_count: 3\nseed: 42\nlogging:\n  level: debug\n  format: json"
        )
        .unwrap();

        let config = ProbeConfig::load_from_file(file.path()).await.unwrap();
        assert_eq!(config.write_attempt_count, 3);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[tokio::test]
    async fn test_load_config_from_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"base_url": "http://127.0.0.1:3000", "read_targets": [1], "read_timeout": "250ms"}}"#
        )
        .unwrap();

        let config = ProbeConfig::load_from_json(file.path()).await.unwrap();
        assert_eq!(config.read_targets.len(), 1);
        assert_eq!(config.read_timeout, Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_invalid_file_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "read_targets: []").unwrap();

        let err = ProbeConfig::load_from_file(file.path()).await.unwrap_err();
        assert!(err.to_string().contains("read_targets"));
    }

    #[tokio::test]
    async fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let absent = dir.path().join("absent.yaml");
        let (config, source) = ProbeConfig::load_or_default(&absent).await.unwrap();
        assert_eq!(config.read_sample_count, 30);
        assert_eq!(source, ConfigSource::Defaults(absent));
    }

    #[tokio::test]
    async fn test_existing_file_is_reported_as_source() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "write_attempt_count: 2").unwrap();

        let (config, source) = ProbeConfig::load_or_default(file.path()).await.unwrap();
        assert_eq!(config.write_attempt_count, 2);
        assert_eq!(source, ConfigSource::File(file.path().to_path_buf()));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PROBE_BASE_URL", "http://frontend:3000"),
            ("PROBE_READ_TIMEOUT", "2s"),
            ("PROBE_WRITE_TIMEOUT", "1500ms"),
            ("PROBE_SEED", "7"),
            ("PROBE_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = ProbeConfig::default();
        config
            .apply_overrides_from(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.base_url, "http://frontend:3000");
        assert_eq!(config.read_timeout, Duration::from_secs(2));
        assert_eq!(config.write_timeout, Duration::from_millis(1500));
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_overrides() {
        let mut config = ProbeConfig::default();
        let result = config.apply_overrides_from(|key| {
            (key == "PROBE_READ_TIMEOUT").then(|| "soon".to_string())
        });
        assert!(result.is_err());

        let result = config.apply_overrides_from(|key| {
            (key == "PROBE_SEED").then(|| "-3".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_config_validation_errors() {
        let mut config = ProbeConfig::default();
        config.base_url = "ftp://example.com".to_string();
        config.read_timeout = Duration::ZERO;
        config.read_targets.clear();
        config.write_attempt_count = 0;

        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("http or https"));
        assert!(message.contains("read_timeout"));
        assert!(message.contains("read_targets"));
        assert!(message.contains("write_attempt_count"));
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let mut config = ProbeConfig::default();
        config.base_url = "http://localhost:3000/api".to_string();
        assert_eq!(config.base_url().unwrap().as_str(), "http://localhost:3000/api/");

        config.base_url = "http://localhost:3000".to_string();
        assert_eq!(config.base_url().unwrap().as_str(), "http://localhost:3000/");
    }
}
