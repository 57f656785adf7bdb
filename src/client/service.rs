//! # Service Routes
//!
//! The two endpoints of the service under test, `GET <base>/info/<id>` and
//! `POST <base>/purchase/<id>`, each sent through a [`RequestExecutor`].

use reqwest::Method;
use url::Url;

use crate::client::executor::{RequestExecutor, TimedExecutor};
use crate::core::config::ProbeConfig;
use crate::core::error::ProbeResult;
use crate::core::types::{Measurement, Target};

/// The service under test, seen through a request executor.
///
/// Knows the two routes the harness uses and nothing else.
pub struct ServiceClient<E> {
    executor: E,
    base_url: Url,
}

impl ServiceClient<TimedExecutor> {
    /// Client with a reqwest executor, timeouts and base URL from config
    pub fn from_config(config: &ProbeConfig) -> ProbeResult<Self> {
        let executor = TimedExecutor::from_config(config)?;
        Ok(Self::new(executor, config.base_url()?))
    }
}

impl<E: RequestExecutor> ServiceClient<E> {
    pub fn new(executor: E, base_url: Url) -> Self {
        Self { executor, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `<base>/info/<id>`
    pub fn info_url(&self, target: Target) -> String {
        self.route("info", target)
    }

    /// `<base>/purchase/<id>`
    pub fn purchase_url(&self, target: Target) -> String {
        self.route("purchase", target)
    }

    /// Timed read of an item's info
    pub async fn info(&self, target: Target) -> Measurement {
        let url = self.info_url(target);
        self.executor.execute(&Method::GET, &url, None).await
    }

    /// Timed purchase of one unit of an item (empty body)
    pub async fn purchase(&self, target: Target) -> Measurement {
        let url = self.purchase_url(target);
        self.executor.execute(&Method::POST, &url, None).await
    }

    fn route(&self, name: &str, target: Target) -> String {
        let base = self.base_url.as_str();
        if base.ends_with('/') {
            format!("{}{}/{}", base, name, target)
        } else {
            format!("{}/{}/{}", base, name, target)
        }
    }
}
