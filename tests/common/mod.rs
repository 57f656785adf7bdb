//! Shared fixtures for the integration tests: a fast configuration and a
//! fake frontend that caches info responses and invalidates them on
//! purchase, with a slow miss path and a fast hit path.
#![allow(dead_code)]

use cache_latency_probe::{ProbeConfig, ServiceClient, Target, TimedExecutor};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const MISS_DELAY: Duration = Duration::from_millis(80);
pub const HIT_DELAY: Duration = Duration::from_millis(5);

/// Config pointing at `base_url` with millisecond pacing
pub fn fast_config(base_url: &str) -> ProbeConfig {
    ProbeConfig {
        base_url: base_url.to_string(),
        read_timeout: Duration::from_secs(2),
        write_timeout: Duration::from_secs(2),
        priming_delay: Duration::from_millis(1),
        sample_delay: Duration::from_millis(1),
        purchase_delay: Duration::from_millis(1),
        settle_delay: Duration::from_millis(10),
        read_sample_count: 6,
        warmup_sample_count: 2,
        write_attempt_count: 3,
        seed: Some(42),
        ..ProbeConfig::default()
    }
}

pub fn client_for(config: &ProbeConfig) -> ServiceClient<TimedExecutor> {
    ServiceClient::from_config(config).expect("client should build")
}

pub fn target(id: u64) -> Target {
    Target::new(id).expect("test targets are positive")
}

/// Paths of every request the server has seen, in arrival order
pub async fn received_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| format!("{} {}", request.method, request.url.path()))
        .collect()
}

fn item_id(request: &Request) -> Option<u64> {
    request
        .url
        .path_segments()?
        .last()?
        .parse()
        .ok()
}

#[derive(Default)]
struct FrontendState {
    stock: HashMap<u64, i64>,
    cached: HashSet<u64>,
}

/// In-memory stand-in for the bookstore frontend.
#[derive(Clone)]
pub struct FakeFrontend {
    state: Arc<Mutex<FrontendState>>,
    out_of_stock_status: u16,
}

impl FakeFrontend {
    pub fn with_stock(items: &[(u64, i64)]) -> Self {
        let state = FrontendState {
            stock: items.iter().copied().collect(),
            cached: HashSet::new(),
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            out_of_stock_status: 200,
        }
    }

    /// Status used when a purchase is refused for lack of stock
    pub fn out_of_stock_status(mut self, status: u16) -> Self {
        self.out_of_stock_status = status;
        self
    }

    pub fn stock(&self, id: u64) -> Option<i64> {
        self.state.lock().unwrap().stock.get(&id).copied()
    }

    pub async fn mount(&self, server: &MockServer) {
        Mock::given(method("GET"))
            .and(path_regex(r"^/info/\d+$"))
            .respond_with(InfoResponder(self.clone()))
            .mount(server)
            .await;

        Mock::given(method("POST"))
            .and(path_regex(r"^/purchase/\d+$"))
            .respond_with(PurchaseResponder(self.clone()))
            .mount(server)
            .await;
    }
}

struct InfoResponder(FakeFrontend);

impl Respond for InfoResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let mut state = self.0.state.lock().unwrap();
        let Some(id) = item_id(request) else {
            return ResponseTemplate::new(400).set_body_json(json!({"error": "Invalid item number format."}));
        };
        let Some(stock) = state.stock.get(&id).copied() else {
            return ResponseTemplate::new(404).set_body_json(json!({"error": "Item not found"}));
        };

        let delay = if state.cached.insert(id) { MISS_DELAY } else { HIT_DELAY };
        ResponseTemplate::new(200)
            .set_body_json(json!({"Stock": stock, "title": format!("Book {}", id)}))
            .set_delay(delay)
    }
}

struct PurchaseResponder(FakeFrontend);

impl Respond for PurchaseResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let mut state = self.0.state.lock().unwrap();
        let Some(id) = item_id(request) else {
            return ResponseTemplate::new(400).set_body_json(json!({"error": "Invalid item number format."}));
        };

        match state.stock.get(&id).copied() {
            Some(stock) if stock > 0 => {
                state.stock.insert(id, stock - 1);
                state.cached.remove(&id);
                ResponseTemplate::new(200)
                    .set_body_json(json!({
                        "message": "Item purchased successfully",
                        "new_stock": stock - 1
                    }))
                    .set_delay(Duration::from_millis(10))
            }
            Some(_) => ResponseTemplate::new(self.0.out_of_stock_status)
                .set_body_json(json!({"message": "Item is out of stock"})),
            None => ResponseTemplate::new(404).set_body_json(json!({"error": "Item not found"})),
        }
    }
}
