use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;

use crate::config::{StateConfig, upstream_connect_timeout, upstream_http_timeout};
use crate::services::chat::ChatService;
use crate::services::datasets::DatasetStore;
use crate::services::prediction::PredictionService;

#[derive(Clone)]
pub struct AppState {
    pub datasets: DatasetStore,
    pub predictions: PredictionService,
    pub chat: ChatService,
    pub observability: Arc<ObservabilityCounters>,
}

#[derive(Debug, Default)]
pub struct ObservabilityCounters {
    ice_extent_requests_total: AtomicU64,
    by_year_requests_total: AtomicU64,
    prediction_requests_total: AtomicU64,
    prediction_cache_hits_total: AtomicU64,
    prediction_failures_total: AtomicU64,
    chat_requests_total: AtomicU64,
    route_requests_total: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub struct ObservabilitySnapshot {
    pub ice_extent_requests_total: u64,
    pub by_year_requests_total: u64,
    pub prediction_requests_total: u64,
    pub prediction_cache_hits_total: u64,
    pub prediction_failures_total: u64,
    pub chat_requests_total: u64,
    pub route_requests_total: u64,
}

impl ObservabilityCounters {
    pub fn snapshot(&self) -> ObservabilitySnapshot {
        ObservabilitySnapshot {
            ice_extent_requests_total: self.ice_extent_requests_total.load(Ordering::Relaxed),
            by_year_requests_total: self.by_year_requests_total.load(Ordering::Relaxed),
            prediction_requests_total: self.prediction_requests_total.load(Ordering::Relaxed),
            prediction_cache_hits_total: self.prediction_cache_hits_total.load(Ordering::Relaxed),
            prediction_failures_total: self.prediction_failures_total.load(Ordering::Relaxed),
            chat_requests_total: self.chat_requests_total.load(Ordering::Relaxed),
            route_requests_total: self.route_requests_total.load(Ordering::Relaxed),
        }
    }

    pub fn record_ice_extent_request(&self) {
        self.ice_extent_requests_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_by_year_request(&self) {
        self.by_year_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_prediction_request(&self, cache_hit: bool) {
        self.prediction_requests_total
            .fetch_add(1, Ordering::Relaxed);
        if cache_hit {
            self.prediction_cache_hits_total
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_prediction_failure(&self) {
        self.prediction_requests_total
            .fetch_add(1, Ordering::Relaxed);
        self.prediction_failures_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_chat_request(&self) {
        self.chat_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_route_request(&self) {
        self.route_requests_total.fetch_add(1, Ordering::Relaxed);
    }
}

fn build_http_client() -> reqwest::Client {
    let request_timeout = upstream_http_timeout();
    let connect_timeout = upstream_connect_timeout();
    reqwest::Client::builder()
        .user_agent("icewatch/0.1")
        .timeout(request_timeout)
        .connect_timeout(connect_timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!(
                error = %e,
                "failed to build configured HTTP client, falling back to defaults"
            );
            reqwest::Client::new()
        })
}

impl AppState {
    pub fn new(config: StateConfig) -> Self {
        let http_client = build_http_client();
        Self {
            datasets: DatasetStore::new(config.dataset_dir),
            predictions: PredictionService::new(
                config.model_path,
                config.prediction_cache_max_entries,
            ),
            chat: ChatService::new(
                http_client,
                config.google_api_key,
                config.gemini_model,
                config.gemini_api_base,
            ),
            observability: Arc::new(ObservabilityCounters::default()),
        }
    }
}
