use std::fmt::Write as _;

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use crate::state::{AppState, ObservabilitySnapshot};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

async fn dataset_count(state: &AppState) -> usize {
    match state.datasets.available_dates().await {
        Ok(dates) => dates.len(),
        Err(e) => {
            tracing::warn!(error = %e, "dataset scan failed");
            0
        }
    }
}

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let datasets = dataset_count(&state).await;
    let observability = state.observability.snapshot();
    Json(serde_json::json!({
        "status": "ok",
        "datasets": datasets,
        "model_loaded": state.predictions.model_loaded(),
        "chat_configured": state.chat.is_configured(),
        "observability": {
            "ice_extent_requests_total": observability.ice_extent_requests_total,
            "by_year_requests_total": observability.by_year_requests_total,
            "prediction_requests_total": observability.prediction_requests_total,
            "prediction_cache_hits_total": observability.prediction_cache_hits_total,
            "prediction_failures_total": observability.prediction_failures_total,
            "chat_requests_total": observability.chat_requests_total,
            "route_requests_total": observability.route_requests_total,
        }
    }))
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let gauges = Gauges {
        datasets: dataset_count(&state).await,
        prediction_cache_entries: state.predictions.cache_len(),
        model_loaded: state.predictions.model_loaded(),
        chat_configured: state.chat.is_configured(),
    };
    let body = render_prometheus_metrics(gauges, state.observability.snapshot());

    (
        [
            (header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body,
    )
}

#[derive(Debug, Clone, Copy)]
struct Gauges {
    datasets: usize,
    prediction_cache_entries: usize,
    model_loaded: bool,
    chat_configured: bool,
}

fn write_metric(body: &mut String, name: &str, kind: &str, help: &str, value: u64) {
    let _ = writeln!(body, "# HELP icewatch_{name} {help}");
    let _ = writeln!(body, "# TYPE icewatch_{name} {kind}");
    let _ = writeln!(body, "icewatch_{name} {value}");
}

fn render_prometheus_metrics(gauges: Gauges, observability: ObservabilitySnapshot) -> String {
    let mut body = String::new();
    write_metric(
        &mut body,
        "datasets",
        "gauge",
        "Number of distinct dataset dates on disk.",
        gauges.datasets as u64,
    );
    write_metric(
        &mut body,
        "prediction_cache_entries",
        "gauge",
        "Cached prediction results.",
        gauges.prediction_cache_entries as u64,
    );
    write_metric(
        &mut body,
        "model_loaded",
        "gauge",
        "Whether the prediction model is loaded (1) or not (0).",
        u64::from(gauges.model_loaded),
    );
    write_metric(
        &mut body,
        "chat_configured",
        "gauge",
        "Whether an LLM API key is configured (1) or not (0).",
        u64::from(gauges.chat_configured),
    );

    let counters = [
        (
            "ice_extent_requests_total",
            "Total historical ice extent requests.",
            observability.ice_extent_requests_total,
        ),
        (
            "by_year_requests_total",
            "Total per-year ice extent requests.",
            observability.by_year_requests_total,
        ),
        (
            "prediction_requests_total",
            "Total ice prediction requests.",
            observability.prediction_requests_total,
        ),
        (
            "prediction_cache_hits_total",
            "Prediction requests served from cache.",
            observability.prediction_cache_hits_total,
        ),
        (
            "prediction_failures_total",
            "Prediction requests that failed.",
            observability.prediction_failures_total,
        ),
        (
            "chat_requests_total",
            "Total chat messages handled.",
            observability.chat_requests_total,
        ),
        (
            "route_requests_total",
            "Total route simulations.",
            observability.route_requests_total,
        ),
    ];
    for (name, help, value) in counters {
        write_metric(&mut body, name, "counter", help, value);
    }

    body
}

#[cfg(test)]
mod tests {
    use super::{Gauges, render_prometheus_metrics};
    use crate::routes::test_support::{fixture_state, spawn_test_server};
    use crate::state::ObservabilitySnapshot;

    #[test]
    fn metrics_output_contains_prometheus_help_type_and_values() {
        let observability = ObservabilitySnapshot {
            ice_extent_requests_total: 12,
            by_year_requests_total: 2,
            prediction_requests_total: 7,
            prediction_cache_hits_total: 3,
            prediction_failures_total: 1,
            chat_requests_total: 5,
            route_requests_total: 4,
        };
        let gauges = Gauges {
            datasets: 42,
            prediction_cache_entries: 6,
            model_loaded: true,
            chat_configured: false,
        };

        let metrics = render_prometheus_metrics(gauges, observability);

        assert!(metrics.contains("# HELP icewatch_datasets"));
        assert!(metrics.contains("# TYPE icewatch_datasets gauge"));
        assert!(metrics.contains("# TYPE icewatch_prediction_requests_total counter"));
        assert!(metrics.contains("icewatch_datasets 42"));
        assert!(metrics.contains("icewatch_prediction_cache_entries 6"));
        assert!(metrics.contains("icewatch_model_loaded 1"));
        assert!(metrics.contains("icewatch_chat_configured 0"));
        assert!(metrics.contains("icewatch_ice_extent_requests_total 12"));
        assert!(metrics.contains("icewatch_by_year_requests_total 2"));
        assert!(metrics.contains("icewatch_prediction_requests_total 7"));
        assert!(metrics.contains("icewatch_prediction_cache_hits_total 3"));
        assert!(metrics.contains("icewatch_prediction_failures_total 1"));
        assert!(metrics.contains("icewatch_chat_requests_total 5"));
        assert!(metrics.contains("icewatch_route_requests_total 4"));
    }

    #[tokio::test]
    async fn health_and_metrics_expose_expected_contract() {
        let (_dir, state) = fixture_state("health");
        let (addr, server_handle) = spawn_test_server(state).await;
        let base_url = format!("http://{addr}");
        let client = reqwest::Client::new();

        client
            .get(format!("{base_url}/api/ice_extent?date=2024-01-02"))
            .send()
            .await
            .expect("ice extent request")
            .error_for_status()
            .expect("ice extent status");

        let health = client
            .get(format!("{base_url}/api/health"))
            .send()
            .await
            .expect("health request")
            .error_for_status()
            .expect("health status")
            .json::<serde_json::Value>()
            .await
            .expect("parse health");

        assert_eq!(health.get("status").and_then(|v| v.as_str()), Some("ok"));
        assert_eq!(health.get("datasets").and_then(|v| v.as_u64()), Some(3));
        assert_eq!(
            health.get("model_loaded").and_then(|v| v.as_bool()),
            Some(false)
        );
        assert_eq!(
            health.get("chat_configured").and_then(|v| v.as_bool()),
            Some(false)
        );
        assert_eq!(
            health
                .get("observability")
                .and_then(|v| v.get("ice_extent_requests_total"))
                .and_then(|v| v.as_u64()),
            Some(1)
        );

        let metrics = client
            .get(format!("{base_url}/api/metrics"))
            .send()
            .await
            .expect("metrics request")
            .error_for_status()
            .expect("metrics status")
            .text()
            .await
            .expect("parse metrics text");

        assert!(metrics.contains("# TYPE icewatch_ice_extent_requests_total counter"));
        assert!(metrics.contains("icewatch_ice_extent_requests_total 1"));
        assert!(metrics.contains("icewatch_datasets 3"));
        assert!(metrics.contains("icewatch_model_loaded 0"));

        server_handle.abort();
        let _ = server_handle.await;
    }
}
