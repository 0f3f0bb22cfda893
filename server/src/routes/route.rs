use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use icewatch_shared::projection::{great_circle_path, haversine_km, near_antipodal};
use icewatch_shared::{RouteRequest, RouteResponse};

use crate::error::ApiError;
use crate::state::AppState;

const KM_PER_SEGMENT: f64 = 50.0;
const MIN_SEGMENTS: usize = 8;
const MAX_SEGMENTS: usize = 256;

fn validate_position(label: &str, [lon, lat]: [f64; 2]) -> Result<(), ApiError> {
    let valid = lon.is_finite()
        && lat.is_finite()
        && (-180.0..=180.0).contains(&lon)
        && (-90.0..=90.0).contains(&lat);
    if valid {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "{label} must be [lon, lat] with lon in [-180, 180] and lat in [-90, 90]."
        )))
    }
}

/// Great-circle path between two endpoints, sampled roughly every 50 km.
pub fn simulate_route(request: RouteRequest) -> RouteResponse {
    let distance_km = haversine_km(request.start, request.end);
    let segments = ((distance_km / KM_PER_SEGMENT).ceil() as usize).clamp(MIN_SEGMENTS, MAX_SEGMENTS);
    RouteResponse {
        path: great_circle_path(request.start, request.end, segments),
        distance_km,
    }
}

pub async fn post_route(
    State(state): State<AppState>,
    payload: Result<Json<RouteRequest>, JsonRejection>,
) -> Result<Json<RouteResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    validate_position("start", request.start)?;
    validate_position("end", request.end)?;
    if near_antipodal(request.start, request.end) {
        return Err(ApiError::bad_request(
            "start and end are antipodal; no single great-circle route joins them.",
        ));
    }
    state.observability.record_route_request();

    let response = simulate_route(request);
    tracing::debug!(
        distance_km = response.distance_km,
        points = response.path.len(),
        "route simulated"
    );
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use icewatch_shared::{RouteRequest, RouteResponse};
    use reqwest::StatusCode;
    use serde_json::json;

    use super::simulate_route;
    use crate::routes::test_support::{fixture_state, spawn_test_server};

    #[test]
    fn path_density_scales_with_distance() {
        let short = simulate_route(RouteRequest {
            start: [0.0, 80.0],
            end: [0.1, 80.0],
        });
        assert_eq!(short.path.len(), 9);

        let long = simulate_route(RouteRequest {
            start: [-150.0, 70.0],
            end: [30.0, 70.0],
        });
        // ~4448 km over the pole.
        assert!((long.distance_km - 4447.8).abs() < 1.0);
        assert_eq!(long.path.len(), 90);
        assert_eq!(long.path.first(), Some(&[-150.0, 70.0]));
        assert_eq!(long.path.last(), Some(&[30.0, 70.0]));
    }

    #[tokio::test]
    async fn route_endpoint_validates_and_returns_path() {
        let (_dir, state) = fixture_state("route");
        let (addr, server_handle) = spawn_test_server(state).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("http://{addr}/api/route"))
            .json(&json!({"start": [-100.0, 72.0], "end": [-60.0, 75.0]}))
            .send()
            .await
            .expect("route request")
            .error_for_status()
            .expect("route status")
            .json::<RouteResponse>()
            .await
            .expect("parse route");
        assert!(response.distance_km > 0.0);
        assert_eq!(response.path.first(), Some(&[-100.0, 72.0]));
        assert_eq!(response.path.last(), Some(&[-60.0, 75.0]));

        let invalid = client
            .post(format!("http://{addr}/api/route"))
            .json(&json!({"start": [-100.0, 95.0], "end": [-60.0, 75.0]}))
            .send()
            .await
            .expect("route request");
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let antipodal = client
            .post(format!("http://{addr}/api/route"))
            .json(&json!({"start": [0.0, 0.0], "end": [180.0, 0.0]}))
            .send()
            .await
            .expect("route request");
        assert_eq!(antipodal.status(), StatusCode::BAD_REQUEST);

        server_handle.abort();
        let _ = server_handle.await;
    }
}
