use std::path::{Path, PathBuf};

use axum::{
    Router,
    extract::Request,
    http::{HeaderValue, Method, header},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;

use crate::config;
use crate::routes;
use crate::state::AppState;

pub(crate) fn build_app(state: AppState) -> Router {
    build_app_with(state, &config::cors_allow_origins(), config::static_dir())
}

pub(crate) fn build_app_with(
    state: AppState,
    cors_origins: &[String],
    static_dir: PathBuf,
) -> Router {
    let static_assets = Router::new()
        .fallback_service(
            ServeDir::new(static_dir)
                .precompressed_br()
                .precompressed_gzip(),
        )
        .layer(middleware::from_fn(set_static_cache_control));

    let api = Router::new()
        .route("/api/health", get(routes::api::health))
        .route("/api/metrics", get(routes::api::metrics))
        .route("/api/ice_extent", get(routes::ice_extent::get_ice_extent))
        .route(
            "/api/ice_extent/available_dates",
            get(routes::ice_extent::get_available_dates),
        )
        .route(
            "/api/ice_extent/by_year",
            get(routes::ice_extent::get_ice_extent_by_year),
        )
        .route(
            "/api/ice_extent/predict",
            get(routes::ice_extent::predict_ice_extent),
        )
        .route("/api/chat", post(routes::chat::post_chat))
        .route("/api/route", post(routes::route::post_route));

    api.layer(cors_layer(cors_origins))
        .layer(CompressionLayer::new())
        .fallback_service(static_assets)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = %e, %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

async fn set_static_cache_control(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let mut response = next.run(request).await;

    if response.status().is_success()
        && let Some(cache_control) = cache_control_for_path(&path)
    {
        response.headers_mut().insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(cache_control),
        );
    }

    response
}

fn cache_control_for_path(path: &str) -> Option<&'static str> {
    if is_hashed_bundle_asset(path) {
        return Some("public, max-age=31536000, immutable");
    }

    if path.starts_with("/assets/") || path.starts_with("/fonts/") {
        return Some("public, max-age=86400");
    }

    None
}

/// Trunk emits `name-<hash>.{js,wasm,css}`; any 8+ hex-digit segment counts.
fn is_hashed_bundle_asset(path: &str) -> bool {
    let path = Path::new(path);
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };

    if !matches!(ext, "wasm" | "js" | "css") {
        return false;
    }

    let Some(filename) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };

    filename
        .split(['-', '_', '.'])
        .any(|segment| segment.len() >= 8 && segment.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::routes::test_support::fixture_state;
    use crate::services::datasets::test_support::ScratchDir;

    #[test]
    fn immutable_cache_for_hashed_bundle_assets() {
        assert_eq!(
            cache_control_for_path("/icewatch-client-71578f6b278221f3_bg.wasm"),
            Some("public, max-age=31536000, immutable")
        );
        assert_eq!(
            cache_control_for_path("/input-a93762ff3bf6d63a.css"),
            Some("public, max-age=31536000, immutable")
        );
    }

    #[test]
    fn short_cache_for_unhashed_static_assets() {
        assert_eq!(
            cache_control_for_path("/assets/logo.svg"),
            Some("public, max-age=86400")
        );
        assert_eq!(cache_control_for_path("/main.js"), None);
    }

    #[test]
    fn no_cache_header_override_for_html() {
        assert_eq!(cache_control_for_path("/"), None);
        assert_eq!(cache_control_for_path("/index.html"), None);
    }

    #[tokio::test]
    async fn cors_allows_configured_origin_only() {
        let (_dir, state) = fixture_state("cors");
        let static_dir = ScratchDir::new("cors-static");
        let app = build_app_with(
            state,
            &["http://localhost:5173".to_string()],
            static_dir.path().to_path_buf(),
        );

        let allowed = app
            .clone()
            .oneshot(
                Request::get("/api/health")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(allowed.status(), StatusCode::OK);
        assert_eq!(
            allowed
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok()),
            Some("http://localhost:5173")
        );

        let denied = app
            .oneshot(
                Request::get("/api/health")
                    .header(header::ORIGIN, "http://evil.test")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert!(
            denied
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none()
        );
    }

    #[tokio::test]
    async fn static_files_served_from_configured_dir() {
        let (_dir, state) = fixture_state("static");
        let static_dir = ScratchDir::new("static-files");
        static_dir.write("index.html", "<html>icewatch</html>");
        static_dir.write("icewatch-client-71578f6b278221f3.js", "export {};");
        let app = build_app_with(state, &[], static_dir.path().to_path_buf());

        let index = app
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(index.status(), StatusCode::OK);
        assert!(index.headers().get(header::CACHE_CONTROL).is_none());

        let bundle = app
            .oneshot(
                Request::get("/icewatch-client-71578f6b278221f3.js")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(bundle.status(), StatusCode::OK);
        assert_eq!(
            bundle
                .headers()
                .get(header::CACHE_CONTROL)
                .and_then(|v| v.to_str().ok()),
            Some("public, max-age=31536000, immutable")
        );
    }
}
