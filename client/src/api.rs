use std::fmt;

use gloo_net::http::{Request, Response};
use icewatch_shared::predict::{DEFAULT_RADIUS_KM, PredictForm};
use icewatch_shared::{
    AvailableDatesResponse, ChatMessageRequest, ChatMessageResponse, IceExtentResponse,
    IcePredictionResponse, RouteRequest, RouteResponse,
};
use serde::de::DeserializeOwned;

use crate::config::api_url;

/// Why a backend call produced no value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FetchError {
    Network(String),
    Status(u16),
    Parse(String),
}

impl FetchError {
    /// HTTP status when the server answered with a non-2xx response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status(code) => Some(*code),
            Self::Network(_) | Self::Parse(_) => None,
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(e) => write!(f, "fetch error: {e}"),
            Self::Status(code) => write!(f, "HTTP {code}"),
            Self::Parse(e) => write!(f, "parse error: {e}"),
        }
    }
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, FetchError> {
    if !resp.ok() {
        return Err(FetchError::Status(resp.status()));
    }
    resp.json::<T>()
        .await
        .map_err(|e| FetchError::Parse(e.to_string()))
}

async fn get_json<T: DeserializeOwned>(url: &str) -> Result<T, FetchError> {
    let resp = Request::get(url)
        .send()
        .await
        .map_err(|e| FetchError::Network(e.to_string()))?;
    read_json(resp).await
}

async fn post_json<B: serde::Serialize, T: DeserializeOwned>(
    url: &str,
    body: &B,
) -> Result<T, FetchError> {
    let resp = Request::post(url)
        .json(body)
        .map_err(|e| FetchError::Network(e.to_string()))?
        .send()
        .await
        .map_err(|e| FetchError::Network(e.to_string()))?;
    read_json(resp).await
}

fn ice_extent_url(date: &str) -> String {
    api_url(&format!("/ice_extent?date={date}&radius_km={DEFAULT_RADIUS_KM}"))
}

fn predict_url(form: &PredictForm) -> String {
    api_url(&format!(
        "/ice_extent/predict?date={}&radius_km={}&thresh={}",
        form.date, form.radius_km, form.threshold
    ))
}

pub(crate) async fn fetch_available_dates() -> Result<AvailableDatesResponse, FetchError> {
    get_json(&api_url("/ice_extent/available_dates")).await
}

pub(crate) async fn fetch_ice_extent(date: &str) -> Result<IceExtentResponse, FetchError> {
    get_json(&ice_extent_url(date)).await
}

pub(crate) async fn predict_ice_extent(
    form: &PredictForm,
) -> Result<IcePredictionResponse, FetchError> {
    get_json(&predict_url(form)).await
}

pub(crate) async fn send_chat_message(message: &str) -> Result<ChatMessageResponse, FetchError> {
    let body = ChatMessageRequest {
        message: message.to_string(),
    };
    post_json(&api_url("/chat"), &body).await
}

pub(crate) async fn request_route(
    start: [f64; 2],
    end: [f64; 2],
) -> Result<RouteResponse, FetchError> {
    post_json(&api_url("/route"), &RouteRequest { start, end }).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_http_failures_carry_a_status() {
        assert_eq!(FetchError::Status(503).status(), Some(503));
        assert_eq!(FetchError::Network("offline".into()).status(), None);
        assert_eq!(FetchError::Parse("eof".into()).status(), None);
        assert_eq!(FetchError::Status(404).to_string(), "HTTP 404");
    }

    #[test]
    fn query_strings_match_backend_parameters() {
        assert_eq!(
            ice_extent_url("2024-01-02"),
            "/api/ice_extent?date=2024-01-02&radius_km=500"
        );
        let form = PredictForm {
            date: "2031-03-15".to_string(),
            radius_km: 750.0,
            threshold: 0.35,
        };
        assert_eq!(
            predict_url(&form),
            "/api/ice_extent/predict?date=2031-03-15&radius_km=750&thresh=0.35"
        );
    }
}
