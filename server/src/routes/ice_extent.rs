use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use futures::stream::{self, StreamExt};
use icewatch_shared::predict::{DEFAULT_RADIUS_KM, DEFAULT_THRESHOLD};
use icewatch_shared::{
    AvailableDatesResponse, IceExtentResponse, IcePredictionResponse, YearDay, YearResponse,
    parse_iso_date,
};
use serde::Deserialize;

use crate::config::by_year_max_concurrency;
use crate::error::ApiError;
use crate::state::AppState;

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2100;
const INVALID_DATE_DETAIL: &str = "Date must be provided as YYYY-MM-DD.";

fn default_radius_km() -> f64 {
    DEFAULT_RADIUS_KM
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

#[derive(Debug, Deserialize)]
pub struct IceExtentQuery {
    date: String,
    #[serde(default = "default_radius_km")]
    radius_km: f64,
}

#[derive(Debug, Deserialize)]
pub struct ByYearQuery {
    year: i32,
    #[serde(default = "default_radius_km")]
    radius_km: f64,
}

#[derive(Debug, Deserialize)]
pub struct PredictQuery {
    date: String,
    #[serde(default = "default_radius_km")]
    radius_km: f64,
    #[serde(default = "default_threshold")]
    thresh: f64,
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

fn validate_radius(radius_km: f64) -> Result<f64, ApiError> {
    if radius_km.is_finite() && radius_km >= 0.0 {
        Ok(radius_km)
    } else {
        Err(ApiError::bad_request("radius_km must be a number >= 0."))
    }
}

pub async fn get_ice_extent(
    State(state): State<AppState>,
    query: Result<Query<IceExtentQuery>, QueryRejection>,
) -> Result<Json<IceExtentResponse>, ApiError> {
    state.observability.record_ice_extent_request();
    let params = query_params(query)?;
    let radius_km = validate_radius(params.radius_km)?;

    let loaded = state.datasets.load(&params.date, radius_km).await?;
    tracing::debug!(
        date = %loaded.date,
        count = loaded.feature_collection.len(),
        "served ice extent"
    );
    Ok(Json(IceExtentResponse {
        date: params.date,
        source: loaded.source,
        radius_km,
        feature_collection: loaded.feature_collection,
    }))
}

pub async fn get_available_dates(
    State(state): State<AppState>,
) -> Result<Json<AvailableDatesResponse>, ApiError> {
    let dates = state.datasets.available_dates().await?;
    let dates = dates.as_slice().to_vec();
    Ok(Json(AvailableDatesResponse {
        count: dates.len(),
        dates,
    }))
}

pub async fn get_ice_extent_by_year(
    State(state): State<AppState>,
    query: Result<Query<ByYearQuery>, QueryRejection>,
) -> Result<Json<YearResponse>, ApiError> {
    state.observability.record_by_year_request();
    let params = query_params(query)?;
    if !(MIN_YEAR..=MAX_YEAR).contains(&params.year) {
        return Err(ApiError::bad_request(format!(
            "year must be between {MIN_YEAR} and {MAX_YEAR}."
        )));
    }
    let radius_km = validate_radius(params.radius_km)?;
    let year = params.year;

    let entries = state.datasets.year_entries(year).await?;
    if entries.is_empty() {
        return Err(ApiError::not_found(format!(
            "No datasets found for year {year}"
        )));
    }

    let datasets = &state.datasets;
    let days: Vec<YearDay> = stream::iter(entries)
        .map(|entry| async move {
            let path = entry.path.display().to_string();
            match datasets.load_entry(entry, radius_km).await {
                Ok(loaded) => Some(YearDay {
                    date: loaded.date,
                    source: loaded.source,
                    feature_collection: loaded.feature_collection,
                }),
                Err(e) => {
                    tracing::warn!(error = %e, %path, "skipping unreadable dataset");
                    None
                }
            }
        })
        .buffered(by_year_max_concurrency())
        .filter_map(|day| async move { day })
        .collect()
        .await;

    if days.is_empty() {
        return Err(ApiError::not_found(format!(
            "No valid datasets converted for year {year}"
        )));
    }

    Ok(Json(YearResponse {
        year,
        radius_km,
        days,
    }))
}

pub async fn predict_ice_extent(
    State(state): State<AppState>,
    query: Result<Query<PredictQuery>, QueryRejection>,
) -> Result<Json<IcePredictionResponse>, ApiError> {
    let params = query_params(query)?;
    let Some(date) = parse_iso_date(&params.date) else {
        return Err(ApiError::bad_request(INVALID_DATE_DETAIL));
    };
    if !(0.0..=1.0).contains(&params.thresh) {
        return Err(ApiError::bad_request("thresh must be between 0 and 1."));
    }
    let radius_km = validate_radius(params.radius_km)?;

    let prediction = match state
        .predictions
        .predict(date, params.thresh, radius_km)
        .await
    {
        Ok(prediction) => prediction,
        Err(e) => {
            state.observability.record_prediction_failure();
            return Err(e.into());
        }
    };
    state
        .observability
        .record_prediction_request(prediction.cache_hit);

    Ok(Json(IcePredictionResponse {
        date: params.date,
        radius_km,
        threshold: params.thresh,
        feature_collection: (*prediction.collection).clone(),
    }))
}
