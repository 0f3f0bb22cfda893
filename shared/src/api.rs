use serde::{Deserialize, Serialize};

use crate::geojson::FeatureCollection;

/// Historical ice extent for one dataset date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IceExtentResponse {
    pub date: String,
    pub source: String,
    pub radius_km: f64,
    pub feature_collection: FeatureCollection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableDatesResponse {
    pub count: usize,
    /// ISO `YYYY-MM-DD`, ascending.
    pub dates: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearDay {
    pub date: String,
    pub source: String,
    pub feature_collection: FeatureCollection,
}

/// Every dataset day converted for a calendar year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearResponse {
    pub year: i32,
    pub radius_km: f64,
    pub days: Vec<YearDay>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcePredictionResponse {
    pub date: String,
    pub radius_km: f64,
    pub threshold: f64,
    pub feature_collection: FeatureCollection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageRequest {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessageResponse {
    pub reply: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Two route endpoints as `[lon, lat]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub start: [f64; 2],
    pub end: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResponse {
    pub path: Vec<[f64; 2]>,
    pub distance_km: f64,
}

/// Error body returned by every failing API route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub detail: String,
}
