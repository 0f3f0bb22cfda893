use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use icewatch_shared::ApiErrorBody;

use crate::services::datasets::DatasetError;
use crate::services::prediction::PredictionError;

/// Handler error rendered as `{"detail": ...}` with a matching status.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            detail: detail.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, detail = %self.detail, "request failed");
        }
        (self.status, Json(ApiErrorBody { detail: self.detail })).into_response()
    }
}

impl From<DatasetError> for ApiError {
    fn from(error: DatasetError) -> Self {
        match error {
            DatasetError::InvalidDate => Self::bad_request(error.to_string()),
            DatasetError::NotFound { .. } => Self::not_found(error.to_string()),
            _ => Self::internal(error.to_string()),
        }
    }
}

impl From<PredictionError> for ApiError {
    fn from(error: PredictionError) -> Self {
        match error {
            PredictionError::InvalidDate(_) => Self::bad_request(error.to_string()),
            _ => Self::internal(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_errors_map_to_statuses() {
        assert_eq!(
            ApiError::from(DatasetError::InvalidDate).status,
            StatusCode::BAD_REQUEST
        );
        let missing = ApiError::from(DatasetError::NotFound {
            date: "2024-01-02".to_string(),
            root: "datasets".to_string(),
        });
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
        assert_eq!(missing.detail, "No dataset found for 2024-01-02 under datasets");
    }

    #[test]
    fn model_errors_are_internal() {
        let error = ApiError::from(PredictionError::ModelMissing("m.json".to_string()));
        assert_eq!(error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.detail, "Model file not found at m.json");
    }
}
