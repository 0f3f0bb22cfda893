use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use icewatch_shared::{ChatMessageRequest, ChatMessageResponse};

use crate::error::ApiError;
use crate::services::chat::dataset_context;
use crate::state::AppState;

pub async fn post_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatMessageRequest>, JsonRejection>,
) -> Result<Json<ChatMessageResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let message = request.message.trim();
    if message.is_empty() {
        return Err(ApiError::bad_request("Message cannot be empty."));
    }
    state.observability.record_chat_request();

    let dates = match state.datasets.available_dates().await {
        Ok(dates) => Some(dates),
        Err(e) => {
            tracing::warn!(error = %e, "dataset scan failed while building chat context");
            None
        }
    };
    let context = dataset_context(dates.as_ref().map(|dates| dates.as_slice()));

    Ok(Json(state.chat.reply(message, &context).await))
}
