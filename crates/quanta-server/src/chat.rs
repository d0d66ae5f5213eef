use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde_json::Value;

use quanta_core::ChatRequest;
use quanta_runtime::ChatResponse;

use crate::service::{ApiError, AppState};

/// `POST /chat`
///
/// Input is validated before the provider is consulted, so a bad body never
/// costs a model call.
pub async fn chat(
    State(st): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(body) = payload?;
    let request = ChatRequest::parse(&body)?;

    let Some(chat) = st.chat.clone() else {
        return Err(ApiError::ProviderUnconfigured);
    };

    tracing::info!(
        session_id = request.session_id().unwrap_or("new"),
        chars = request.message().chars().count(),
        "processing chat message"
    );

    chat.chat(&request)
        .await
        .map(Json)
        .map_err(|e| st.chat_error(e))
}
