//! Rule-based assessment endpoint. Works without the LLM provider or the store.

use axum::Json;
use serde::Deserialize;
use tracing::instrument;

use super::chat::{loose_text, ChatResponse, EMPTY_MESSAGE_REPLY};
use crate::assessment::analyze_health_info;

#[derive(Debug, Deserialize)]
pub struct AssessRequest {
    #[serde(default, deserialize_with = "loose_text")]
    pub message: Option<String>,
}

/// Handler for `POST /api/assess`
#[instrument(name = "assess::run", skip_all)]
pub async fn assess(Json(request): Json<AssessRequest>) -> Json<ChatResponse> {
    let response = match request.message.as_deref().map(str::trim) {
        Some(message) if !message.is_empty() => analyze_health_info(message),
        _ => EMPTY_MESSAGE_REPLY.to_string(),
    };
    Json(ChatResponse { response })
}
