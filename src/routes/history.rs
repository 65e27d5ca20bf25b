//! Chat transcript lookup for the student and doctor front ends.

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::instrument;

use crate::error::AppError;
use crate::state::AppState;
use crate::store::ChatRecord;

/// Handler for `GET /api/chat/history/{student_id}`
#[instrument(name = "chat::history", skip(state))]
pub async fn history(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<Json<ChatRecord>, AppError> {
    state
        .store
        .fetch_chat_record(&student_id)
        .await?
        .map(Json)
        .ok_or(AppError::HistoryNotFound(student_id))
}
