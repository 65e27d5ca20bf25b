//! Chat endpoint.
//!
//! Always answers 200 with `{response}`: validation problems and provider
//! failures are reported as fixed text, never as an error status.

use axum::{extract::State, Json};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::instrument;

use crate::context::build_prompt;
use crate::state::AppState;

/// Reply when the message is empty
pub const EMPTY_MESSAGE_REPLY: &str = "Vui lòng nhập thông tin sức khỏe của bạn.";

/// Reply when personalized chat is enabled and no student id was sent
pub const MISSING_STUDENT_REPLY: &str = "Thiếu thông tin sinh viên. Vui lòng đăng nhập lại.";

/// Request fields are read loosely: `null`, a missing key or a non-text value
/// is treated as absent, so any JSON object gets a text reply.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default, deserialize_with = "loose_text")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub student_id: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub student_name: Option<String>,
}

/// Strings pass through and numbers are rendered as text; anything else is `None`.
pub(crate) fn loose_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    pub response: String,
}

impl ChatResponse {
    fn text(response: impl Into<String>) -> Json<Self> {
        Json(Self {
            response: response.into(),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Handler for `POST /api/chat`
#[instrument(
    name = "chat::send",
    skip(state, request),
    fields(student_id = tracing::field::Empty)
)]
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let Some(message) = non_empty(request.message.as_deref()) else {
        return ChatResponse::text(EMPTY_MESSAGE_REPLY);
    };

    if !state.config.chat.personalized {
        return ChatResponse::text(state.llm.complete(message).await);
    }

    let Some(student_id) = non_empty(request.student_id.as_deref()) else {
        tracing::debug!("Chat request without student id");
        return ChatResponse::text(MISSING_STUDENT_REPLY);
    };
    tracing::Span::current().record("student_id", student_id);
    let student_name = non_empty(request.student_name.as_deref()).unwrap_or(student_id);

    let (history, health) = tokio::join!(
        state.store.get_conversation_history(student_id),
        state.store.get_student_health_data(student_id),
    );
    tracing::debug!(
        history = history.len(),
        snapshots = health.as_ref().map(|h| h.snapshots.len()).unwrap_or(0),
        "Loaded chat context"
    );

    let prompt = build_prompt(student_name, health.as_ref(), &history, message);

    match state.llm.try_complete(&prompt).await {
        Ok(reply) => {
            state
                .store
                .save_message_to_db(student_id, student_name, message, &reply)
                .await;
            ChatResponse::text(reply)
        }
        Err(e) => {
            tracing::error!(error = %e, "Error calling LLM provider");
            ChatResponse::text(e.fallback_reply())
        }
    }
}
