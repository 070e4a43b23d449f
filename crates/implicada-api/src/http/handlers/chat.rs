//! The chat turn endpoint.
//!
//! POST /api/v1/chat -- runs the full response-shaping pipeline for one
//! user message and returns the shaped reply, the session id, the
//! resolved addressing mode, and any follow-up questions. The shortcut
//! path returns the same shape with no follow-ups.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use implicada_core::chat::service::ChatInput;
use implicada_types::reply::AddressingMode;

use crate::http::error::AppError;
use crate::http::extractors::auth::CurrentUser;
use crate::state::AppState;

/// Request body for the chat endpoint.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// The user message.
    pub message: String,
    /// Existing session to continue; a fresh one is created when absent
    /// or not owned by the caller.
    pub session_id: Option<Uuid>,
    /// Explicit addressing override (detection runs when absent).
    pub addressing: Option<String>,
    /// Whether the secondary follow-up generation call may run.
    #[serde(default = "default_want_followups")]
    pub want_followups: bool,
}

fn default_want_followups() -> bool {
    true
}

/// Response body for the chat endpoint.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub session_id: Uuid,
    pub addressing_mode: AddressingMode,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub followups: Vec<String>,
}

/// POST /api/v1/chat -- one shaped conversation turn.
pub async fn chat(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let outcome = state
        .chat_service
        .process_chat(
            user.id,
            ChatInput {
                message: body.message,
                session_id: body.session_id,
                addressing_override: body.addressing,
                want_followups: body.want_followups,
            },
        )
        .await?;

    Ok(Json(ChatResponse {
        reply: outcome.reply,
        session_id: outcome.session_id,
        addressing_mode: outcome.addressing_mode,
        followups: outcome.followups,
    }))
}
