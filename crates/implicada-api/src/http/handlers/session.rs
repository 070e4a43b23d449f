//! Session management endpoints: create, list, rename, history.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use implicada_types::chat::{Session, SessionOverview, Turn};

use crate::http::error::AppError;
use crate::http::extractors::auth::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenameSessionRequest {
    pub title: String,
}

/// POST /api/v1/sessions -- create a session explicitly.
pub async fn create_session(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<CreateSessionRequest>,
) -> Result<Json<Session>, AppError> {
    let title = body.title.filter(|t| !t.trim().is_empty());
    let session = state.chat_service.create_session(user.id, title).await?;
    Ok(Json(session))
}

/// GET /api/v1/sessions -- the caller's sessions, most recently active first.
pub async fn list_sessions(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<SessionOverview>>, AppError> {
    let sessions = state.chat_service.list_sessions(user.id).await?;
    Ok(Json(sessions))
}

/// PATCH /api/v1/sessions/{id} -- rename an owned session.
pub async fn rename_session(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(session_id): Path<Uuid>,
    Json(body): Json<RenameSessionRequest>,
) -> Result<Json<Session>, AppError> {
    if body.title.trim().is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }

    let renamed = state
        .chat_service
        .rename_session(user.id, session_id, body.title.trim())
        .await?;

    match renamed {
        Some(session) => Ok(Json(session)),
        None => Err(AppError::NotFound("Session not found".to_string())),
    }
}

/// GET /api/v1/sessions/{id}/messages -- chronological turn history.
pub async fn get_messages(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Vec<Turn>>, AppError> {
    let turns = state
        .chat_service
        .session_history(user.id, session_id)
        .await?;

    match turns {
        Some(turns) => Ok(Json(turns)),
        None => Err(AppError::NotFound("Session not found".to_string())),
    }
}
