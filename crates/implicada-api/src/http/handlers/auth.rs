//! Registration, login, and current-user endpoints.
//!
//! Password hashing is delegated to argon2; issued tokens are opaque and
//! stored SHA-256 hashed. Token verification lives in the `CurrentUser`
//! extractor.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use implicada_types::error::{AuthError, RepositoryError};
use implicada_types::user::User;

use crate::http::error::AppError;
use crate::http::extractors::auth::{generate_token, hash_token, CurrentUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserView,
}

#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// POST /api/v1/auth/register -- create a user and issue a token.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if body.name.trim().is_empty() || body.email.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::Validation(
            "Name, email and password are required".to_string(),
        ));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(body.password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?
        .to_string();

    let user = User {
        id: Uuid::now_v7(),
        name: body.name.trim().to_string(),
        email: body.email.trim().to_lowercase(),
        password_hash: Some(password_hash),
        created_at: Utc::now(),
    };

    let created = match state.user_repo.create(&user).await {
        Ok(user) => user,
        Err(RepositoryError::Conflict(_)) => {
            return Err(AuthError::EmailConflict(user.email).into());
        }
        Err(e) => return Err(e.into()),
    };

    let token = issue_token(&state, &created.id).await?;
    Ok(Json(AuthResponse {
        token,
        user: view(created),
    }))
}

/// POST /api/v1/auth/login -- verify credentials and issue a token.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    let user = state
        .user_repo
        .find_by_email(&body.email.trim().to_lowercase())
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    let Some(ref stored) = user.password_hash else {
        // Externally provisioned account with no local password.
        return Err(AuthError::InvalidCredentials.into());
    };

    let parsed = PasswordHash::new(stored)
        .map_err(|e| AppError::Internal(format!("stored hash unreadable: {e}")))?;
    Argon2::default()
        .verify_password(body.password.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredentials)?;

    let token = issue_token(&state, &user.id).await?;
    Ok(Json(AuthResponse {
        token,
        user: view(user),
    }))
}

/// GET /api/v1/auth/me -- the authenticated user's profile.
pub async fn me(user: CurrentUser) -> Json<UserView> {
    Json(UserView {
        id: user.id,
        name: user.name,
        email: user.email,
    })
}

async fn issue_token(state: &AppState, user_id: &Uuid) -> Result<String, AppError> {
    let token = generate_token();
    state
        .user_repo
        .insert_token(user_id, &hash_token(&token))
        .await?;
    Ok(token)
}

fn view(user: User) -> UserView {
    UserView {
        id: user.id,
        name: user.name,
        email: user.email,
    }
}
