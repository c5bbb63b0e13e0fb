//! Sign-in and session management endpoints.
//!
//! - POST `/sign_in` - Authenticate credentials and create a session
//! - GET `/sessions` - List the caller's sessions, newest first
//! - GET `/sessions/{id}` - Show one of the caller's sessions
//! - DELETE `/sessions/{id}` - Sign out a session

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{ApiError, ResultExt};
use super::{SessionResponse, UserResponse};
use crate::auth::{Auth, RequestMeta};
use crate::db::Database;
use crate::impl_has_auth_state;
use crate::password::verify_password;
use crate::token::TokenConfig;

#[derive(Clone)]
pub struct SessionsState {
    pub db: Database,
    pub tokens: Arc<TokenConfig>,
}

impl_has_auth_state!(SessionsState);

pub fn router(state: SessionsState) -> Router {
    Router::new()
        .route("/sign_in", post(sign_in))
        .route("/sessions", get(list_sessions))
        .route("/sessions/{id}", get(show_session).delete(destroy_session))
        .with_state(state)
}

#[derive(Deserialize)]
struct SignInRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
struct SignInResponse {
    token: String,
    session: SessionResponse,
    user: UserResponse,
}

/// Authenticate credentials and create a session. The response carries the
/// bearer value in both the body and the X-Session-Token header. Failures are
/// one generic unauthorized outcome: unknown email and wrong password are
/// indistinguishable.
async fn sign_in(
    State(state): State<SessionsState>,
    meta: RequestMeta,
    Json(payload): Json<SignInRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .get_by_email(&payload.email)
        .await
        .db_err("Failed to look up user")?
        .filter(|user| verify_password(&payload.password, &user.password_hash))
        .ok_or_else(|| ApiError::unauthorized("Failed to authenticate"))?;

    let uuid = uuid::Uuid::new_v4().to_string();
    state
        .db
        .sessions()
        .create(
            &uuid,
            user.id,
            meta.user_agent.as_deref(),
            meta.ip_address.as_deref(),
        )
        .await
        .db_err("Failed to create session")?;

    let session = state
        .db
        .sessions()
        .get_by_uuid(&uuid)
        .await
        .db_err("Failed to load session")?
        .ok_or_else(|| ApiError::internal("Session not found after creation"))?;

    let token = state
        .tokens
        .sign_session_token(&uuid)
        .map_err(|e| ApiError::signing_error("Failed to sign session token", e))?;

    Ok((
        [("x-session-token", token.clone())],
        Json(SignInResponse {
            token,
            session: SessionResponse::from(&session),
            user: UserResponse::from(&user),
        }),
    ))
}

/// List the caller's sessions, newest first.
async fn list_sessions(
    State(state): State<SessionsState>,
    Auth(current): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = state
        .db
        .sessions()
        .list_for_user(current.user.id)
        .await
        .db_err("Failed to list sessions")?;

    Ok(Json(
        sessions.iter().map(SessionResponse::from).collect::<Vec<_>>(),
    ))
}

/// Show one of the caller's sessions. A session owned by someone else is
/// reported as not found, never as forbidden.
async fn show_session(
    State(state): State<SessionsState>,
    Auth(current): Auth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .db
        .sessions()
        .get_for_user(current.user.id, &id)
        .await
        .db_err("Failed to get session")?
        .ok_or_else(|| ApiError::not_found("Not found"))?;

    Ok(Json(SessionResponse::from(&session)))
}

/// Sign out a session. Its bearer value stops resolving immediately.
async fn destroy_session(
    State(state): State<SessionsState>,
    Auth(current): Auth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .db
        .sessions()
        .get_for_user(current.user.id, &id)
        .await
        .db_err("Failed to get session")?
        .ok_or_else(|| ApiError::not_found("Not found"))?;

    state
        .db
        .sessions()
        .delete(session.id)
        .await
        .db_err("Failed to delete session")?;

    Ok(StatusCode::NO_CONTENT)
}
