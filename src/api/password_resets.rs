//! Forgot-password flow: reset request and token-driven password change.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use serde::Deserialize;
use std::sync::Arc;

use super::error::{ApiError, ResultExt, ValidationErrors};
use super::{UserResponse, validate_new_password};
use crate::db::Database;
use crate::mailer::{Mailer, Message};
use crate::password::{hash_password, verify_password};
use crate::token::{TokenConfig, TokenPurpose};

const LINK_INVALID: &str = "That password reset link is invalid";

#[derive(Clone)]
pub struct PasswordResetsState {
    pub db: Database,
    pub tokens: Arc<TokenConfig>,
    pub mailer: Mailer,
}

pub fn router(state: PasswordResetsState) -> Router {
    Router::new()
        .route(
            "/identity/password_reset",
            post(request_reset).patch(reset_password),
        )
        .with_state(state)
}

#[derive(Deserialize)]
struct RequestResetRequest {
    #[serde(default)]
    email: String,
}

/// Queue a password-reset message for a verified account. Unknown and
/// unverified addresses share one generic error; nothing else about the
/// account is revealed.
async fn request_reset(
    State(state): State<PasswordResetsState>,
    Json(payload): Json<RequestResetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .get_by_email(&payload.email)
        .await
        .db_err("Failed to look up user")?
        .filter(|user| user.verified)
        .ok_or_else(|| ApiError::bad_request("Account not found or not verified"))?;

    let token = state
        .tokens
        .issue_purpose_token(TokenPurpose::PasswordReset, &user)
        .map_err(|e| ApiError::signing_error("Failed to issue reset token", e))?;
    state.mailer.deliver_later(Message::PasswordReset {
        email: user.email.clone(),
        token,
    });

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct ResetPasswordRequest {
    #[serde(default)]
    sid: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    password_confirmation: String,
}

/// Redeem a password-reset token and set a new password. The token is the
/// proof of control, so no challenge is required. Changing the hash revokes
/// every session of the user; the first redemption invalidates the token for
/// good because its snapshot no longer matches.
async fn reset_password(
    State(state): State<PasswordResetsState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .find_by_token(&state.tokens, TokenPurpose::PasswordReset, &payload.sid)
        .await
        .db_err("Failed to redeem reset token")?
        .ok_or_else(|| ApiError::bad_request(LINK_INVALID))?;

    let mut errors = ValidationErrors::new();
    validate_new_password(&payload.password, &payload.password_confirmation, &mut errors);
    errors.into_result()?;

    // Setting the same password again changes nothing and revokes nothing.
    if verify_password(&payload.password, &user.password_hash) {
        return Ok(Json(UserResponse::from(&user)).into_response());
    }

    let password_hash = hash_password(&payload.password)
        .map_err(|e| ApiError::signing_error("Failed to hash password", e))?;
    state
        .db
        .users()
        .update_password_hash(user.id, &password_hash)
        .await
        .db_err("Failed to update password")?;

    // No current session in this flow: revoke everything.
    state
        .db
        .sessions()
        .delete_all_except(user.id, None)
        .await
        .db_err("Failed to revoke sessions")?;

    let user = state
        .db
        .users()
        .get_by_id(user.id)
        .await
        .db_err("Failed to load user")?
        .ok_or_else(|| ApiError::internal("User not found after update"))?;

    Ok(Json(UserResponse::from(&user)).into_response())
}
