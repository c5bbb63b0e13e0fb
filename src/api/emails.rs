//! Email change endpoint.

use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::patch,
};
use serde::Deserialize;
use std::sync::Arc;

use super::error::{ApiError, ResultExt, ValidationErrors};
use super::UserResponse;
use crate::auth::Auth;
use crate::db::{Database, is_valid_email, normalize_email};
use crate::impl_has_auth_state;
use crate::mailer::{Mailer, Message};
use crate::password::check_password_challenge;
use crate::token::{TokenConfig, TokenPurpose};

#[derive(Clone)]
pub struct EmailsState {
    pub db: Database,
    pub tokens: Arc<TokenConfig>,
    pub mailer: Mailer,
}

impl_has_auth_state!(EmailsState);

pub fn router(state: EmailsState) -> Router {
    Router::new()
        .route("/identity/email", patch(update_email))
        .with_state(state)
}

#[derive(Deserialize)]
struct UpdateEmailRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password_challenge: String,
}

/// Change the caller's email. A blank address short-circuits before the
/// challenge gate is consulted; an unchanged address is a no-op. An actual
/// change requires the challenge, marks the account unverified, and queues a
/// fresh verification message.
async fn update_email(
    State(state): State<EmailsState>,
    Auth(current): Auth,
    Json(payload): Json<UpdateEmailRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&payload.email);

    if email.is_empty() {
        let mut errors = ValidationErrors::new();
        errors.add("email", "is required");
        return Err(ApiError::Validation(errors));
    }

    if email == current.user.email {
        return Ok(Json(UserResponse::from(&current.user)));
    }

    let mut errors = ValidationErrors::new();
    if let Err(e) = check_password_challenge(&current.user, &payload.password_challenge) {
        errors.add("password_challenge", e.message());
    }
    if !is_valid_email(&email) {
        errors.add("email", "is invalid");
    } else if state
        .db
        .users()
        .email_taken(&email, Some(current.user.id))
        .await
        .db_err("Failed to check email availability")?
    {
        errors.add("email", "is already taken");
    }
    errors.into_result()?;

    state
        .db
        .users()
        .update_email(current.user.id, &email)
        .await
        .db_err("Failed to update email")?;

    let user = state
        .db
        .users()
        .get_by_id(current.user.id)
        .await
        .db_err("Failed to load user")?
        .ok_or_else(|| ApiError::internal("User not found after update"))?;

    let token = state
        .tokens
        .issue_purpose_token(TokenPurpose::EmailVerification, &user)
        .map_err(|e| ApiError::signing_error("Failed to issue verification token", e))?;
    state.mailer.deliver_later(Message::EmailVerification {
        email: user.email.clone(),
        token,
    });

    Ok(Json(UserResponse::from(&user)))
}
