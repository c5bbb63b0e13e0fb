//! Sign-up endpoint.

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
use crate::db::{Database, is_valid_email, normalize_email};
use crate::mailer::{Mailer, Message};
use crate::password::hash_password;
use crate::token::{TokenConfig, TokenPurpose};

#[derive(Clone)]
pub struct RegistrationsState {
    pub db: Database,
    pub tokens: Arc<TokenConfig>,
    pub mailer: Mailer,
}

pub fn router(state: RegistrationsState) -> Router {
    Router::new()
        .route("/sign_up", post(sign_up))
        .with_state(state)
}

#[derive(Deserialize)]
struct SignUpRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    password_confirmation: String,
}

/// Register a new account. The account starts verified; a verification
/// message for the address is still queued so a mistyped email surfaces
/// quickly.
async fn sign_up(
    State(state): State<RegistrationsState>,
    Json(payload): Json<SignUpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&payload.email);

    let mut errors = ValidationErrors::new();
    if email.is_empty() {
        errors.add("email", "is required");
    } else if !is_valid_email(&email) {
        errors.add("email", "is invalid");
    } else if state
        .db
        .users()
        .email_taken(&email, None)
        .await
        .db_err("Failed to check email availability")?
    {
        errors.add("email", "is already taken");
    }
    validate_new_password(&payload.password, &payload.password_confirmation, &mut errors);
    errors.into_result()?;

    let password_hash = hash_password(&payload.password)
        .map_err(|e| ApiError::signing_error("Failed to hash password", e))?;

    let uuid = uuid::Uuid::new_v4().to_string();
    state
        .db
        .users()
        .create(&uuid, &email, &password_hash, true)
        .await
        .db_err("Failed to create user")?;

    let user = state
        .db
        .users()
        .get_by_uuid(&uuid)
        .await
        .db_err("Failed to load user")?
        .ok_or_else(|| ApiError::internal("User not found after creation"))?;

    let token = state
        .tokens
        .issue_purpose_token(TokenPurpose::EmailVerification, &user)
        .map_err(|e| ApiError::signing_error("Failed to issue verification token", e))?;
    state.mailer.deliver_later(Message::EmailVerification {
        email: user.email.clone(),
        token,
    });

    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}
