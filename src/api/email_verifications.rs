//! Email verification: token redemption and re-delivery.

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use std::sync::Arc;

use super::error::{ApiError, ResultExt};
use crate::auth::Auth;
use crate::db::Database;
use crate::impl_has_auth_state;
use crate::mailer::{Mailer, Message};
use crate::token::{TokenConfig, TokenPurpose};

const LINK_INVALID: &str = "That email verification link is invalid";

#[derive(Clone)]
pub struct EmailVerificationsState {
    pub db: Database,
    pub tokens: Arc<TokenConfig>,
    pub mailer: Mailer,
}

impl_has_auth_state!(EmailVerificationsState);

pub fn router(state: EmailVerificationsState) -> Router {
    Router::new()
        .route(
            "/identity/email_verification",
            get(verify_email).post(resend_verification),
        )
        .with_state(state)
}

#[derive(Deserialize)]
struct VerifyEmailQuery {
    #[serde(default)]
    sid: String,
}

/// Redeem an email-verification token. Idempotent: verifying an
/// already-verified account succeeds again. Every failure mode (signature,
/// expiry, wrong purpose, stale email, deleted user) yields the same generic
/// error.
async fn verify_email(
    State(state): State<EmailVerificationsState>,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .find_by_token(&state.tokens, TokenPurpose::EmailVerification, &query.sid)
        .await
        .db_err("Failed to redeem verification token")?
        .ok_or_else(|| ApiError::bad_request(LINK_INVALID))?;

    state
        .db
        .users()
        .set_verified(user.id, true)
        .await
        .db_err("Failed to mark user verified")?;

    Ok(StatusCode::NO_CONTENT)
}

/// Queue a fresh verification message for the authenticated user.
async fn resend_verification(
    State(state): State<EmailVerificationsState>,
    Auth(current): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let token = state
        .tokens
        .issue_purpose_token(TokenPurpose::EmailVerification, &current.user)
        .map_err(|e| ApiError::signing_error("Failed to issue verification token", e))?;
    state.mailer.deliver_later(Message::EmailVerification {
        email: current.user.email.clone(),
        token,
    });

    Ok(StatusCode::NO_CONTENT)
}
