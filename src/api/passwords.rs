//! Self-service password change.

use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::patch,
};
use serde::Deserialize;
use std::sync::Arc;

use super::error::{ApiError, ResultExt, ValidationErrors};
use super::{UserResponse, validate_new_password};
use crate::auth::Auth;
use crate::db::Database;
use crate::impl_has_auth_state;
use crate::password::{check_password_challenge, hash_password, verify_password};
use crate::token::TokenConfig;

#[derive(Clone)]
pub struct PasswordsState {
    pub db: Database,
    pub tokens: Arc<TokenConfig>,
}

impl_has_auth_state!(PasswordsState);

pub fn router(state: PasswordsState) -> Router {
    Router::new()
        .route("/password", patch(update_password))
        .with_state(state)
}

#[derive(Deserialize)]
struct UpdatePasswordRequest {
    #[serde(default)]
    password: String,
    #[serde(default)]
    password_confirmation: String,
    #[serde(default)]
    password_challenge: String,
}

/// Change the caller's password. The challenge gate must pass, and on an
/// actual hash change every other session of the user is revoked; the session
/// that made the request stays valid.
async fn update_password(
    State(state): State<PasswordsState>,
    Auth(current): Auth,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut errors = ValidationErrors::new();
    if let Err(e) = check_password_challenge(&current.user, &payload.password_challenge) {
        errors.add("password_challenge", e.message());
    }
    validate_new_password(&payload.password, &payload.password_confirmation, &mut errors);
    errors.into_result()?;

    // Resubmitting the current password leaves the hash untouched and does
    // not revoke anything.
    if verify_password(&payload.password, &current.user.password_hash) {
        return Ok(Json(UserResponse::from(&current.user)));
    }

    let password_hash = hash_password(&payload.password)
        .map_err(|e| ApiError::signing_error("Failed to hash password", e))?;
    state
        .db
        .users()
        .update_password_hash(current.user.id, &password_hash)
        .await
        .db_err("Failed to update password")?;

    state
        .db
        .sessions()
        .delete_all_except(current.user.id, Some(current.session.id))
        .await
        .db_err("Failed to revoke sessions")?;

    let user = state
        .db
        .users()
        .get_by_id(current.user.id)
        .await
        .db_err("Failed to load user")?
        .ok_or_else(|| ApiError::internal("User not found after update"))?;

    Ok(Json(UserResponse::from(&user)))
}
