mod countries;
mod email_verifications;
mod emails;
mod error;
mod password_resets;
mod passwords;
mod registrations;
mod sessions;

use axum::{Router, http::StatusCode, routing::get};
use serde::Serialize;
use std::sync::Arc;

use crate::db::{Database, Session, User};
use crate::mailer::Mailer;
use crate::password::MIN_PASSWORD_LENGTH;
use crate::token::TokenConfig;

pub use error::{ApiError, ResultExt, ValidationErrors};

/// Create the API router.
pub fn create_api_router(db: Database, tokens: Arc<TokenConfig>, mailer: Mailer) -> Router {
    let sessions_state = sessions::SessionsState {
        db: db.clone(),
        tokens: tokens.clone(),
    };

    let registrations_state = registrations::RegistrationsState {
        db: db.clone(),
        tokens: tokens.clone(),
        mailer: mailer.clone(),
    };

    let passwords_state = passwords::PasswordsState {
        db: db.clone(),
        tokens: tokens.clone(),
    };

    let emails_state = emails::EmailsState {
        db: db.clone(),
        tokens: tokens.clone(),
        mailer: mailer.clone(),
    };

    let email_verifications_state = email_verifications::EmailVerificationsState {
        db: db.clone(),
        tokens: tokens.clone(),
        mailer: mailer.clone(),
    };

    let password_resets_state = password_resets::PasswordResetsState {
        db: db.clone(),
        tokens: tokens.clone(),
        mailer,
    };

    let countries_state = countries::CountriesState { db, tokens };

    Router::new()
        .route("/up", get(health))
        .merge(sessions::router(sessions_state))
        .merge(registrations::router(registrations_state))
        .merge(passwords::router(passwords_state))
        .merge(emails::router(emails_state))
        .merge(email_verifications::router(email_verifications_state))
        .merge(password_resets::router(password_resets_state))
        .nest("/v1/countries", countries::router(countries_state))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

/// User representation exposed by the API. Internal row IDs stay internal;
/// the UUID is the external identity.
#[derive(Serialize)]
pub(crate) struct UserResponse {
    id: String,
    email: String,
    verified: bool,
    created_at: String,
    updated_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.uuid.clone(),
            email: user.email.clone(),
            verified: user.verified,
            created_at: user.created_at.clone(),
            updated_at: user.updated_at.clone(),
        }
    }
}

/// Session representation exposed by the API.
#[derive(Serialize)]
pub(crate) struct SessionResponse {
    id: String,
    user_agent: Option<String>,
    ip_address: Option<String>,
    created_at: String,
}

impl From<&Session> for SessionResponse {
    fn from(session: &Session) -> Self {
        Self {
            id: session.uuid.clone(),
            user_agent: session.user_agent.clone(),
            ip_address: session.ip_address.clone(),
            created_at: session.created_at.clone(),
        }
    }
}

/// Shared validation for a new password and its confirmation.
pub(crate) fn validate_new_password(
    password: &str,
    password_confirmation: &str,
    errors: &mut ValidationErrors,
) {
    if password.is_empty() {
        errors.add("password", "is required");
    } else if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.add(
            "password",
            format!("must be at least {} characters", MIN_PASSWORD_LENGTH),
        );
    }

    if password_confirmation.is_empty() {
        errors.add("password_confirmation", "is required");
    } else if password_confirmation != password {
        errors.add("password_confirmation", "does not match password");
    }
}
