//! Axum extractors for authentication and request metadata.

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use std::net::SocketAddr;

use super::errors::{AuthError, AuthErrorKind};
use super::state::HasAuthState;
use crate::db::{Session, User};

/// The request's authenticated context: the resolved session and its owning
/// user. Created fresh per request by the `Auth` extractor and passed
/// explicitly into handlers; never shared across requests.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub session: Session,
    pub user: User,
}

/// Extract the bearer value from the Authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?;
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Extractor for endpoints that require authentication. Verifies the bearer
/// value's signature, decodes the session UUID it names, and checks the
/// session row still exists — a deleted row (sign-out or revocation cascade)
/// is the revocation signal.
pub struct Auth(pub CurrentSession);

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthState + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AuthError::new(AuthErrorKind::NotAuthenticated))?;

        let sid = state
            .tokens()
            .verify_session_token(token)
            .map_err(|_| AuthError::new(AuthErrorKind::InvalidToken))?;

        let session = state
            .db()
            .sessions()
            .get_by_uuid(&sid)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to look up session");
                AuthError::new(AuthErrorKind::DatabaseError)
            })?
            .ok_or_else(|| AuthError::new(AuthErrorKind::SessionRevoked))?;

        let user = state
            .db()
            .users()
            .get_by_id(session.user_id)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to look up session user");
                AuthError::new(AuthErrorKind::DatabaseError)
            })?
            .ok_or_else(|| AuthError::new(AuthErrorKind::UserMissing))?;

        Ok(Auth(CurrentSession { session, user }))
    }
}

/// Request metadata captured at session creation: the requester's user agent
/// and client IP. Never fails; absent values stay absent.
pub struct RequestMeta {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl<S> FromRequestParts<S> for RequestMeta
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(RequestMeta {
            user_agent,
            ip_address: extract_client_ip(parts),
        })
    }
}

/// Extract the client IP address from request parts.
/// Checks X-Forwarded-For first (reverse proxy), then the socket address.
fn extract_client_ip(parts: &Parts) -> Option<String> {
    if let Some(forwarded_for) = parts.headers.get("x-forwarded-for") {
        if let Ok(value) = forwarded_for.to_str() {
            if let Some(first_ip) = value.split(',').next() {
                let ip = first_ip.trim();
                if !ip.is_empty() {
                    return Some(ip.to_string());
                }
            }
        }
    }

    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
}
