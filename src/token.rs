//! Signed token generation and validation.
//!
//! Two token families share the process-wide signing secret:
//!
//! - Session bearer tokens: a signed representation of a session's UUID. They
//!   carry no expiry; a bearer is valid for exactly as long as its session row
//!   exists, so deleting the row invalidates every bearer derived from it.
//! - Purpose-bound tokens: short-lived, self-invalidating tokens for
//!   out-of-band flows (email verification, password reset). They embed a
//!   snapshot of mutable user state at issuance; redemption recomputes the
//!   snapshot from the current record, so changing the bound state permanently
//!   invalidates every outstanding token without a revocation store.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::db::User;

/// Email-verification token duration: 2 days.
pub const EMAIL_VERIFICATION_TOKEN_DURATION_SECS: u64 = 2 * 24 * 60 * 60;

/// Password-reset token duration: 20 minutes.
pub const PASSWORD_RESET_TOKEN_DURATION_SECS: u64 = 20 * 60;

/// Length of the password-hash suffix embedded in password-reset tokens.
const PASSWORD_HASH_SNAPSHOT_LEN: usize = 10;

/// The out-of-band flow a purpose-bound token belongs to. The purpose tag is
/// part of the signed payload; a token minted for one flow is never accepted
/// by the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    EmailVerification,
    PasswordReset,
}

impl TokenPurpose {
    /// Validity window measured from issuance.
    pub fn duration_secs(self) -> u64 {
        match self {
            TokenPurpose::EmailVerification => EMAIL_VERIFICATION_TOKEN_DURATION_SECS,
            TokenPurpose::PasswordReset => PASSWORD_RESET_TOKEN_DURATION_SECS,
        }
    }

    /// The fragment of mutable user state a token of this purpose is bound
    /// to. Exhaustive by construction: a new purpose forces an explicit
    /// snapshot decision here.
    pub fn snapshot(self, user: &User) -> String {
        match self {
            TokenPurpose::EmailVerification => user.email.clone(),
            TokenPurpose::PasswordReset => {
                let hash = user.password_hash.as_str();
                let start = hash.len().saturating_sub(PASSWORD_HASH_SNAPSHOT_LEN);
                hash[start..].to_string()
            }
        }
    }
}

/// Claims for session bearer tokens. No expiry: validity derives from the
/// signature and from the session row still existing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Session UUID
    pub sid: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
}

/// Claims for purpose-bound tokens. The signature covers all fields jointly,
/// so no field can be altered independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurposeClaims {
    /// Subject (user UUID)
    pub sub: String,
    /// Flow this token was minted for
    pub purpose: TokenPurpose,
    /// State snapshot at issuance
    pub snap: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Configuration for token operations, constructed once at startup from the
/// signing secret and injected where needed.
#[derive(Clone)]
pub struct TokenConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenConfig {
    /// Create a new token configuration with the given secret.
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Sign a session UUID into a bearer token.
    pub fn sign_session_token(&self, session_uuid: &str) -> Result<String, TokenError> {
        let claims = SessionClaims {
            sid: session_uuid.to_string(),
            iat: unix_now()?,
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(TokenError::Encoding)
    }

    /// Verify a bearer token and return the session UUID it names.
    /// Expiry is not checked; session lifetime is the row's lifetime.
    pub fn verify_session_token(&self, token: &str) -> Result<String, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let token_data =
            jsonwebtoken::decode::<SessionClaims>(token, &self.decoding_key, &validation)
                .map_err(|_| TokenError::Invalid)?;

        Ok(token_data.claims.sid)
    }

    /// Issue a purpose-bound token for a user, snapshotting the state the
    /// purpose binds to.
    pub fn issue_purpose_token(
        &self,
        purpose: TokenPurpose,
        user: &User,
    ) -> Result<String, TokenError> {
        let now = unix_now()?;
        let claims = PurposeClaims {
            sub: user.uuid.clone(),
            purpose,
            snap: purpose.snapshot(user),
            iat: now,
            exp: now + purpose.duration_secs(),
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(TokenError::Encoding)
    }

    /// Verify a purpose-bound token's signature, expiry, and purpose tag.
    /// The snapshot check against the current user record happens at
    /// redemption (`UserStore::find_by_token`); every failure collapses into
    /// `TokenError::Invalid` so callers cannot leak which check failed.
    pub fn verify_purpose_token(
        &self,
        purpose: TokenPurpose,
        token: &str,
    ) -> Result<PurposeClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let token_data =
            jsonwebtoken::decode::<PurposeClaims>(token, &self.decoding_key, &validation)
                .map_err(|_| TokenError::Invalid)?;

        if token_data.claims.purpose != purpose {
            return Err(TokenError::Invalid);
        }

        Ok(token_data.claims)
    }
}

fn unix_now() -> Result<u64, TokenError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| TokenError::TimeError)
}

/// Errors that can occur during token operations.
#[derive(Debug)]
pub enum TokenError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// System time error
    TimeError,
    /// The token failed verification. Deliberately carries no detail.
    Invalid,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            TokenError::TimeError => write!(f, "System time error"),
            TokenError::Invalid => write!(f, "Invalid token"),
        }
    }
}

impl std::error::Error for TokenError {}
