//! Password hashing and the password challenge gate.

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

use crate::db::User;

/// Minimum plaintext password length, checked before hashing.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash a plaintext password into an argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(PasswordError::Hash)?;
    Ok(hash.to_string())
}

/// Verify a plaintext password against a stored PHC string.
/// An unparseable hash verifies as false rather than erroring; the stored
/// value is not user input.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(password_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Why the password challenge gate rejected a request.
/// The two reasons surface as distinct messages on the challenge field,
/// unlike token redemption which reports one undifferentiated error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeError {
    /// No challenge supplied.
    Required,
    /// Challenge supplied but does not match the current password.
    Invalid,
}

impl ChallengeError {
    pub fn message(&self) -> &'static str {
        match self {
            ChallengeError::Required => "is required",
            ChallengeError::Invalid => "is incorrect",
        }
    }
}

/// Gate for sensitive mutations: the caller must re-enter the current
/// password before an email or password change is applied.
pub fn check_password_challenge(user: &User, supplied: &str) -> Result<(), ChallengeError> {
    if supplied.trim().is_empty() {
        return Err(ChallengeError::Required);
    }
    if !verify_password(supplied, &user.password_hash) {
        return Err(ChallengeError::Invalid);
    }
    Ok(())
}

/// Errors from the hashing primitive itself. Verification failures are not
/// errors; this only covers being unable to produce a hash.
#[derive(Debug)]
pub enum PasswordError {
    Hash(argon2::password_hash::Error),
}

impl std::fmt::Display for PasswordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PasswordError::Hash(e) => write!(f, "Failed to hash password: {}", e),
        }
    }
}

impl std::error::Error for PasswordError {}
