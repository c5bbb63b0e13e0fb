use sqlx::sqlite::SqlitePool;

use crate::token::{TokenConfig, TokenPurpose};

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub uuid: String,
    pub email: String,
    pub password_hash: String,
    pub verified: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    uuid: String,
    email: String,
    password_hash: String,
    verified: i32,
    created_at: String,
    updated_at: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            uuid: row.uuid,
            email: row.email,
            password_hash: row.password_hash,
            verified: row.verified != 0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Normalize an email for storage and lookup: trimmed, lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Check that an email has the shape `local@domain` with no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    !email.chars().any(|c| c.is_whitespace()) && !domain.contains('@')
}

const USER_COLUMNS: &str = "id, uuid, email, password_hash, verified, created_at, updated_at";

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user. The email must already be normalized and the
    /// password hashed. Returns the user ID.
    pub async fn create(
        &self,
        uuid: &str,
        email: &str,
        password_hash: &str,
        verified: bool,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO users (uuid, email, password_hash, verified) VALUES (?, ?, ?, ?)",
        )
        .bind(uuid)
        .bind(email)
        .bind(password_hash)
        .bind(verified as i32)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(User::from))
    }

    /// Get a user by UUID.
    pub async fn get_by_uuid(&self, uuid: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE uuid = ?", USER_COLUMNS))
                .bind(uuid)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(User::from))
    }

    /// Get a user by email. The lookup is case-insensitive and ignores
    /// surrounding whitespace.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))
                .bind(normalize_email(email))
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(User::from))
    }

    /// Check whether an email is already taken, optionally excluding one user
    /// (for email changes on an existing record).
    pub async fn email_taken(
        &self,
        email: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let count: (i32,) = match exclude_id {
            Some(id) => {
                sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ? AND id != ?")
                    .bind(normalize_email(email))
                    .bind(id)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?")
                    .bind(normalize_email(email))
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(count.0 > 0)
    }

    /// Change a user's email. The address becomes unverified until a new
    /// email-verification token is redeemed.
    pub async fn update_email(&self, id: i64, email: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET email = ?, verified = 0, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(email)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace a user's password hash.
    pub async fn update_password_hash(
        &self,
        id: i64,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(password_hash)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set the verified flag.
    pub async fn set_verified(&self, id: i64, verified: bool) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET verified = ?, updated_at = datetime('now') WHERE id = ?")
                .bind(verified as i32)
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a user by ID. Sessions are removed by the foreign key cascade.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Redeem a purpose-bound token: verify it, load the referenced user, and
    /// recompute the state snapshot against the current record. Every failure
    /// (signature, expiry, purpose, missing user, stale snapshot) is reported
    /// uniformly as `None`.
    pub async fn find_by_token(
        &self,
        tokens: &TokenConfig,
        purpose: TokenPurpose,
        token: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let Ok(claims) = tokens.verify_purpose_token(purpose, token) else {
            return Ok(None);
        };
        let Some(user) = self.get_by_uuid(&claims.sub).await? else {
            return Ok(None);
        };
        if purpose.snapshot(&user) != claims.snap {
            return Ok(None);
        }
        Ok(Some(user))
    }
}
