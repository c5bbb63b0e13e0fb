use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct SessionStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: i64,
    pub uuid: String,
    pub user_id: i64,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: String,
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: i64,
    uuid: String,
    user_id: i64,
    user_agent: Option<String>,
    ip_address: Option<String>,
    created_at: String,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Self {
            id: row.id,
            uuid: row.uuid,
            user_id: row.user_id,
            user_agent: row.user_agent,
            ip_address: row.ip_address,
            created_at: row.created_at,
        }
    }
}

const SESSION_COLUMNS: &str = "id, uuid, user_id, user_agent, ip_address, created_at";

impl SessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a session for a user, capturing the requester's user agent and
    /// IP at creation time. Returns the session ID.
    pub async fn create(
        &self,
        uuid: &str,
        user_id: i64,
        user_agent: Option<&str>,
        ip_address: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO sessions (uuid, user_id, user_agent, ip_address) VALUES (?, ?, ?, ?)",
        )
        .bind(uuid)
        .bind(user_id)
        .bind(user_agent)
        .bind(ip_address)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a session by UUID.
    pub async fn get_by_uuid(&self, uuid: &str) -> Result<Option<Session>, sqlx::Error> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM sessions WHERE uuid = ?",
            SESSION_COLUMNS
        ))
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Session::from))
    }

    /// Get a session by UUID scoped to its owner. A session belonging to a
    /// different user is indistinguishable from one that does not exist.
    pub async fn get_for_user(
        &self,
        user_id: i64,
        uuid: &str,
    ) -> Result<Option<Session>, sqlx::Error> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM sessions WHERE uuid = ? AND user_id = ?",
            SESSION_COLUMNS
        ))
        .bind(uuid)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Session::from))
    }

    /// List a user's sessions, newest first.
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Session>, sqlx::Error> {
        let rows: Vec<SessionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM sessions WHERE user_id = ? ORDER BY created_at DESC, id DESC",
            SESSION_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Session::from).collect())
    }

    /// Delete a session by ID.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Revocation cascade: delete every session belonging to a user except
    /// the one making the request, if any. A single DELETE statement, so a
    /// concurrent resolve sees either the pre- or post-cascade set.
    pub async fn delete_all_except(
        &self,
        user_id: i64,
        keep: Option<i64>,
    ) -> Result<u64, sqlx::Error> {
        let result = match keep {
            Some(id) => {
                sqlx::query("DELETE FROM sessions WHERE user_id = ? AND id != ?")
                    .bind(user_id)
                    .bind(id)
                    .execute(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("DELETE FROM sessions WHERE user_id = ?")
                    .bind(user_id)
                    .execute(&self.pool)
                    .await?
            }
        };
        Ok(result.rows_affected())
    }
}
