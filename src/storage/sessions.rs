use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::traits::StorageResult;

/// Persisted session row. Only sessions that have been bound to a user are
/// ever written; an anonymous session lives in memory for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub token: String,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Storage backend for sessions.
///
/// `save` and `delete` are single-record writes; their atomicity is what
/// `authenticate` and `destroy` rely on.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load a session by token, expired or not
    async fn load(&self, token: &str) -> StorageResult<Option<SessionRecord>>;

    /// Insert or replace a session
    async fn save(&self, record: &SessionRecord) -> StorageResult<()>;

    /// Move a session's expiry. A missing record is not an error.
    async fn touch(&self, token: &str, expires_at: DateTime<Utc>) -> StorageResult<()>;

    /// Delete a session. A missing record is not an error.
    async fn delete(&self, token: &str) -> StorageResult<()>;

    /// Delete every session that expired at or before `now`
    async fn purge_expired(&self, now: DateTime<Utc>) -> StorageResult<u64>;
}

/// PostgreSQL implementation of SessionStore
pub struct PostgresSessionStore {
    pool: PgPool,
}

impl PostgresSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Initialize database schema for sessions. Requires the users table.
    pub async fn initialize(&self) -> StorageResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                user_id UUID REFERENCES users(id) ON DELETE CASCADE,
                created_at TIMESTAMPTZ NOT NULL,
                expires_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn load(&self, token: &str) -> StorageResult<Option<SessionRecord>> {
        let row = sqlx::query(
            r#"
            SELECT token, user_id, created_at, expires_at
            FROM sessions
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(SessionRecord {
            token: row.try_get("token")?,
            user_id: row.try_get("user_id")?,
            created_at: row.try_get("created_at")?,
            expires_at: row.try_get("expires_at")?,
        }))
    }

    async fn save(&self, record: &SessionRecord) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (token, user_id, created_at, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (token) DO UPDATE SET
                user_id = EXCLUDED.user_id,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(&record.token)
        .bind(record.user_id)
        .bind(record.created_at)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn touch(&self, token: &str, expires_at: DateTime<Utc>) -> StorageResult<()> {
        sqlx::query(
            r#"
            UPDATE sessions SET expires_at = $2 WHERE token = $1
            "#,
        )
        .bind(token)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, token: &str) -> StorageResult<()> {
        sqlx::query(
            r#"
            DELETE FROM sessions WHERE token = $1
            "#,
        )
        .bind(token)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StorageResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM sessions WHERE expires_at <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
