use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::traits::{StorageError, StorageResult};

/// User account in the system
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User creation request
#[derive(Debug)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Credential store.
///
/// Lookups are exact, case-sensitive matches. `create` is the final arbiter
/// of uniqueness: implementations must reject a duplicate username or email
/// with [`StorageError::DuplicateUsername`] / [`StorageError::DuplicateEmail`]
/// even when the caller already checked.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a new user
    async fn create(&self, user: CreateUser) -> StorageResult<User>;

    /// Get user by ID
    async fn find_by_id(&self, id: Uuid) -> StorageResult<Option<User>>;

    /// Get user by username
    async fn find_by_username(&self, username: &str) -> StorageResult<Option<User>>;

    /// Get user by email
    async fn find_by_email(&self, email: &str) -> StorageResult<Option<User>>;

    /// List all users, oldest first
    async fn list(&self) -> StorageResult<Vec<User>>;
}

/// PostgreSQL implementation of UserStore
pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Initialize database schema for users
    pub async fn initialize(&self) -> StorageResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                username TEXT NOT NULL,
                email TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                CONSTRAINT users_username_key UNIQUE (username),
                CONSTRAINT users_email_key UNIQUE (email)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_one(&self, column: &str, value: &str) -> StorageResult<Option<User>> {
        // `column` is one of a fixed set of identifiers chosen by this module
        let sql = format!(
            "SELECT id, username, email, password_hash, created_at, updated_at \
             FROM users WHERE {column} = $1"
        );

        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }
}

fn user_from_row(row: &PgRow) -> StorageResult<User> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Map a unique violation on `users` to the duplicate it represents
fn classify_insert_error(error: sqlx::Error, user: &CreateUser) -> StorageError {
    if let Some(db_err) = error.as_database_error() {
        if db_err.is_unique_violation() {
            return match db_err.constraint() {
                Some("users_email_key") => StorageError::DuplicateEmail(user.email.clone()),
                _ => StorageError::DuplicateUsername(user.username.clone()),
            };
        }
    }
    StorageError::Database(error)
}

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn create(&self, user: CreateUser) -> StorageResult<User> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            "#,
        )
        .bind(id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| classify_insert_error(e, &user))?;

        Ok(User {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        })
    }

    async fn find_by_id(&self, id: Uuid) -> StorageResult<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, username, email, password_hash, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        self.find_one("username", username).await
    }

    async fn find_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        self.find_one("email", email).await
    }

    async fn list(&self) -> StorageResult<Vec<User>> {
        let rows = sqlx::query(
            r#"
            SELECT id, username, email, password_hash, created_at, updated_at
            FROM users
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(user_from_row).collect()
    }
}
