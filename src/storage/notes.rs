use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::traits::{StorageError, StorageResult};

/// A note owned by exactly one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    /// Owner, fixed at creation
    pub user_id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Note creation request
#[derive(Debug)]
pub struct NewNote {
    pub user_id: Uuid,
    pub title: String,
    pub text: Option<String>,
}

/// Storage backend for notes
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Create a new note
    async fn create(&self, note: NewNote) -> StorageResult<Note>;

    /// Get note by ID
    async fn find_by_id(&self, id: Uuid) -> StorageResult<Option<Note>>;

    /// List notes belonging to a user, oldest first
    async fn list_by_owner(&self, user_id: Uuid) -> StorageResult<Vec<Note>>;

    /// Persist the mutable fields (title, text, updated_at) of an existing note
    async fn save(&self, note: &Note) -> StorageResult<()>;

    /// Delete a note
    async fn delete(&self, id: Uuid) -> StorageResult<()>;
}

/// PostgreSQL implementation of NoteStore
pub struct PostgresNoteStore {
    pool: PgPool,
}

impl PostgresNoteStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Initialize database schema for notes. Requires the users table.
    pub async fn initialize(&self) -> StorageResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS notes (
                id UUID PRIMARY KEY,
                user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                text TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_notes_user_id ON notes(user_id)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn note_from_row(row: &PgRow) -> StorageResult<Note> {
    Ok(Note {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        text: row.try_get("text")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl NoteStore for PostgresNoteStore {
    async fn create(&self, note: NewNote) -> StorageResult<Note> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO notes (id, user_id, title, text, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            "#,
        )
        .bind(id)
        .bind(note.user_id)
        .bind(&note.title)
        .bind(&note.text)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Note {
            id,
            user_id: note.user_id,
            title: note.title,
            text: note.text,
            created_at: now,
            updated_at: now,
        })
    }

    async fn find_by_id(&self, id: Uuid) -> StorageResult<Option<Note>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, title, text, created_at, updated_at
            FROM notes
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(note_from_row).transpose()
    }

    async fn list_by_owner(&self, user_id: Uuid) -> StorageResult<Vec<Note>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, title, text, created_at, updated_at
            FROM notes
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(note_from_row).collect()
    }

    async fn save(&self, note: &Note) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE notes SET title = $2, text = $3, updated_at = $4 WHERE id = $1
            "#,
        )
        .bind(note.id)
        .bind(&note.title)
        .bind(&note.text)
        .bind(note.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NoteNotFound(note.id));
        }

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM notes WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NoteNotFound(id));
        }

        Ok(())
    }
}
