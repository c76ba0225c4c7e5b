//! Ownership-scoped note operations.

use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::auth::{authorize, parse_resource_id, AuthenticatedUser, Owned};
use crate::error::AppError;
use crate::storage::{NewNote, Note, NoteStore};

const INVALID_NOTE_ID: &str = "Invalid note id";
const TITLE_REQUIRED: &str = "Note must have a title";
const NOTE_NOT_FOUND: &str = "Note not found";
const NOT_YOUR_NOTE: &str = "You cannot access this note.";

/// Body of create and update requests
#[derive(Debug, Default, Deserialize)]
pub struct NoteRequest {
    pub title: Option<String>,
    pub text: Option<String>,
}

impl Owned for Note {
    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

#[derive(Clone)]
pub struct NoteService {
    notes: Arc<dyn NoteStore>,
}

impl NoteService {
    pub fn new(notes: Arc<dyn NoteStore>) -> Self {
        Self { notes }
    }

    pub async fn list(&self, caller: AuthenticatedUser) -> Result<Vec<Note>, AppError> {
        Ok(self.notes.list_by_owner(caller.user_id).await?)
    }

    pub async fn get(&self, caller: AuthenticatedUser, raw_id: &str) -> Result<Note, AppError> {
        let id = parse_resource_id(raw_id, INVALID_NOTE_ID)?;
        self.load_owned(&caller, id).await
    }

    pub async fn create(&self, caller: AuthenticatedUser, request: NoteRequest) -> Result<Note, AppError> {
        let title = required_title(request.title)?;

        let note = self
            .notes
            .create(NewNote {
                user_id: caller.user_id,
                title,
                text: request.text,
            })
            .await?;

        info!("User {} created note {}", caller.user_id, note.id);
        Ok(note)
    }

    /// Replace the title. The text is replaced only when a non-empty one is
    /// given; otherwise the stored text is kept.
    pub async fn update(
        &self,
        caller: AuthenticatedUser,
        raw_id: &str,
        request: NoteRequest,
    ) -> Result<Note, AppError> {
        let id = parse_resource_id(raw_id, INVALID_NOTE_ID)?;
        let title = required_title(request.title)?;

        let mut note = self.load_owned(&caller, id).await?;
        note.title = title;
        if let Some(text) = request.text.filter(|text| !text.is_empty()) {
            note.text = Some(text);
        }
        note.updated_at = Utc::now();

        self.notes.save(&note).await?;
        Ok(note)
    }

    pub async fn delete(&self, caller: AuthenticatedUser, raw_id: &str) -> Result<(), AppError> {
        let id = parse_resource_id(raw_id, INVALID_NOTE_ID)?;
        let note = self.load_owned(&caller, id).await?;

        self.notes.delete(note.id).await?;
        info!("User {} deleted note {}", caller.user_id, note.id);
        Ok(())
    }

    async fn load_owned(&self, caller: &AuthenticatedUser, id: Uuid) -> Result<Note, AppError> {
        let note = self.notes.find_by_id(id).await?;
        authorize(note, caller, NOTE_NOT_FOUND, NOT_YOUR_NOTE)
    }
}

fn required_title(title: Option<String>) -> Result<String, AppError> {
    title
        .filter(|title| !title.is_empty())
        .ok_or_else(|| AppError::Validation(TITLE_REQUIRED.to_string()))
}
