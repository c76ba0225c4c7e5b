use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::handlers::json::JsonBody;
use crate::notes::NoteRequest;
use crate::state::ServerState;
use crate::storage::Note;

// Note ids arrive as raw strings so a malformed id gets the uniform
// validation error instead of a path rejection.

pub async fn list_notes(
    State(state): State<Arc<ServerState>>,
    caller: AuthenticatedUser,
) -> Result<Json<Vec<Note>>, AppError> {
    Ok(Json(state.notes.list(caller).await?))
}

pub async fn get_note(
    State(state): State<Arc<ServerState>>,
    caller: AuthenticatedUser,
    Path(note_id): Path<String>,
) -> Result<Json<Note>, AppError> {
    Ok(Json(state.notes.get(caller, &note_id).await?))
}

pub async fn create_note(
    State(state): State<Arc<ServerState>>,
    caller: AuthenticatedUser,
    JsonBody(request): JsonBody<NoteRequest>,
) -> Result<(StatusCode, Json<Note>), AppError> {
    let note = state.notes.create(caller, request).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn update_note(
    State(state): State<Arc<ServerState>>,
    caller: AuthenticatedUser,
    Path(note_id): Path<String>,
    JsonBody(request): JsonBody<NoteRequest>,
) -> Result<Json<Note>, AppError> {
    Ok(Json(state.notes.update(caller, &note_id, request).await?))
}

pub async fn delete_note(
    State(state): State<Arc<ServerState>>,
    caller: AuthenticatedUser,
    Path(note_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.notes.delete(caller, &note_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
