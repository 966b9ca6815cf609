use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json,
    extract::{FromRequest, Path, Request, State},
    http::StatusCode,
    response::IntoResponse,
};
use notekeep_token::TokenManager;
use notekeep_types::api::{MessageResponse, NoteRequest, NoteResponse, NotesResponse};
use notekeep_types::deadline::Deadline;
use uuid::Uuid;

use crate::cached_notes::CachedNotes;
use crate::error::{
    ApiError, MSG_NOTE_CREATED, MSG_NOTE_DELETED, MSG_NOTE_RETRIEVED, MSG_NOTE_UPDATED,
    MSG_NOTES_RETRIEVED,
};
use crate::extract::{CurrentUser, JsonBody};

pub type NotesState = Arc<NotesStateInner>;

pub struct NotesStateInner {
    pub notes: CachedNotes,
    pub tokens: Arc<TokenManager>,
    pub db_timeout: Duration,
}

impl NotesStateInner {
    fn deadline(&self) -> Deadline {
        Deadline::after(self.db_timeout)
    }
}

/// The author is always the caller; a client-supplied author is ignored.
pub async fn create_note(
    State(state): State<NotesState>,
    CurrentUser(user_id): CurrentUser,
    JsonBody(req): JsonBody<NoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let deadline = state.deadline();
    let note = state
        .notes
        .create(user_id, req.name, req.content, &deadline)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(NoteResponse {
            message: MSG_NOTE_CREATED.into(),
            note,
        }),
    ))
}

pub async fn get_note(
    State(state): State<NotesState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    check_note_id(&id)?;

    let deadline = state.deadline();
    let note = state.notes.get(&id, user_id, &deadline).await?;

    Ok(Json(NoteResponse {
        message: MSG_NOTE_RETRIEVED.into(),
        note,
    }))
}

pub async fn list_notes(
    State(state): State<NotesState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let deadline = state.deadline();
    let notes = state.notes.list(user_id, &deadline).await?;

    Ok(Json(NotesResponse {
        message: MSG_NOTES_RETRIEVED.into(),
        count: notes.len(),
        notes,
        author_id: user_id,
    }))
}

/// Ownership is settled before the body is read, so a non-owner gets 403
/// whatever they sent.
pub async fn update_note(
    State(state): State<NotesState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
    request: Request,
) -> Result<impl IntoResponse, ApiError> {
    check_note_id(&id)?;

    let deadline = state.deadline();
    let existing = state.notes.get(&id, user_id, &deadline).await?;

    let JsonBody(req) = JsonBody::<NoteRequest>::from_request(request, &()).await?;
    let note = state
        .notes
        .replace(&existing, &req.name, &req.content, &deadline)
        .await?;

    Ok(Json(NoteResponse {
        message: MSG_NOTE_UPDATED.into(),
        note,
    }))
}

pub async fn delete_note(
    State(state): State<NotesState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    check_note_id(&id)?;

    let deadline = state.deadline();
    state.notes.delete(&id, user_id, &deadline).await?;

    Ok(Json(MessageResponse {
        message: MSG_NOTE_DELETED.into(),
    }))
}

fn check_note_id(id: &str) -> Result<(), ApiError> {
    Uuid::parse_str(id)
        .map(|_| ())
        .map_err(|_| ApiError::InvalidNoteId(id.to_string()))
}
