use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app_state::AppState,
    error::AppResult,
    middlewares::auth::{CurrentUser, MaybeUser},
    models::{
        notes::{NewNote, NoteChanges, NoteFilter, NotePrivacy},
        pagination::{PageParams, DEFAULT_LIMIT},
    },
    services::notes,
    utils::extract::{not_blank, ValidatedJson, ValidatedQuery},
};

#[derive(Deserialize, Validate)]
pub struct CreateNote {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    #[validate(custom(function = "not_blank"))]
    pub title: String,

    #[validate(length(min = 1, message = "Content is required"))]
    #[validate(custom(function = "not_blank"))]
    pub content: String,

    #[serde(default = "default_privacy")]
    pub privacy: NotePrivacy,
}

fn default_privacy() -> NotePrivacy {
    NotePrivacy::Private
}

/// POST /api/v1/notes
pub async fn create_note(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ValidatedJson(payload): ValidatedJson<CreateNote>,
) -> AppResult<impl IntoResponse> {
    let new_note = NewNote {
        title: payload.title.trim().to_string(),
        content: payload.content.trim().to_string(),
        privacy: payload.privacy,
    };

    let note = notes::create_note(&state.db_pool, &actor, new_note).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

#[derive(Deserialize, Validate)]
pub struct NoteListQuery {
    #[serde(default)]
    #[validate(range(min = 0, message = "skip must not be negative"))]
    pub skip: i64,

    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: i64,

    pub privacy: Option<NotePrivacy>,
    pub creator_id: Option<Uuid>,
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

/// GET /api/v1/notes
pub async fn list_notes(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    ValidatedQuery(query): ValidatedQuery<NoteListQuery>,
) -> AppResult<impl IntoResponse> {
    let filter = NoteFilter {
        privacy: query.privacy,
        creator_id: query.creator_id,
    };
    let params = PageParams {
        skip: query.skip,
        limit: query.limit,
    };

    Ok(Json(
        notes::list_notes(&state.db_pool, viewer.as_ref(), filter, params).await?,
    ))
}

/// GET /api/v1/notes/my
pub async fn list_my_notes(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ValidatedQuery(params): ValidatedQuery<PageParams>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(
        notes::list_my_notes(&state.db_pool, &actor, params).await?,
    ))
}

/// GET /api/v1/notes/{note_id}
pub async fn get_note(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(note_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(
        notes::get_note(&state.db_pool, viewer.as_ref(), note_id).await?,
    ))
}

#[derive(Deserialize, Validate)]
pub struct UpdateNote {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    #[validate(custom(function = "not_blank"))]
    pub title: Option<String>,

    #[validate(length(min = 1, message = "Content cannot be empty"))]
    #[validate(custom(function = "not_blank"))]
    pub content: Option<String>,

    pub privacy: Option<NotePrivacy>,
}

/// PUT /api/v1/notes/{note_id}
pub async fn update_note(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(note_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateNote>,
) -> AppResult<impl IntoResponse> {
    let changes = NoteChanges {
        title: payload.title.map(|t| t.trim().to_string()),
        content: payload.content.map(|c| c.trim().to_string()),
        privacy: payload.privacy,
    };

    Ok(Json(
        notes::update_note(&state.db_pool, &actor, note_id, changes).await?,
    ))
}

/// DELETE /api/v1/notes/{note_id}
pub async fn delete_note(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(note_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    notes::delete_note(&state.db_pool, &actor, note_id).await?;
    Ok(Json(json!({ "detail": "Note deleted successfully" })))
}

/// GET /api/v1/notes/{note_id}/authors
pub async fn list_authors(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(note_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(
        notes::list_authors(&state.db_pool, viewer.as_ref(), note_id).await?,
    ))
}

#[derive(Deserialize, Validate)]
pub struct AuthorData {
    pub user_id: Uuid,
}

/// POST /api/v1/notes/{note_id}/authors
pub async fn add_author(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(note_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<AuthorData>,
) -> AppResult<impl IntoResponse> {
    let authors = notes::add_author(&state.db_pool, &actor, note_id, payload.user_id).await?;
    Ok((StatusCode::CREATED, Json(authors)))
}

/// DELETE /api/v1/notes/{note_id}/authors/{user_id}
pub async fn remove_author(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path((note_id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<impl IntoResponse> {
    notes::remove_author(&state.db_pool, &actor, note_id, user_id).await?;
    Ok(Json(json!({ "detail": "Author removed successfully" })))
}

/// POST /api/v1/notes/{note_id}/owner
pub async fn transfer_ownership(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(note_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<AuthorData>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(
        notes::transfer_ownership(&state.db_pool, &actor, note_id, payload.user_id).await?,
    ))
}
