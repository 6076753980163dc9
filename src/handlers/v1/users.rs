use axum::{
    extract::{Path, Query, State},
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
    middlewares::auth::CurrentUser,
    models::{
        pagination::PageParams,
        users::{UserChanges, UserRead, UserRole},
    },
    services::users::{self, Registration},
    utils::extract::{not_blank, ValidatedJson, ValidatedQuery},
};

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

#[derive(Deserialize, Validate)]
pub struct CreateUser {
    #[validate(length(min = 3, max = 50, message = "Username must be 3 to 50 characters"))]
    #[validate(custom(function = "not_blank"))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    #[validate(length(max = 255, message = "Email is too long"))]
    pub email: String,

    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    #[validate(custom(function = "not_blank"))]
    pub name: String,

    #[validate(range(min = 0, max = 150, message = "Age must be between 0 and 150"))]
    pub age: Option<i32>,

    #[validate(length(max = 500, message = "Bio must be at most 500 characters"))]
    pub bio: Option<String>,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// POST /api/v1/users
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateUser>,
) -> AppResult<impl IntoResponse> {
    let user = users::register(
        &state.db_pool,
        state.mailer.as_deref(),
        &state.config.app_base_url,
        Registration {
            email: payload.email.trim().to_string(),
            username: payload.username.trim().to_string(),
            name: payload.name.trim().to_string(),
            age: payload.age,
            bio: trimmed(payload.bio),
            password: payload.password,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(UserRead::from(user))))
}

/// GET /api/v1/users
pub async fn list_users(
    State(state): State<AppState>,
    ValidatedQuery(params): ValidatedQuery<PageParams>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(users::list_users(&state.db_pool, params).await?))
}

/// GET /api/v1/users/me
pub async fn me(CurrentUser(user): CurrentUser) -> AppResult<impl IntoResponse> {
    Ok(Json(UserRead::from(user)))
}

/// GET /api/v1/users/{user_id}
pub async fn get_user(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let user = users::get_user(&state.db_pool, user_id).await?;
    Ok(Json(UserRead::from(user)))
}

#[derive(Deserialize, Validate)]
pub struct UpdateUser {
    #[validate(length(min = 3, max = 50, message = "Username must be 3 to 50 characters"))]
    #[validate(custom(function = "not_blank"))]
    pub username: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    #[validate(custom(function = "not_blank"))]
    pub name: Option<String>,

    #[validate(range(min = 0, max = 150, message = "Age must be between 0 and 150"))]
    pub age: Option<i32>,

    #[validate(length(max = 500, message = "Bio must be at most 500 characters"))]
    pub bio: Option<String>,
}

/// PUT /api/v1/users/{user_id}
pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(user_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateUser>,
) -> AppResult<impl IntoResponse> {
    let changes = UserChanges {
        email: trimmed(payload.email),
        username: trimmed(payload.username),
        name: trimmed(payload.name),
        age: payload.age,
        bio: trimmed(payload.bio),
    };

    let user = users::update_user(&state.db_pool, &actor, user_id, changes).await?;
    Ok(Json(UserRead::from(user)))
}

#[derive(Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub permanent: bool,
}

/// DELETE /api/v1/users/{user_id}?permanent=true
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(user_id): Path<Uuid>,
    Query(params): Query<DeleteParams>,
) -> AppResult<impl IntoResponse> {
    users::delete_user(&state.db_pool, &actor, user_id, params.permanent).await?;

    let detail = if params.permanent {
        "User permanently deleted"
    } else {
        "User deleted successfully"
    };
    Ok(Json(json!({ "detail": detail })))
}

/// POST /api/v1/users/verify-email/{token}
pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<impl IntoResponse> {
    users::verify_email(&state.db_pool, token.trim()).await?;
    Ok(Json(json!({ "detail": "Email verified successfully" })))
}

#[derive(Deserialize, Validate)]
pub struct RoleUpdate {
    pub role: UserRole,
}

/// POST /api/v1/users/{user_id}/role
pub async fn update_role(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(user_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<RoleUpdate>,
) -> AppResult<impl IntoResponse> {
    let user = users::change_role(&state.db_pool, &actor, user_id, payload.role).await?;
    Ok(Json(UserRead::from(user)))
}

#[derive(Deserialize, Validate)]
pub struct StatusUpdate {
    pub is_active: bool,
}

/// POST /api/v1/users/{user_id}/status
pub async fn update_status(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(user_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<StatusUpdate>,
) -> AppResult<impl IntoResponse> {
    let user = users::change_status(&state.db_pool, &actor, user_id, payload.is_active).await?;
    Ok(Json(UserRead::from(user)))
}
