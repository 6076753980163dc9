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
    middlewares::auth::CurrentUser,
    models::{friends::FriendRequestAction, pagination::PageParams},
    services::friendships,
    utils::extract::{ValidatedJson, ValidatedQuery},
};

#[derive(Deserialize, Validate)]
pub struct FriendRequestData {
    pub addressee_id: Uuid,
}

/// POST /api/v1/friend-requests
pub async fn send_friend_request(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ValidatedJson(payload): ValidatedJson<FriendRequestData>,
) -> AppResult<impl IntoResponse> {
    let friendship =
        friendships::send_request(&state.db_pool, &actor, payload.addressee_id).await?;
    Ok((StatusCode::CREATED, Json(friendship)))
}

#[derive(Deserialize, Validate)]
pub struct FriendRequestResponse {
    pub action: FriendRequestAction,
}

/// POST /api/v1/friend-requests/{friendship_id}/respond
pub async fn respond_to_friend_request(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(friendship_id): Path<i32>,
    ValidatedJson(payload): ValidatedJson<FriendRequestResponse>,
) -> AppResult<impl IntoResponse> {
    let friendship =
        friendships::respond_to_request(&state.db_pool, &actor, friendship_id, payload.action)
            .await?;
    Ok(Json(friendship))
}

/// GET /api/v1/friend-requests/pending
pub async fn pending_friend_requests(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
) -> AppResult<impl IntoResponse> {
    Ok(Json(friendships::pending_requests(&state.db_pool, &actor).await?))
}

/// GET /api/v1/friend-requests/sent
pub async fn sent_friend_requests(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
) -> AppResult<impl IntoResponse> {
    Ok(Json(friendships::sent_requests(&state.db_pool, &actor).await?))
}

/// DELETE /api/v1/friend-requests/cancel/{addressee_id}
pub async fn cancel_friend_request(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(addressee_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    friendships::cancel_request(&state.db_pool, &actor, addressee_id).await?;
    Ok(Json(json!({ "detail": "Friend request cancelled successfully" })))
}

/// GET /api/v1/friends
pub async fn list_friends(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ValidatedQuery(params): ValidatedQuery<PageParams>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(
        friendships::list_friends(&state.db_pool, &actor, params).await?,
    ))
}

/// DELETE /api/v1/friends/{friend_id}
pub async fn remove_friend(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(friend_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    friendships::remove_friend(&state.db_pool, &actor, friend_id).await?;
    Ok(Json(json!({ "detail": "Friend removed successfully" })))
}

/// GET /api/v1/friendship-status/{user_id}
pub async fn friendship_status(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(
        friendships::friendship_status(&state.db_pool, &actor, user_id).await?,
    ))
}
