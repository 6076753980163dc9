use crate::app_state::AppState;
use crate::handlers::v1::friends;
use axum::{
    routing::{delete, get, post},
    Router,
};

pub fn friends_routes() -> Router<AppState> {
    Router::new()
        .route("/friend-requests", post(friends::send_friend_request))
        .route(
            "/friend-requests/{friendship_id}/respond",
            post(friends::respond_to_friend_request),
        )
        .route("/friend-requests/pending", get(friends::pending_friend_requests))
        .route("/friend-requests/sent", get(friends::sent_friend_requests))
        .route(
            "/friend-requests/cancel/{addressee_id}",
            delete(friends::cancel_friend_request),
        )
        .route("/friends", get(friends::list_friends))
        .route("/friends/{friend_id}", delete(friends::remove_friend))
        .route("/friendship-status/{user_id}", get(friends::friendship_status))
}
