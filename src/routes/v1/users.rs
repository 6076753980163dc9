use crate::app_state::AppState;
use crate::handlers::v1::users;
use axum::{
    routing::{get, post},
    Router,
};

pub fn users_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(users::register).get(users::list_users))
        .route("/me", get(users::me))
        .route("/verify-email/{token}", post(users::verify_email))
        .route(
            "/{user_id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/{user_id}/role", post(users::update_role))
        .route("/{user_id}/status", post(users::update_status))
}
