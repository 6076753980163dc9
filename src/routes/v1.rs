pub mod auth;
pub mod friends;
pub mod notes;
pub mod users;
use crate::app_state::AppState;
use axum::Router;

pub fn v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/token", auth::token_routes())
        .nest("/users", users::users_routes())
        .nest("/notes", notes::notes_routes())
        .merge(friends::friends_routes())
}
