use crate::app_state::AppState;
use crate::handlers::v1::auth;
use axum::{routing::post, Router};

pub fn token_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(auth::login)) // /api/v1/token
        .route("/refresh", post(auth::refresh))
}
