use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use validator::Validate;

use crate::{
    app_state::AppState,
    error::AppResult,
    services::auth,
    utils::extract::ValidatedJson,
};

#[derive(Deserialize, Validate)]
pub struct Login {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// POST /api/v1/token
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<Login>,
) -> AppResult<impl IntoResponse> {
    let pair = auth::login(&state.db_pool, &state.tokens, &payload.email, &payload.password).await?;
    Ok(Json(pair))
}

#[derive(Deserialize, Validate)]
pub struct RefreshToken {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// POST /api/v1/token/refresh
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RefreshToken>,
) -> AppResult<impl IntoResponse> {
    let pair = auth::refresh(&state.db_pool, &state.tokens, payload.refresh_token.trim()).await?;
    Ok(Json(pair))
}
