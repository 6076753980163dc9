use axum::{response::IntoResponse, Json};
use serde_json::json;

pub async fn hello() -> impl IntoResponse {
    Json(json!({ "message": "Welcome to the Notes API" }))
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}
