use serde_json::json;
use std::fmt::Display;

use anyhow::{anyhow, Error as anyhowError};
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
};

use crate::services::permissions::PermissionError;
use crate::services::tokens::TokenError;

#[derive(Debug)]
pub enum AppError {
    // 400 bad request
    BadRequest(anyhowError),
    // 401 unauthorized
    Unauthorized(anyhowError),
    // 403 forbidden
    Forbidden(PermissionError),
    // 404 not found
    NotFound(anyhowError),
    // 409 conflict
    Conflict(anyhowError),
    // 422 unprocessable entity
    Validation(anyhowError),
    // 500 internal server error
    InternalServerError(anyhowError),
}

impl AppError {
    fn kind(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "bad_request",
            AppError::Unauthorized(_) => "authentication_error",
            AppError::Forbidden(_) => "permission_error",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::Validation(_) => "validation_error",
            AppError::InternalServerError(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::BadRequest(e) => write!(f, "BadRequest: {}", e),
            AppError::Unauthorized(e) => write!(f, "Unauthorized: {}", e),
            AppError::Forbidden(e) => write!(f, "Forbidden: {}", e),
            AppError::NotFound(e) => write!(f, "NotFound: {}", e),
            AppError::Conflict(e) => write!(f, "Conflict: {}", e),
            AppError::Validation(e) => write!(f, "Validation: {}", e),
            AppError::InternalServerError(e) => write!(f, "InternalServerError: {}", e),
        }
    }
}

impl From<anyhowError> for AppError {
    fn from(e: anyhowError) -> Self {
        AppError::InternalServerError(e)
    }
}

impl From<PermissionError> for AppError {
    fn from(e: PermissionError) -> Self {
        AppError::Forbidden(e)
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Encode(_) | TokenError::Lifetime => {
                AppError::InternalServerError(anyhow!(e))
            }
            _ => AppError::Unauthorized(anyhow!(e)),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        let mut error_messages = String::new();
        for (field, errors) in e.field_errors() {
            for error in errors {
                error_messages.push_str(&format!(
                    "{}: {} ",
                    field,
                    error
                        .message
                        .as_ref()
                        .map_or("invalid value", |m| m.as_ref())
                ));
            }
        }
        AppError::Validation(anyhow!(error_messages.trim().to_string()))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = e {
            return AppError::NotFound(anyhow!("Resource not found"));
        }
        if let Some(db_err) = e.as_database_error() {
            if db_err.is_unique_violation() {
                return AppError::Conflict(anyhow!("Resource already exists"));
            }
        }
        AppError::InternalServerError(anyhow!(e))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let error_message = match &self {
            Self::InternalServerError(err) => {
                tracing::error!(error = ?err, "internal server error");
                status
                    .canonical_reason()
                    .unwrap_or("An error occurred")
                    .to_string()
            }
            Self::Forbidden(err) => err.to_string(),
            Self::BadRequest(err)
            | Self::Unauthorized(err)
            | Self::NotFound(err)
            | Self::Conflict(err)
            | Self::Validation(err) => err.to_string(),
        };

        let error_response = json!({
            "error": {
                "type": self.kind(),
                "message": error_message,
            }
        });

        let mut response = (status, axum::Json(error_response)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

pub type AppResult<T> = Result<T, AppError>;
