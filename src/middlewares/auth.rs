use anyhow::anyhow;
use axum::{
    extract::{FromRequestParts, OriginalUri, Request, State},
    http::{header, request::Parts, HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{
    app_state::AppState,
    error::{AppError, AppResult},
    models::users::User,
    services::auth::resolve_access_token,
};

/// Routes reachable without a token. `{param}` matches exactly one non-empty segment.
pub const PUBLIC_ROUTES: &[(Method, &str)] = &[
    (Method::GET, "/"),
    (Method::GET, "/health"),
    (Method::POST, "/api/v1/users"),
    (Method::POST, "/api/v1/token"),
    (Method::POST, "/api/v1/token/refresh"),
    (Method::POST, "/api/v1/users/verify-email/{token}"),
    (Method::GET, "/api/v1/notes"),
    (Method::GET, "/api/v1/notes/{note_id}"),
    (Method::GET, "/api/v1/notes/{note_id}/authors"),
];

pub fn matches_pattern(pattern: &str, path: &str) -> bool {
    let path = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };

    let mut pattern_segments = pattern.split('/');
    let mut path_segments = path.split('/');

    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (None, None) => return true,
            (Some(expected), Some(actual)) => {
                let is_param = expected.starts_with('{') && expected.ends_with('}');
                if is_param {
                    if actual.is_empty() {
                        return false;
                    }
                } else if expected != actual {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

pub fn is_public(method: &Method, path: &str) -> bool {
    // Pre-flight requests carry no credentials.
    if method == Method::OPTIONS {
        return true;
    }
    PUBLIC_ROUTES
        .iter()
        .any(|(m, pattern)| m == method && matches_pattern(pattern, path))
}

/// `Authorization: Bearer <token>`, scheme matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

/// The authenticated caller, attached to the request by [`authenticate`].
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

/// Resolve the bearer token on every request.
///
/// Protected routes require a valid access token for an active user. Public
/// routes accept anonymous callers but still attach a user when a usable token
/// is sent.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> AppResult<Response> {
    // Nested routers see a stripped URI; match against the one the client sent.
    let path = req
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.0.path().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());
    let public = is_public(req.method(), &path);

    let token = bearer_token(req.headers()).map(str::to_owned);

    match token {
        Some(token) => {
            match resolve_access_token(&state.db_pool, &state.tokens, &token).await {
                Ok(user) => {
                    req.extensions_mut().insert(CurrentUser(user));
                }
                Err(e) if public => {
                    tracing::debug!(error = %e, "ignoring unusable token on public route");
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "rejected bearer token");
                    return Err(e);
                }
            }
        }
        None if !public => {
            warn!(path = %path, "missing bearer token");
            return Err(AppError::Unauthorized(anyhow!("Not authenticated")));
        }
        None => {}
    }

    Ok(next.run(req).await)
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized(anyhow!("Not authenticated")))
    }
}

/// The caller when one was authenticated; never rejects.
#[derive(Clone, Debug)]
pub struct MaybeUser(pub Option<User>);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts
                .extensions
                .get::<CurrentUser>()
                .map(|CurrentUser(user)| user.clone()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn params_match_one_segment() {
        assert!(matches_pattern("/api/v1/notes/{note_id}", "/api/v1/notes/abc"));
        assert!(matches_pattern("/api/v1/notes/{note_id}", "/api/v1/notes/abc/"));
        assert!(!matches_pattern("/api/v1/notes/{note_id}", "/api/v1/notes/abc/authors"));
        assert!(!matches_pattern("/api/v1/notes/{note_id}", "/api/v1/notes//"));
        assert!(matches_pattern(
            "/api/v1/notes/{note_id}/authors",
            "/api/v1/notes/abc/authors"
        ));
    }

    #[test]
    fn literal_segments_must_match() {
        assert!(matches_pattern("/", "/"));
        assert!(!matches_pattern("/", "/health"));
        assert!(!matches_pattern("/api/v1/token", "/api/v1/token/refresh"));
        assert!(!matches_pattern("/api/v1/users", "/api/v1/users/me"));
    }

    #[test]
    fn allow_list_is_method_specific() {
        assert!(is_public(&Method::POST, "/api/v1/users"));
        assert!(!is_public(&Method::GET, "/api/v1/users"));
        assert!(is_public(&Method::GET, "/api/v1/notes"));
        assert!(!is_public(&Method::POST, "/api/v1/notes"));
        assert!(!is_public(&Method::DELETE, "/api/v1/notes/abc"));
        assert!(is_public(&Method::POST, "/api/v1/users/verify-email/tok"));
        assert!(!is_public(&Method::GET, "/api/v1/friends"));
        assert!(is_public(&Method::OPTIONS, "/api/v1/friends"));
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(bearer_token(&headers), Some("xyz"));
    }

    #[test]
    fn other_schemes_are_ignored() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
