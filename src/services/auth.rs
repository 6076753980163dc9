//! Login, token refresh and bearer-token resolution.

use anyhow::anyhow;
use sqlx::PgPool;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::db::acquire;
use crate::error::{AppError, AppResult};
use crate::models::tokens::{TokenPair, TokenType};
use crate::models::users::User;
use crate::queries::users::{get_user_by_email, get_user_by_id};
use crate::services::tokens::TokenService;
use crate::utils::password::{hash_password, verify_password};

pub const INVALID_CREDENTIALS: &str = "Incorrect email or password";

fn invalid_credentials() -> AppError {
    AppError::Unauthorized(anyhow!(INVALID_CREDENTIALS))
}

static DUMMY_HASH: OnceCell<String> = OnceCell::const_new();

/// Checked when no account matches the email, so unknown emails cost the
/// same bcrypt work as wrong passwords.
async fn dummy_hash() -> AppResult<String> {
    DUMMY_HASH
        .get_or_try_init(|| hash_password("no-account-matches".to_string()))
        .await
        .cloned()
}

/// The user must exist, be active and not be soft-deleted.
///
/// Applied on every token use, so deactivating or deleting a user revokes
/// their outstanding tokens immediately.
pub fn ensure_can_authenticate(user: Option<User>) -> AppResult<User> {
    match user {
        Some(user) if user.can_authenticate() => Ok(user),
        Some(user) => {
            warn!(user_id = %user.id, "token presented for inactive or deleted user");
            Err(AppError::Unauthorized(anyhow!("User is inactive or deleted")))
        }
        None => Err(AppError::Unauthorized(anyhow!("User not found"))),
    }
}

/// Every failure reads the same so callers cannot probe which emails exist.
pub fn check_login(user: Option<User>, password_matches: bool) -> AppResult<User> {
    match user {
        Some(user) if password_matches && user.can_authenticate() => Ok(user),
        _ => Err(invalid_credentials()),
    }
}

pub async fn login(
    pool: &PgPool,
    tokens: &TokenService,
    email: &str,
    password: &str,
) -> AppResult<TokenPair> {
    let mut conn = acquire(pool).await?;

    let user = get_user_by_email(&mut conn, email.trim()).await?;

    let password_matches = match &user {
        Some(user) => verify_password(password.to_string(), user.password_hash.clone()).await?,
        None => {
            verify_password(password.to_string(), dummy_hash().await?).await?;
            false
        }
    };

    let user = check_login(user, password_matches).map_err(|e| {
        warn!(email = %email.trim(), "failed login attempt");
        e
    })?;

    info!(user_id = %user.id, "user logged in");
    Ok(tokens.issue_pair(user.id)?)
}

/// Exchange a refresh token for a fresh pair. The old refresh token stays
/// valid until it expires; there is no server-side token store.
pub async fn refresh(
    pool: &PgPool,
    tokens: &TokenService,
    refresh_token: &str,
) -> AppResult<TokenPair> {
    let claims = tokens.decode(refresh_token, TokenType::Refresh)?;

    let mut conn = acquire(pool).await?;

    let user = ensure_can_authenticate(get_user_by_id(&mut conn, claims.sub).await?)?;

    info!(user_id = %user.id, "tokens refreshed");
    Ok(tokens.issue_pair(user.id)?)
}

/// Resolve an access token to the user it was issued for.
pub async fn resolve_access_token(
    pool: &PgPool,
    tokens: &TokenService,
    access_token: &str,
) -> AppResult<User> {
    let claims = tokens.decode(access_token, TokenType::Access)?;

    let mut conn = acquire(pool).await?;

    ensure_can_authenticate(get_user_by_id(&mut conn, claims.sub).await?)
}
