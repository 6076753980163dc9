//! Account lifecycle: registration, profile changes, role/status
//! administration, deletion and e-mail verification.

use anyhow::anyhow;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::acquire;
use crate::error::{AppError, AppResult};
use crate::models::pagination::{Page, PageParams};
use crate::models::users::{NewUser, User, UserChanges, UserRead, UserRole};
use crate::queries::users as queries;
use crate::services::permissions::{require_admin, require_self_or_admin, UserAction};
use crate::utils::email::Mailer;
use crate::utils::password::{check_password_strength, hash_password};

#[derive(Debug)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub name: String,
    pub age: Option<i32>,
    pub bio: Option<String>,
    pub password: String,
}

pub fn verification_link(app_base_url: &str, token: &str) -> String {
    format!(
        "{}/api/v1/users/verify-email/{}",
        app_base_url.trim_end_matches('/'),
        token
    )
}

async fn ensure_unique(
    conn: &mut sqlx::PgConnection,
    email: Option<&str>,
    username: Option<&str>,
    exclude_user_id: Option<Uuid>,
) -> AppResult<()> {
    if let Some(email) = email {
        if queries::is_email_taken(conn, email, exclude_user_id).await? {
            return Err(AppError::Conflict(anyhow!("Email already registered")));
        }
    }
    if let Some(username) = username {
        if queries::is_username_taken(conn, username, exclude_user_id).await? {
            return Err(AppError::Conflict(anyhow!("Username already taken")));
        }
    }
    Ok(())
}

/// Create an account and, when a mailer is configured, send the verification
/// link. A failed send is logged; the account is kept.
pub async fn register(
    pool: &PgPool,
    mailer: Option<&Mailer>,
    app_base_url: &str,
    registration: Registration,
) -> AppResult<User> {
    check_password_strength(&registration.password)?;

    let mut conn = acquire(pool).await?;
    ensure_unique(
        &mut conn,
        Some(&registration.email),
        Some(&registration.username),
        None,
    )
    .await?;

    let password_hash = hash_password(registration.password).await?;
    let verification_token = Uuid::new_v4().simple().to_string();

    let user = queries::insert_user(
        &mut conn,
        &NewUser {
            email: registration.email,
            username: registration.username,
            name: registration.name,
            age: registration.age,
            bio: registration.bio,
            password_hash,
            email_verification_token: verification_token.clone(),
        },
    )
    .await?;

    info!(user_id = %user.id, username = %user.username, "user registered");

    if let Some(mailer) = mailer {
        let link = verification_link(app_base_url, &verification_token);
        if let Err(e) = mailer.send_verification_email(&user.email, &link).await {
            warn!(user_id = %user.id, error = %e, "could not send verification email");
        }
    }

    Ok(user)
}

pub async fn get_user(pool: &PgPool, user_id: Uuid) -> AppResult<User> {
    let mut conn = acquire(pool).await?;
    queries::get_active_user_by_id(&mut conn, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("User not found")))
}

pub async fn list_users(pool: &PgPool, params: PageParams) -> AppResult<Page<UserRead>> {
    let mut conn = acquire(pool).await?;
    let users = queries::list_users(&mut conn, params.skip, params.limit).await?;
    let total = queries::count_users(&mut conn).await?;
    Ok(Page::new(
        users.into_iter().map(UserRead::from).collect(),
        total,
        params,
    ))
}

pub async fn update_user(
    pool: &PgPool,
    actor: &User,
    user_id: Uuid,
    changes: UserChanges,
) -> AppResult<User> {
    require_self_or_admin(actor, UserAction::Update, user_id)?;

    let mut conn = acquire(pool).await?;
    if queries::get_active_user_by_id(&mut conn, user_id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound(anyhow!("User not found")));
    }

    ensure_unique(
        &mut conn,
        changes.email.as_deref(),
        changes.username.as_deref(),
        Some(user_id),
    )
    .await?;

    let user = queries::update_user(&mut conn, user_id, &changes).await?;
    info!(user_id = %user.id, actor_id = %actor.id, "user updated");
    Ok(user)
}

pub async fn change_role(
    pool: &PgPool,
    actor: &User,
    user_id: Uuid,
    role: UserRole,
) -> AppResult<User> {
    require_admin(actor, UserAction::ChangeRole, user_id)?;

    let mut conn = acquire(pool).await?;
    let user = queries::update_user_role(&mut conn, user_id, role).await?;
    info!(user_id = %user.id, actor_id = %actor.id, role = ?role, "user role changed");
    Ok(user)
}

/// Deactivating a user revokes every token issued to them.
pub async fn change_status(
    pool: &PgPool,
    actor: &User,
    user_id: Uuid,
    is_active: bool,
) -> AppResult<User> {
    require_admin(actor, UserAction::ChangeStatus, user_id)?;

    let mut conn = acquire(pool).await?;
    let user = queries::update_user_status(&mut conn, user_id, is_active).await?;
    info!(user_id = %user.id, actor_id = %actor.id, is_active, "user status changed");
    Ok(user)
}

/// Soft delete by default (self or admin); `permanent` removes the row and is admin only.
pub async fn delete_user(
    pool: &PgPool,
    actor: &User,
    user_id: Uuid,
    permanent: bool,
) -> AppResult<()> {
    if permanent {
        require_admin(actor, UserAction::PermanentlyDelete, user_id)?;
    } else {
        require_self_or_admin(actor, UserAction::Delete, user_id)?;
    }

    let mut conn = acquire(pool).await?;
    let deleted = if permanent {
        queries::delete_user_permanently(&mut conn, user_id).await?
    } else {
        queries::soft_delete_user(&mut conn, user_id).await?
    };

    if !deleted {
        return Err(AppError::NotFound(anyhow!("User not found")));
    }

    info!(user_id = %user_id, actor_id = %actor.id, permanent, "user deleted");
    Ok(())
}

pub async fn verify_email(pool: &PgPool, token: &str) -> AppResult<User> {
    let mut conn = acquire(pool).await?;
    let user = queries::verify_email_with_token(&mut conn, token)
        .await?
        .ok_or_else(|| AppError::BadRequest(anyhow!("Invalid verification token")))?;

    info!(user_id = %user.id, "email verified");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_link_joins_base_url() {
        assert_eq!(
            verification_link("http://localhost:3000/", "abc123"),
            "http://localhost:3000/api/v1/users/verify-email/abc123"
        );
        assert_eq!(
            verification_link("https://notes.example.com", "t"),
            "https://notes.example.com/api/v1/users/verify-email/t"
        );
    }
}
