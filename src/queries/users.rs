use anyhow::anyhow;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::users::{NewUser, User, UserChanges, UserRole};

const USER_COLUMNS: &str = "id, email, username, name, age, bio, password_hash, role, is_active, \
     is_email_verified, email_verification_token, created_at, updated_at, deleted_at";

fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| {
        tracing::error!(error = %e, "{}", context);
        AppError::InternalServerError(anyhow!("{}: {}", context, e))
    }
}

/// Any user row with this id, deleted or not.
pub async fn get_user_by_id(conn: &mut PgConnection, user_id: Uuid) -> AppResult<Option<User>> {
    sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
        .bind(user_id)
        .fetch_optional(conn)
        .await
        .map_err(db_error("Failed to fetch user"))
}

pub async fn get_active_user_by_id(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> AppResult<Option<User>> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE id = $1 AND deleted_at IS NULL",
        USER_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(conn)
    .await
    .map_err(db_error("Failed to fetch user"))
}

/// Case-insensitive lookup among non-deleted users.
pub async fn get_user_by_email(conn: &mut PgConnection, email: &str) -> AppResult<Option<User>> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE lower(email) = lower($1) AND deleted_at IS NULL",
        USER_COLUMNS
    ))
    .bind(email)
    .fetch_optional(conn)
    .await
    .map_err(db_error("Failed to fetch user by email"))
}

pub async fn is_email_taken(
    conn: &mut PgConnection,
    email: &str,
    exclude_user_id: Option<Uuid>,
) -> AppResult<bool> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM users
            WHERE lower(email) = lower($1)
              AND deleted_at IS NULL
              AND ($2::uuid IS NULL OR id <> $2)
        )
        "#,
    )
    .bind(email)
    .bind(exclude_user_id)
    .fetch_one(conn)
    .await
    .map_err(db_error("Failed to check email uniqueness"))
}

pub async fn is_username_taken(
    conn: &mut PgConnection,
    username: &str,
    exclude_user_id: Option<Uuid>,
) -> AppResult<bool> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM users
            WHERE username = $1
              AND deleted_at IS NULL
              AND ($2::uuid IS NULL OR id <> $2)
        )
        "#,
    )
    .bind(username)
    .bind(exclude_user_id)
    .fetch_one(conn)
    .await
    .map_err(db_error("Failed to check username uniqueness"))
}

pub async fn insert_user(conn: &mut PgConnection, new_user: &NewUser) -> AppResult<User> {
    let result = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (id, email, username, name, age, bio, password_hash, email_verification_token)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {}
        "#,
        USER_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(&new_user.email)
    .bind(&new_user.username)
    .bind(&new_user.name)
    .bind(new_user.age)
    .bind(&new_user.bio)
    .bind(&new_user.password_hash)
    .bind(&new_user.email_verification_token)
    .fetch_one(conn)
    .await;

    result.map_err(unique_user_violation)
}

/// `None` fields keep their current value.
pub async fn update_user(
    conn: &mut PgConnection,
    user_id: Uuid,
    changes: &UserChanges,
) -> AppResult<User> {
    let result = sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users SET
            email = COALESCE($2, email),
            username = COALESCE($3, username),
            name = COALESCE($4, name),
            age = COALESCE($5, age),
            bio = COALESCE($6, bio),
            updated_at = NOW()
        WHERE id = $1 AND deleted_at IS NULL
        RETURNING {}
        "#,
        USER_COLUMNS
    ))
    .bind(user_id)
    .bind(&changes.email)
    .bind(&changes.username)
    .bind(&changes.name)
    .bind(changes.age)
    .bind(&changes.bio)
    .fetch_optional(conn)
    .await;

    result
        .map_err(unique_user_violation)?
        .ok_or_else(|| AppError::NotFound(anyhow!("User not found")))
}

fn unique_user_violation(e: sqlx::Error) -> AppError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return match db_err.constraint() {
                Some("users_email_active_key") => {
                    AppError::Conflict(anyhow!("Email already registered"))
                }
                Some("users_username_active_key") => {
                    AppError::Conflict(anyhow!("Username already taken"))
                }
                _ => AppError::Conflict(anyhow!("User already exists")),
            };
        }
    }
    tracing::error!(error = %e, "user write failed");
    AppError::InternalServerError(anyhow!("Failed to save user: {}", e))
}

pub async fn update_user_role(
    conn: &mut PgConnection,
    user_id: Uuid,
    role: UserRole,
) -> AppResult<User> {
    sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL RETURNING {}",
        USER_COLUMNS
    ))
    .bind(user_id)
    .bind(role)
    .fetch_optional(conn)
    .await
    .map_err(db_error("Failed to update user role"))?
    .ok_or_else(|| AppError::NotFound(anyhow!("User not found")))
}

pub async fn update_user_status(
    conn: &mut PgConnection,
    user_id: Uuid,
    is_active: bool,
) -> AppResult<User> {
    sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET is_active = $2, updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL RETURNING {}",
        USER_COLUMNS
    ))
    .bind(user_id)
    .bind(is_active)
    .fetch_optional(conn)
    .await
    .map_err(db_error("Failed to update user status"))?
    .ok_or_else(|| AppError::NotFound(anyhow!("User not found")))
}

/// Returns `false` when no live user matched.
pub async fn soft_delete_user(conn: &mut PgConnection, user_id: Uuid) -> AppResult<bool> {
    let result = sqlx::query(
        "UPDATE users SET deleted_at = NOW(), is_active = FALSE, updated_at = NOW() \
         WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(user_id)
    .execute(conn)
    .await
    .map_err(db_error("Failed to delete user"))?;

    Ok(result.rows_affected() > 0)
}

/// Removes the row; friendships, note authorships and created notes cascade.
pub async fn delete_user_permanently(conn: &mut PgConnection, user_id: Uuid) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(conn)
        .await
        .map_err(db_error("Failed to permanently delete user"))?;

    Ok(result.rows_affected() > 0)
}

/// Marks the owner of `token` verified and clears the token.
pub async fn verify_email_with_token(
    conn: &mut PgConnection,
    token: &str,
) -> AppResult<Option<User>> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users SET
            is_email_verified = TRUE,
            email_verification_token = NULL,
            updated_at = NOW()
        WHERE email_verification_token = $1 AND deleted_at IS NULL
        RETURNING {}
        "#,
        USER_COLUMNS
    ))
    .bind(token)
    .fetch_optional(conn)
    .await
    .map_err(db_error("Failed to verify email"))
}

pub async fn list_users(conn: &mut PgConnection, skip: i64, limit: i64) -> AppResult<Vec<User>> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE deleted_at IS NULL ORDER BY created_at DESC, id OFFSET $1 LIMIT $2",
        USER_COLUMNS
    ))
    .bind(skip)
    .bind(limit)
    .fetch_all(conn)
    .await
    .map_err(db_error("Failed to list users"))
}

pub async fn count_users(conn: &mut PgConnection) -> AppResult<i64> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE deleted_at IS NULL")
        .fetch_one(conn)
        .await
        .map_err(db_error("Failed to count users"))
}
