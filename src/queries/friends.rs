use anyhow::anyhow;
use sqlx::postgres::PgConnection;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::friends::{Friend, FriendRequestView, Friendship, FriendshipStatus},
};

const FRIENDSHIP_COLUMNS: &str = "id, requester_id, addressee_id, status, created_at, updated_at";

/// The single row for the unordered pair `{user_a, user_b}`, if any.
pub async fn get_friendship_between(
    conn: &mut PgConnection,
    user_a: Uuid,
    user_b: Uuid,
) -> AppResult<Option<Friendship>> {
    sqlx::query_as::<_, Friendship>(&format!(
        r#"
        SELECT {} FROM friendships
        WHERE (requester_id = $1 AND addressee_id = $2)
           OR (requester_id = $2 AND addressee_id = $1)
        "#,
        FRIENDSHIP_COLUMNS
    ))
    .bind(user_a)
    .bind(user_b)
    .fetch_optional(conn)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "failed to fetch friendship");
        AppError::InternalServerError(anyhow!("Failed to fetch friendship: {}", e))
    })
}

pub async fn get_friendship_by_id(
    conn: &mut PgConnection,
    friendship_id: i32,
) -> AppResult<Option<Friendship>> {
    sqlx::query_as::<_, Friendship>(&format!(
        "SELECT {} FROM friendships WHERE id = $1",
        FRIENDSHIP_COLUMNS
    ))
    .bind(friendship_id)
    .fetch_optional(conn)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "failed to fetch friend request");
        AppError::InternalServerError(anyhow!("Failed to fetch friend request: {}", e))
    })
}

pub async fn insert_friend_request(
    conn: &mut PgConnection,
    requester_id: Uuid,
    addressee_id: Uuid,
) -> AppResult<Friendship> {
    sqlx::query_as::<_, Friendship>(&format!(
        "INSERT INTO friendships (requester_id, addressee_id, status) VALUES ($1, $2, $3) RETURNING {}",
        FRIENDSHIP_COLUMNS
    ))
    .bind(requester_id)
    .bind(addressee_id)
    .bind(FriendshipStatus::Pending)
    .fetch_one(conn)
    .await
    .map_err(|e| {
        // A concurrent request for the same pair won the insert.
        if let Some(db_err) = e.as_database_error() {
            if db_err.constraint() == Some("friendships_pair_key") {
                return AppError::Conflict(anyhow!("Friend request already exists"));
            }
        }
        tracing::error!(error = %e, "failed to send friend request");
        AppError::InternalServerError(anyhow!("Failed to send friend request: {}", e))
    })
}

/// Turns a rejected or cancelled row back into a pending request in the new
/// direction. `None` if the row was no longer closed.
pub async fn reopen_friend_request(
    conn: &mut PgConnection,
    friendship_id: i32,
    requester_id: Uuid,
    addressee_id: Uuid,
) -> AppResult<Option<Friendship>> {
    sqlx::query_as::<_, Friendship>(&format!(
        r#"
        UPDATE friendships
        SET requester_id = $2, addressee_id = $3, status = 'pending',
            created_at = NOW(), updated_at = NOW()
        WHERE id = $1 AND status IN ('rejected', 'cancelled')
        RETURNING {}
        "#,
        FRIENDSHIP_COLUMNS
    ))
    .bind(friendship_id)
    .bind(requester_id)
    .bind(addressee_id)
    .fetch_optional(conn)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "failed to reopen friend request");
        AppError::InternalServerError(anyhow!("Failed to send friend request: {}", e))
    })
}

/// Moves a pending request to `status`. Returns `None` when the request was
/// not pending anymore, so two concurrent responses cannot both succeed.
pub async fn update_pending_request_status(
    conn: &mut PgConnection,
    friendship_id: i32,
    status: FriendshipStatus,
) -> AppResult<Option<Friendship>> {
    sqlx::query_as::<_, Friendship>(&format!(
        r#"
        UPDATE friendships SET status = $2, updated_at = NOW()
        WHERE id = $1 AND status = 'pending'
        RETURNING {}
        "#,
        FRIENDSHIP_COLUMNS
    ))
    .bind(friendship_id)
    .bind(status)
    .fetch_optional(conn)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "failed to update friend request status");
        AppError::InternalServerError(anyhow!(
            "Failed to update friend request status: {}",
            e
        ))
    })
}

pub async fn delete_accepted_friendship(
    conn: &mut PgConnection,
    user_a: Uuid,
    user_b: Uuid,
) -> AppResult<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM friendships
        WHERE status = 'accepted'
          AND ((requester_id = $1 AND addressee_id = $2)
            OR (requester_id = $2 AND addressee_id = $1))
        "#,
    )
    .bind(user_a)
    .bind(user_b)
    .execute(conn)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "failed to remove friend");
        AppError::InternalServerError(anyhow!("Failed to remove friend: {}", e))
    })?;

    Ok(result.rows_affected() > 0)
}

pub async fn list_friends(
    conn: &mut PgConnection,
    user_id: Uuid,
    skip: i64,
    limit: i64,
) -> AppResult<Vec<Friend>> {
    sqlx::query_as::<_, Friend>(
        r#"
        SELECT u.id, u.username, u.name, u.email, u.is_active,
               f.status AS friendship_status, f.updated_at AS friendship_since
        FROM friendships f
        JOIN users u ON u.id = CASE WHEN f.requester_id = $1 THEN f.addressee_id ELSE f.requester_id END
        WHERE (f.requester_id = $1 OR f.addressee_id = $1)
          AND f.status = 'accepted'
          AND u.deleted_at IS NULL
        ORDER BY f.updated_at DESC, f.id
        OFFSET $2 LIMIT $3
        "#,
    )
    .bind(user_id)
    .bind(skip)
    .bind(limit)
    .fetch_all(conn)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "failed to list friends");
        AppError::InternalServerError(anyhow!("Failed to list friends: {}", e))
    })
}

pub async fn count_friends(conn: &mut PgConnection, user_id: Uuid) -> AppResult<i64> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM friendships f
        JOIN users u ON u.id = CASE WHEN f.requester_id = $1 THEN f.addressee_id ELSE f.requester_id END
        WHERE (f.requester_id = $1 OR f.addressee_id = $1)
          AND f.status = 'accepted'
          AND u.deleted_at IS NULL
        "#,
    )
    .bind(user_id)
    .fetch_one(conn)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "failed to count friends");
        AppError::InternalServerError(anyhow!("Failed to count friends: {}", e))
    })
}

/// Pending requests addressed to `user_id`, with the requester's details.
pub async fn list_pending_received(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> AppResult<Vec<FriendRequestView>> {
    sqlx::query_as::<_, FriendRequestView>(
        r#"
        SELECT f.id, u.id AS user_id, u.username, u.name, f.status, f.created_at
        FROM friendships f
        JOIN users u ON u.id = f.requester_id
        WHERE f.addressee_id = $1 AND f.status = 'pending' AND u.deleted_at IS NULL
        ORDER BY f.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "failed to list pending friend requests");
        AppError::InternalServerError(anyhow!("Failed to list pending requests: {}", e))
    })
}

/// Pending requests sent by `user_id`, with the addressee's details.
pub async fn list_pending_sent(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> AppResult<Vec<FriendRequestView>> {
    sqlx::query_as::<_, FriendRequestView>(
        r#"
        SELECT f.id, u.id AS user_id, u.username, u.name, f.status, f.created_at
        FROM friendships f
        JOIN users u ON u.id = f.addressee_id
        WHERE f.requester_id = $1 AND f.status = 'pending' AND u.deleted_at IS NULL
        ORDER BY f.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "failed to list sent friend requests");
        AppError::InternalServerError(anyhow!("Failed to list sent requests: {}", e))
    })
}
