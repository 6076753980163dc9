//! Friend requests and friendships.
//!
//! A pair of users shares at most one row. Decisions about that row are made
//! by the pure functions at the top of this module; the async functions load
//! rows, apply a decision and write it back with conditional updates.

use anyhow::anyhow;
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::db::acquire;
use crate::error::{AppError, AppResult};
use crate::models::friends::{
    Friend, FriendRequestAction, FriendRequestView, Friendship, FriendshipStatus,
};
use crate::models::pagination::{Page, PageParams};
use crate::models::users::User;
use crate::queries::friends as queries;
use crate::queries::users::get_active_user_by_id;
use crate::services::permissions::{authorize_friend_request, FriendRequestOp};

fn ensure_not_self(requester_id: Uuid, addressee_id: Uuid) -> AppResult<()> {
    if requester_id == addressee_id {
        return Err(AppError::Validation(anyhow!(
            "You cannot send a friend request to yourself"
        )));
    }
    Ok(())
}

/// What sending a request between two users should do to their row.
#[derive(Debug, PartialEq, Eq)]
pub enum RequestPlan {
    Insert,
    Reopen(i32),
}

pub fn plan_friend_request(
    requester_id: Uuid,
    addressee_id: Uuid,
    existing: Option<&Friendship>,
) -> AppResult<RequestPlan> {
    ensure_not_self(requester_id, addressee_id)?;

    match existing {
        None => Ok(RequestPlan::Insert),
        Some(friendship) => match friendship.status {
            FriendshipStatus::Pending => Err(AppError::Conflict(anyhow!(
                "A friend request between these users is already pending"
            ))),
            FriendshipStatus::Accepted => Err(AppError::Conflict(anyhow!("Already friends"))),
            FriendshipStatus::Rejected | FriendshipStatus::Cancelled => {
                Ok(RequestPlan::Reopen(friendship.id))
            }
        },
    }
}

fn ensure_pending(friendship: &Friendship) -> AppResult<()> {
    if friendship.status == FriendshipStatus::Pending {
        Ok(())
    } else {
        Err(AppError::BadRequest(anyhow!("Friend request is not pending")))
    }
}

/// Check that `actor_id` may answer `friendship` right now.
pub fn check_response(actor_id: Uuid, friendship: &Friendship) -> AppResult<()> {
    authorize_friend_request(actor_id, friendship, FriendRequestOp::Respond)?;
    ensure_pending(friendship)
}

/// Check that `actor_id` may withdraw `friendship` right now.
pub fn check_cancellation(actor_id: Uuid, friendship: &Friendship) -> AppResult<()> {
    ensure_pending(friendship)?;
    authorize_friend_request(actor_id, friendship, FriendRequestOp::Cancel)?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestDirection {
    Sent,
    Received,
}

#[derive(Debug, Serialize)]
pub struct FriendshipStatusView {
    pub user_id: Uuid,
    pub friendship_status: Option<FriendshipStatus>,
    pub direction: Option<RequestDirection>,
}

pub fn status_view(
    actor_id: Uuid,
    other_id: Uuid,
    friendship: Option<&Friendship>,
) -> FriendshipStatusView {
    FriendshipStatusView {
        user_id: other_id,
        friendship_status: friendship.map(|f| f.status),
        direction: friendship.map(|f| {
            if f.requester_id == actor_id {
                RequestDirection::Sent
            } else {
                RequestDirection::Received
            }
        }),
    }
}

pub async fn send_request(
    pool: &PgPool,
    actor: &User,
    addressee_id: Uuid,
) -> AppResult<Friendship> {
    ensure_not_self(actor.id, addressee_id)?;

    let mut conn = acquire(pool).await?;

    match get_active_user_by_id(&mut conn, addressee_id).await? {
        Some(addressee) if addressee.can_authenticate() => {}
        _ => return Err(AppError::NotFound(anyhow!("User not found"))),
    }

    let existing = queries::get_friendship_between(&mut conn, actor.id, addressee_id).await?;
    let friendship = match plan_friend_request(actor.id, addressee_id, existing.as_ref())? {
        RequestPlan::Insert => {
            queries::insert_friend_request(&mut conn, actor.id, addressee_id).await?
        }
        RequestPlan::Reopen(friendship_id) => {
            queries::reopen_friend_request(&mut conn, friendship_id, actor.id, addressee_id)
                .await?
                .ok_or_else(|| {
                    AppError::Conflict(anyhow!(
                        "A friend request between these users is already pending"
                    ))
                })?
        }
    };

    info!(
        friendship_id = friendship.id,
        requester_id = %actor.id,
        addressee_id = %addressee_id,
        "friend request sent"
    );
    Ok(friendship)
}

pub async fn respond_to_request(
    pool: &PgPool,
    actor: &User,
    friendship_id: i32,
    action: FriendRequestAction,
) -> AppResult<Friendship> {
    let mut conn = acquire(pool).await?;

    let friendship = queries::get_friendship_by_id(&mut conn, friendship_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Friend request not found")))?;
    check_response(actor.id, &friendship)?;

    // Another response may have landed between the read and this write.
    let updated =
        queries::update_pending_request_status(&mut conn, friendship_id, action.resulting_status())
            .await?
            .ok_or_else(|| AppError::BadRequest(anyhow!("Friend request is not pending")))?;

    info!(
        friendship_id,
        actor_id = %actor.id,
        status = ?updated.status,
        "friend request answered"
    );
    Ok(updated)
}

/// Withdraw the caller's pending request to `addressee_id`.
pub async fn cancel_request(pool: &PgPool, actor: &User, addressee_id: Uuid) -> AppResult<()> {
    let mut conn = acquire(pool).await?;

    let friendship = queries::get_friendship_between(&mut conn, actor.id, addressee_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("No pending friend request found")))?;
    check_cancellation(actor.id, &friendship)?;

    queries::update_pending_request_status(&mut conn, friendship.id, FriendshipStatus::Cancelled)
        .await?
        .ok_or_else(|| AppError::BadRequest(anyhow!("Friend request is not pending")))?;

    info!(friendship_id = friendship.id, actor_id = %actor.id, "friend request cancelled");
    Ok(())
}

pub async fn remove_friend(pool: &PgPool, actor: &User, friend_id: Uuid) -> AppResult<()> {
    let mut conn = acquire(pool).await?;

    if !queries::delete_accepted_friendship(&mut conn, actor.id, friend_id).await? {
        return Err(AppError::NotFound(anyhow!("Friendship not found")));
    }

    info!(user_id = %actor.id, friend_id = %friend_id, "friend removed");
    Ok(())
}

pub async fn list_friends(
    pool: &PgPool,
    actor: &User,
    params: PageParams,
) -> AppResult<Page<Friend>> {
    let mut conn = acquire(pool).await?;
    let friends = queries::list_friends(&mut conn, actor.id, params.skip, params.limit).await?;
    let total = queries::count_friends(&mut conn, actor.id).await?;
    Ok(Page::new(friends, total, params))
}

pub async fn pending_requests(pool: &PgPool, actor: &User) -> AppResult<Vec<FriendRequestView>> {
    let mut conn = acquire(pool).await?;
    queries::list_pending_received(&mut conn, actor.id).await
}

pub async fn sent_requests(pool: &PgPool, actor: &User) -> AppResult<Vec<FriendRequestView>> {
    let mut conn = acquire(pool).await?;
    queries::list_pending_sent(&mut conn, actor.id).await
}

pub async fn friendship_status(
    pool: &PgPool,
    actor: &User,
    other_id: Uuid,
) -> AppResult<FriendshipStatusView> {
    let mut conn = acquire(pool).await?;
    let friendship = queries::get_friendship_between(&mut conn, actor.id, other_id).await?;
    Ok(status_view(actor.id, other_id, friendship.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use chrono::Utc;

    fn friendship(requester_id: Uuid, addressee_id: Uuid, status: FriendshipStatus) -> Friendship {
        Friendship {
            id: 1,
            requester_id,
            addressee_id,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn self_request_is_a_validation_error() {
        let me = Uuid::new_v4();
        let err = plan_friend_request(me, me, None).unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn first_request_inserts() {
        assert_eq!(
            plan_friend_request(Uuid::new_v4(), Uuid::new_v4(), None).unwrap(),
            RequestPlan::Insert
        );
    }

    #[test]
    fn pending_request_blocks_both_directions() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let pending = friendship(a, b, FriendshipStatus::Pending);

        let again = plan_friend_request(a, b, Some(&pending)).unwrap_err();
        assert_eq!(again.status(), StatusCode::CONFLICT);

        let reverse = plan_friend_request(b, a, Some(&pending)).unwrap_err();
        assert_eq!(reverse.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn friends_cannot_request_again() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let accepted = friendship(a, b, FriendshipStatus::Accepted);

        let err = plan_friend_request(b, a, Some(&accepted)).unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert!(err.to_string().contains("Already friends"));
    }

    #[test]
    fn closed_requests_are_reopened() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        for status in [FriendshipStatus::Rejected, FriendshipStatus::Cancelled] {
            let closed = friendship(a, b, status);
            assert_eq!(
                plan_friend_request(b, a, Some(&closed)).unwrap(),
                RequestPlan::Reopen(closed.id)
            );
        }
    }

    #[test]
    fn only_addressee_answers_pending_requests() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let pending = friendship(a, b, FriendshipStatus::Pending);

        assert!(check_response(b, &pending).is_ok());
        assert_eq!(
            check_response(a, &pending).unwrap_err().status(),
            StatusCode::FORBIDDEN
        );

        let accepted = friendship(a, b, FriendshipStatus::Accepted);
        assert_eq!(
            check_response(b, &accepted).unwrap_err().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn only_requester_cancels() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let pending = friendship(a, b, FriendshipStatus::Pending);

        assert!(check_cancellation(a, &pending).is_ok());
        assert_eq!(
            check_cancellation(b, &pending).unwrap_err().status(),
            StatusCode::FORBIDDEN
        );
        assert!(check_cancellation(a, &friendship(a, b, FriendshipStatus::Rejected)).is_err());
    }

    #[test]
    fn status_view_reports_direction() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let pending = friendship(a, b, FriendshipStatus::Pending);

        let from_a = status_view(a, b, Some(&pending));
        assert_eq!(from_a.direction, Some(RequestDirection::Sent));
        assert_eq!(from_a.friendship_status, Some(FriendshipStatus::Pending));

        let from_b = status_view(b, a, Some(&pending));
        assert_eq!(from_b.direction, Some(RequestDirection::Received));
        assert_eq!(from_b.user_id, a);

        let none = status_view(a, b, None);
        assert!(none.friendship_status.is_none());
        assert!(none.direction.is_none());
    }
}
