use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "friendship_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
}

/*
id SERIAL PRIMARY KEY,
requester_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
addressee_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
status friendship_status NOT NULL DEFAULT 'pending',
one row per unordered (requester_id, addressee_id) pair
 */
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Friendship {
    pub id: i32,
    pub requester_id: Uuid,
    pub addressee_id: Uuid,
    pub status: FriendshipStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Friendship {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.requester_id == user_id || self.addressee_id == user_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendRequestAction {
    Accept,
    Reject,
}

impl FriendRequestAction {
    pub fn resulting_status(self) -> FriendshipStatus {
        match self {
            FriendRequestAction::Accept => FriendshipStatus::Accepted,
            FriendRequestAction::Reject => FriendshipStatus::Rejected,
        }
    }
}

/// A friend as seen from the other side of an accepted friendship.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Friend {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub email: String,
    pub is_active: bool,
    pub friendship_status: FriendshipStatus,
    pub friendship_since: DateTime<Utc>,
}

/// A friend request together with the user on the other side of it.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct FriendRequestView {
    pub id: i32,
    pub user_id: Uuid,
    pub username: String,
    pub name: String,
    pub status: FriendshipStatus,
    pub created_at: DateTime<Utc>,
}
