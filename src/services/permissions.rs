//! Authorization rules for notes, user records and friend requests.
//!
//! Every check takes rows that were already loaded and returns a
//! [`PermissionError`] naming the attempted action and the resource.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

use crate::models::friends::Friendship;
use crate::models::notes::Note;
use crate::models::users::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteAction {
    View,
    Edit,
    Delete,
    ManageAuthors,
    TransferOwnership,
}

impl fmt::Display for NoteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NoteAction::View => "view",
            NoteAction::Edit => "edit",
            NoteAction::Delete => "delete",
            NoteAction::ManageAuthors => "manage authors of",
            NoteAction::TransferOwnership => "transfer ownership of",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Update,
    Delete,
    PermanentlyDelete,
    ChangeRole,
    ChangeStatus,
}

impl fmt::Display for UserAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UserAction::Update => "update",
            UserAction::Delete => "delete",
            UserAction::PermanentlyDelete => "permanently delete",
            UserAction::ChangeRole => "change the role of",
            UserAction::ChangeStatus => "change the status of",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendRequestOp {
    Respond,
    Cancel,
}

impl fmt::Display for FriendRequestOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FriendRequestOp::Respond => "respond to",
            FriendRequestOp::Cancel => "cancel",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionError {
    #[error("You don't have permission to {action} note {note_id}")]
    Note { action: NoteAction, note_id: Uuid },

    #[error("The creator cannot be removed from note {note_id}")]
    CreatorRemoval { note_id: Uuid },

    #[error("Admin privileges required to {action} user {user_id}")]
    AdminRequired { action: UserAction, user_id: Uuid },

    #[error("You don't have permission to {action} user {user_id}")]
    User { action: UserAction, user_id: Uuid },

    #[error("You can't {action} friend request {friendship_id}")]
    FriendRequest {
        action: FriendRequestOp,
        friendship_id: i32,
    },
}

fn is_author(actor: Option<&User>, authors: &[Uuid]) -> bool {
    actor.is_some_and(|user| authors.contains(&user.id))
}

/// Decide whether `actor` (anonymous when `None`) may perform `action` on `note`.
///
/// View: public, or actor is an author. Edit / manage authors: actor is an
/// author. Delete / transfer ownership: actor is the creator.
pub fn authorize_note(
    actor: Option<&User>,
    note: &Note,
    authors: &[Uuid],
    action: NoteAction,
) -> Result<(), PermissionError> {
    let allowed = match action {
        NoteAction::View => note.is_public() || is_author(actor, authors),
        NoteAction::Edit | NoteAction::ManageAuthors => is_author(actor, authors),
        NoteAction::Delete | NoteAction::TransferOwnership => {
            actor.is_some_and(|user| user.id == note.created_by)
        }
    };

    if allowed {
        Ok(())
    } else {
        Err(PermissionError::Note {
            action,
            note_id: note.id,
        })
    }
}

/// Removing a collaborator: the actor must manage authors, and the creator stays.
pub fn authorize_author_removal(
    actor: &User,
    note: &Note,
    authors: &[Uuid],
    target: Uuid,
) -> Result<(), PermissionError> {
    authorize_note(Some(actor), note, authors, NoteAction::ManageAuthors)?;
    if target == note.created_by {
        return Err(PermissionError::CreatorRemoval { note_id: note.id });
    }
    Ok(())
}

pub fn require_admin(
    actor: &User,
    action: UserAction,
    target_user_id: Uuid,
) -> Result<(), PermissionError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(PermissionError::AdminRequired {
            action,
            user_id: target_user_id,
        })
    }
}

/// Users may act on their own record; admins on anyone's.
pub fn require_self_or_admin(
    actor: &User,
    action: UserAction,
    target_user_id: Uuid,
) -> Result<(), PermissionError> {
    if actor.id == target_user_id || actor.is_admin() {
        Ok(())
    } else {
        Err(PermissionError::User {
            action,
            user_id: target_user_id,
        })
    }
}

/// Only the addressee responds; only the requester cancels.
pub fn authorize_friend_request(
    actor_id: Uuid,
    friendship: &Friendship,
    op: FriendRequestOp,
) -> Result<(), PermissionError> {
    let allowed = match op {
        FriendRequestOp::Respond => friendship.addressee_id == actor_id,
        FriendRequestOp::Cancel => friendship.requester_id == actor_id,
    };
    if allowed {
        Ok(())
    } else {
        Err(PermissionError::FriendRequest {
            action: op,
            friendship_id: friendship.id,
        })
    }
}
