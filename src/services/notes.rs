//! Collaborative notes and their author lists.

use anyhow::anyhow;
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::db::{acquire, begin, commit};
use crate::error::{AppError, AppResult};
use crate::models::notes::{
    AuthorInfo, NewNote, Note, NoteChanges, NoteFilter, NoteListItem, NoteRead,
};
use crate::models::pagination::{Page, PageParams};
use crate::models::users::User;
use crate::queries::notes as queries;
use crate::queries::users::get_active_user_by_id;
use crate::services::permissions::{authorize_author_removal, authorize_note, NoteAction};

fn note_not_found(note_id: Uuid) -> AppError {
    AppError::NotFound(anyhow!("Note with ID {} not found", note_id))
}

fn not_an_author(user_id: Uuid, note_id: Uuid) -> AppError {
    AppError::NotFound(anyhow!(
        "User {} is not an author of note {}",
        user_id,
        note_id
    ))
}

pub fn check_new_author(note: &Note, authors: &[Uuid], user_id: Uuid) -> AppResult<()> {
    if authors.contains(&user_id) {
        return Err(AppError::Conflict(anyhow!(
            "User {} is already an author of note {}",
            user_id,
            note.id
        )));
    }
    Ok(())
}

/// The new owner must already be an author and must not be the current creator.
pub fn check_transfer(note: &Note, authors: &[Uuid], new_owner: Uuid) -> AppResult<()> {
    if new_owner == note.created_by {
        return Err(AppError::BadRequest(anyhow!(
            "User {} already owns note {}",
            new_owner,
            note.id
        )));
    }
    if !authors.contains(&new_owner) {
        return Err(not_an_author(new_owner, note.id));
    }
    Ok(())
}

/// Load a live note with the ids of its authors.
async fn load_note(conn: &mut PgConnection, note_id: Uuid) -> AppResult<(Note, Vec<Uuid>)> {
    let note = queries::get_note(conn, note_id)
        .await?
        .ok_or_else(|| note_not_found(note_id))?;
    let authors = queries::get_author_ids(conn, note_id).await?;
    Ok((note, authors))
}

async fn with_authors(conn: &mut PgConnection, note: Note) -> AppResult<NoteRead> {
    let authors = queries::list_authors(conn, note.id).await?;
    Ok(NoteRead { note, authors })
}

/// The creator becomes the note's first author in the same transaction.
pub async fn create_note(pool: &PgPool, actor: &User, new_note: NewNote) -> AppResult<NoteRead> {
    let mut tx = begin(pool).await?;

    let note = queries::insert_note(&mut tx, actor.id, &new_note).await?;
    queries::insert_author(&mut tx, note.id, actor.id, Some(actor.id)).await?;
    let note = with_authors(&mut tx, note).await?;

    commit(tx).await?;

    info!(note_id = %note.note.id, user_id = %actor.id, "note created");
    Ok(note)
}

pub async fn get_note(pool: &PgPool, viewer: Option<&User>, note_id: Uuid) -> AppResult<NoteRead> {
    let mut conn = acquire(pool).await?;
    let (note, authors) = load_note(&mut conn, note_id).await?;
    authorize_note(viewer, &note, &authors, NoteAction::View)?;
    with_authors(&mut conn, note).await
}

/// Public notes plus, for a signed-in viewer, the notes they author.
pub async fn list_notes(
    pool: &PgPool,
    viewer: Option<&User>,
    filter: NoteFilter,
    params: PageParams,
) -> AppResult<Page<NoteListItem>> {
    let viewer_id = viewer.map(|user| user.id);
    let mut conn = acquire(pool).await?;

    let rows =
        queries::list_visible_notes(&mut conn, viewer_id, filter, params.skip, params.limit)
            .await?;
    let total = queries::count_visible_notes(&mut conn, viewer_id, filter).await?;

    Ok(Page::new(
        rows.into_iter().map(NoteListItem::from).collect(),
        total,
        params,
    ))
}

pub async fn list_my_notes(
    pool: &PgPool,
    actor: &User,
    params: PageParams,
) -> AppResult<Page<NoteListItem>> {
    let mut conn = acquire(pool).await?;

    let rows =
        queries::list_authored_notes(&mut conn, actor.id, params.skip, params.limit).await?;
    let total = queries::count_authored_notes(&mut conn, actor.id).await?;

    Ok(Page::new(
        rows.into_iter().map(NoteListItem::from).collect(),
        total,
        params,
    ))
}

pub async fn update_note(
    pool: &PgPool,
    actor: &User,
    note_id: Uuid,
    changes: NoteChanges,
) -> AppResult<NoteRead> {
    let mut conn = acquire(pool).await?;
    let (note, authors) = load_note(&mut conn, note_id).await?;
    authorize_note(Some(actor), &note, &authors, NoteAction::Edit)?;

    let note = queries::update_note(&mut conn, note_id, &changes).await?;
    info!(note_id = %note_id, user_id = %actor.id, "note updated");
    with_authors(&mut conn, note).await
}

pub async fn delete_note(pool: &PgPool, actor: &User, note_id: Uuid) -> AppResult<()> {
    let mut conn = acquire(pool).await?;
    let (note, authors) = load_note(&mut conn, note_id).await?;
    authorize_note(Some(actor), &note, &authors, NoteAction::Delete)?;

    if !queries::soft_delete_note(&mut conn, note_id).await? {
        return Err(note_not_found(note_id));
    }

    info!(note_id = %note_id, user_id = %actor.id, "note deleted");
    Ok(())
}

pub async fn list_authors(
    pool: &PgPool,
    viewer: Option<&User>,
    note_id: Uuid,
) -> AppResult<Vec<AuthorInfo>> {
    let mut conn = acquire(pool).await?;
    let (note, authors) = load_note(&mut conn, note_id).await?;
    authorize_note(viewer, &note, &authors, NoteAction::View)?;
    queries::list_authors(&mut conn, note_id).await
}

pub async fn add_author(
    pool: &PgPool,
    actor: &User,
    note_id: Uuid,
    user_id: Uuid,
) -> AppResult<Vec<AuthorInfo>> {
    let mut conn = acquire(pool).await?;
    let (note, authors) = load_note(&mut conn, note_id).await?;
    authorize_note(Some(actor), &note, &authors, NoteAction::ManageAuthors)?;

    match get_active_user_by_id(&mut conn, user_id).await? {
        Some(user) if user.can_authenticate() => {}
        _ => return Err(AppError::NotFound(anyhow!("User not found"))),
    }
    check_new_author(&note, &authors, user_id)?;

    queries::insert_author(&mut conn, note_id, user_id, Some(actor.id)).await?;

    info!(note_id = %note_id, author_id = %user_id, added_by = %actor.id, "note author added");
    queries::list_authors(&mut conn, note_id).await
}

pub async fn remove_author(
    pool: &PgPool,
    actor: &User,
    note_id: Uuid,
    user_id: Uuid,
) -> AppResult<()> {
    let mut conn = acquire(pool).await?;
    let (note, authors) = load_note(&mut conn, note_id).await?;
    authorize_author_removal(actor, &note, &authors, user_id)?;

    if !authors.contains(&user_id) || !queries::delete_author(&mut conn, note_id, user_id).await? {
        return Err(not_an_author(user_id, note_id));
    }

    info!(note_id = %note_id, author_id = %user_id, removed_by = %actor.id, "note author removed");
    Ok(())
}

/// Hand the creator role to another author. The previous creator stays an author.
pub async fn transfer_ownership(
    pool: &PgPool,
    actor: &User,
    note_id: Uuid,
    new_owner: Uuid,
) -> AppResult<NoteRead> {
    let mut conn = acquire(pool).await?;
    let (note, authors) = load_note(&mut conn, note_id).await?;
    authorize_note(Some(actor), &note, &authors, NoteAction::TransferOwnership)?;
    check_transfer(&note, &authors, new_owner)?;

    let note = queries::set_note_creator(&mut conn, note_id, new_owner).await?;
    info!(note_id = %note_id, from = %actor.id, to = %new_owner, "note ownership transferred");
    with_authors(&mut conn, note).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notes::NotePrivacy;
    use axum::http::StatusCode;
    use chrono::Utc;

    fn note(created_by: Uuid) -> Note {
        Note {
            id: Uuid::new_v4(),
            title: "Plan".into(),
            content: "Ship it".into(),
            privacy: NotePrivacy::Private,
            created_by,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn existing_author_cannot_be_added_twice() {
        let creator = Uuid::new_v4();
        let n = note(creator);
        let err = check_new_author(&n, &[creator], creator).unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        assert!(check_new_author(&n, &[creator], Uuid::new_v4()).is_ok());
    }

    #[test]
    fn ownership_only_moves_to_another_author() {
        let creator = Uuid::new_v4();
        let collaborator = Uuid::new_v4();
        let n = note(creator);
        let authors = [creator, collaborator];

        assert!(check_transfer(&n, &authors, collaborator).is_ok());
        assert_eq!(
            check_transfer(&n, &authors, Uuid::new_v4()).unwrap_err().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            check_transfer(&n, &authors, creator).unwrap_err().status(),
            StatusCode::BAD_REQUEST
        );
    }
}
