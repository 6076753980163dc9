use anyhow::anyhow;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::notes::{AuthorInfo, NewNote, Note, NoteChanges, NoteFilter, NoteSummaryRow};

const NOTE_COLUMNS: &str =
    "id, title, content, privacy, created_by, created_at, updated_at, deleted_at";

const SUMMARY_COLUMNS: &str = r#"
    n.id, n.title, n.content, n.privacy, n.created_by, n.created_at, n.updated_at,
    (SELECT COUNT(*) FROM note_authors a WHERE a.note_id = n.id) AS authors_count
"#;

// Public notes, plus those authored by $1 when a viewer is given.
const VISIBLE_NOTES: &str = r#"
    FROM notes n
    WHERE n.deleted_at IS NULL
      AND (n.privacy = 'public'
           OR ($1::uuid IS NOT NULL AND EXISTS (
               SELECT 1 FROM note_authors a WHERE a.note_id = n.id AND a.user_id = $1)))
      AND ($2::note_privacy IS NULL OR n.privacy = $2)
      AND ($3::uuid IS NULL OR n.created_by = $3)
"#;

const AUTHORED_NOTES: &str = r#"
    FROM notes n
    JOIN note_authors me ON me.note_id = n.id AND me.user_id = $1
    WHERE n.deleted_at IS NULL
"#;

fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| {
        tracing::error!(error = %e, "{}", context);
        AppError::InternalServerError(anyhow!("{}: {}", context, e))
    }
}

/// A note that has not been soft-deleted.
pub async fn get_note(conn: &mut PgConnection, note_id: Uuid) -> AppResult<Option<Note>> {
    sqlx::query_as::<_, Note>(&format!(
        "SELECT {} FROM notes WHERE id = $1 AND deleted_at IS NULL",
        NOTE_COLUMNS
    ))
    .bind(note_id)
    .fetch_optional(conn)
    .await
    .map_err(db_error("Failed to fetch note"))
}

pub async fn get_author_ids(conn: &mut PgConnection, note_id: Uuid) -> AppResult<Vec<Uuid>> {
    sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM note_authors WHERE note_id = $1")
        .bind(note_id)
        .fetch_all(conn)
        .await
        .map_err(db_error("Failed to fetch note authors"))
}

pub async fn list_authors(conn: &mut PgConnection, note_id: Uuid) -> AppResult<Vec<AuthorInfo>> {
    sqlx::query_as::<_, AuthorInfo>(
        r#"
        SELECT u.id, u.username, u.name, a.added_by, a.added_at
        FROM note_authors a
        JOIN users u ON u.id = a.user_id
        WHERE a.note_id = $1
        ORDER BY a.added_at, u.username
        "#,
    )
    .bind(note_id)
    .fetch_all(conn)
    .await
    .map_err(db_error("Failed to list note authors"))
}

pub async fn insert_note(
    conn: &mut PgConnection,
    created_by: Uuid,
    new_note: &NewNote,
) -> AppResult<Note> {
    sqlx::query_as::<_, Note>(&format!(
        "INSERT INTO notes (id, title, content, privacy, created_by) VALUES ($1, $2, $3, $4, $5) RETURNING {}",
        NOTE_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(&new_note.title)
    .bind(&new_note.content)
    .bind(new_note.privacy)
    .bind(created_by)
    .fetch_one(conn)
    .await
    .map_err(db_error("Failed to create note"))
}

pub async fn insert_author(
    conn: &mut PgConnection,
    note_id: Uuid,
    user_id: Uuid,
    added_by: Option<Uuid>,
) -> AppResult<()> {
    sqlx::query("INSERT INTO note_authors (note_id, user_id, added_by) VALUES ($1, $2, $3)")
        .bind(note_id)
        .bind(user_id)
        .bind(added_by)
        .execute(conn)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::Conflict(anyhow!("User is already an author of this note"));
                }
            }
            tracing::error!(error = %e, "failed to add note author");
            AppError::InternalServerError(anyhow!("Failed to add note author: {}", e))
        })?;

    Ok(())
}

pub async fn delete_author(conn: &mut PgConnection, note_id: Uuid, user_id: Uuid) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM note_authors WHERE note_id = $1 AND user_id = $2")
        .bind(note_id)
        .bind(user_id)
        .execute(conn)
        .await
        .map_err(db_error("Failed to remove note author"))?;

    Ok(result.rows_affected() > 0)
}

/// `None` fields keep their current value.
pub async fn update_note(
    conn: &mut PgConnection,
    note_id: Uuid,
    changes: &NoteChanges,
) -> AppResult<Note> {
    sqlx::query_as::<_, Note>(&format!(
        r#"
        UPDATE notes SET
            title = COALESCE($2, title),
            content = COALESCE($3, content),
            privacy = COALESCE($4, privacy),
            updated_at = NOW()
        WHERE id = $1 AND deleted_at IS NULL
        RETURNING {}
        "#,
        NOTE_COLUMNS
    ))
    .bind(note_id)
    .bind(&changes.title)
    .bind(&changes.content)
    .bind(changes.privacy)
    .fetch_optional(conn)
    .await
    .map_err(db_error("Failed to update note"))?
    .ok_or_else(|| AppError::NotFound(anyhow!("Note not found")))
}

pub async fn soft_delete_note(conn: &mut PgConnection, note_id: Uuid) -> AppResult<bool> {
    let result = sqlx::query(
        "UPDATE notes SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(note_id)
    .execute(conn)
    .await
    .map_err(db_error("Failed to delete note"))?;

    Ok(result.rows_affected() > 0)
}

pub async fn set_note_creator(
    conn: &mut PgConnection,
    note_id: Uuid,
    new_creator: Uuid,
) -> AppResult<Note> {
    sqlx::query_as::<_, Note>(&format!(
        "UPDATE notes SET created_by = $2, updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL RETURNING {}",
        NOTE_COLUMNS
    ))
    .bind(note_id)
    .bind(new_creator)
    .fetch_optional(conn)
    .await
    .map_err(db_error("Failed to transfer note ownership"))?
    .ok_or_else(|| AppError::NotFound(anyhow!("Note not found")))
}

pub async fn list_visible_notes(
    conn: &mut PgConnection,
    viewer_id: Option<Uuid>,
    filter: NoteFilter,
    skip: i64,
    limit: i64,
) -> AppResult<Vec<NoteSummaryRow>> {
    sqlx::query_as::<_, NoteSummaryRow>(&format!(
        "SELECT {} {} ORDER BY n.created_at DESC, n.id OFFSET $4 LIMIT $5",
        SUMMARY_COLUMNS, VISIBLE_NOTES
    ))
    .bind(viewer_id)
    .bind(filter.privacy)
    .bind(filter.creator_id)
    .bind(skip)
    .bind(limit)
    .fetch_all(conn)
    .await
    .map_err(db_error("Failed to list notes"))
}

pub async fn count_visible_notes(
    conn: &mut PgConnection,
    viewer_id: Option<Uuid>,
    filter: NoteFilter,
) -> AppResult<i64> {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) {}", VISIBLE_NOTES))
        .bind(viewer_id)
        .bind(filter.privacy)
        .bind(filter.creator_id)
        .fetch_one(conn)
        .await
        .map_err(db_error("Failed to count notes"))
}

pub async fn list_authored_notes(
    conn: &mut PgConnection,
    user_id: Uuid,
    skip: i64,
    limit: i64,
) -> AppResult<Vec<NoteSummaryRow>> {
    sqlx::query_as::<_, NoteSummaryRow>(&format!(
        "SELECT {} {} ORDER BY n.created_at DESC, n.id OFFSET $2 LIMIT $3",
        SUMMARY_COLUMNS, AUTHORED_NOTES
    ))
    .bind(user_id)
    .bind(skip)
    .bind(limit)
    .fetch_all(conn)
    .await
    .map_err(db_error("Failed to list authored notes"))
}

pub async fn count_authored_notes(conn: &mut PgConnection, user_id: Uuid) -> AppResult<i64> {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) {}", AUTHORED_NOTES))
        .bind(user_id)
        .fetch_one(conn)
        .await
        .map_err(db_error("Failed to count authored notes"))
}
