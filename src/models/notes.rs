use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "note_privacy", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotePrivacy {
    Private,
    Public,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub privacy: NotePrivacy,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Note {
    pub fn is_public(&self) -> bool {
        self.privacy == NotePrivacy::Public
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AuthorInfo {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    /// Cleared when the user who added this author is permanently deleted.
    pub added_by: Option<Uuid>,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct NoteRead {
    #[serde(flatten)]
    pub note: Note,
    pub authors: Vec<AuthorInfo>,
}

/// Row shape for listings: the note plus its author count.
#[derive(Debug, sqlx::FromRow)]
pub struct NoteSummaryRow {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub privacy: NotePrivacy,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub authors_count: i64,
}

#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub id: Uuid,
    pub title: String,
    pub privacy: NotePrivacy,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub authors_count: i64,
    pub content_preview: String,
}

impl From<NoteSummaryRow> for NoteListItem {
    fn from(row: NoteSummaryRow) -> Self {
        Self {
            content_preview: preview(&row.content),
            id: row.id,
            title: row.title,
            privacy: row.privacy,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            authors_count: row.authors_count,
        }
    }
}

fn preview(content: &str) -> String {
    if content.chars().count() > PREVIEW_CHARS {
        let cut: String = content.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", cut)
    } else {
        content.to_string()
    }
}

/// Filters accepted by the note listing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoteFilter {
    pub privacy: Option<NotePrivacy>,
    pub creator_id: Option<Uuid>,
}

#[derive(Debug)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub privacy: NotePrivacy,
}

#[derive(Debug, Default)]
pub struct NoteChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub privacy: Option<NotePrivacy>,
}
