use crate::app_state::AppState;
use crate::handlers::v1::notes;
use axum::{
    routing::{delete, get, post},
    Router,
};

pub fn notes_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(notes::create_note).get(notes::list_notes))
        .route("/my", get(notes::list_my_notes))
        .route(
            "/{note_id}",
            get(notes::get_note)
                .put(notes::update_note)
                .delete(notes::delete_note),
        )
        .route(
            "/{note_id}/authors",
            get(notes::list_authors).post(notes::add_author),
        )
        .route("/{note_id}/authors/{user_id}", delete(notes::remove_author))
        .route("/{note_id}/owner", post(notes::transfer_ownership))
}
