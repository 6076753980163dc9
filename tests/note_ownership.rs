//! Runs against a real database:
//! `TEST_DATABASE_URL=postgres://... cargo test -- --ignored`

use notes_backend::db::{acquire, run_migrations};
use notes_backend::models::notes::{NewNote, NotePrivacy, NoteChanges};
use notes_backend::models::users::{User, UserRole};
use notes_backend::queries::users::update_user_role;
use notes_backend::services::{notes, users};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

async fn pool() -> PgPool {
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

async fn register(pool: &PgPool, name: &str) -> User {
    let tag = Uuid::new_v4().simple().to_string();
    users::register(
        pool,
        None,
        "http://localhost:3000",
        users::Registration {
            email: format!("{}-{}@example.com", name, &tag[..12]),
            username: format!("{}_{}", name, &tag[..12]),
            name: name.to_string(),
            age: None,
            bio: None,
            password: "Secur3P@ss".to_string(),
        },
    )
    .await
    .unwrap()
}

#[tokio::test]
#[ignore] // Needs TEST_DATABASE_URL
async fn new_owner_stays_an_author_after_previous_owner_is_purged() {
    let pool = pool().await;
    let alice = register(&pool, "alice").await;
    let bob = register(&pool, "bob").await;
    let carol = register(&pool, "carol").await;

    let admin = register(&pool, "admin").await;
    let admin = update_user_role(&mut acquire(&pool).await.unwrap(), admin.id, UserRole::Admin)
        .await
        .unwrap();

    let note = notes::create_note(
        &pool,
        &alice,
        NewNote {
            title: "Roadmap".into(),
            content: "Q3 plans".into(),
            privacy: NotePrivacy::Private,
        },
    )
    .await
    .unwrap();
    let note_id = note.note.id;

    notes::add_author(&pool, &alice, note_id, bob.id).await.unwrap();
    notes::transfer_ownership(&pool, &alice, note_id, bob.id)
        .await
        .unwrap();
    notes::add_author(&pool, &alice, note_id, carol.id)
        .await
        .unwrap();

    users::delete_user(&pool, &admin, alice.id, true).await.unwrap();

    let note = notes::get_note(&pool, Some(&bob), note_id).await.unwrap();
    assert_eq!(note.note.created_by, bob.id);
    let author_ids: Vec<Uuid> = note.authors.iter().map(|a| a.id).collect();
    assert!(author_ids.contains(&bob.id));
    assert!(author_ids.contains(&carol.id));
    assert!(!author_ids.contains(&alice.id));
    assert!(note.authors.iter().all(|a| a.added_by != Some(alice.id)));

    let updated = notes::update_note(
        &pool,
        &bob,
        note_id,
        NoteChanges {
            title: Some("Roadmap v2".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.note.title, "Roadmap v2");

    notes::get_note(&pool, Some(&carol), note_id).await.unwrap();
}
