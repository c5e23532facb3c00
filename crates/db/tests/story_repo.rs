//! PostgreSQL-backed checks for `PgStoryRepo`.
//!
//! These need a live database (`DATABASE_URL`) and are skipped by default:
//! `cargo test -p storyhub-db -- --ignored`.

use assert_matches::assert_matches;
use sqlx::PgPool;
use storyhub_core::pagination::PageRequest;
use storyhub_core::types::ObjectId;
use storyhub_db::error::StoreError;
use storyhub_db::models::story::NewStory;
use storyhub_db::repositories::{PgStoryRepo, StoryRepository};

fn new_story(owner_id: ObjectId, genre: &str) -> NewStory {
    NewStory {
        title: "Salt and Iron".into(),
        genre: genre.into(),
        description: "Two families fight over a drowned mine.".into(),
        owner_id,
        collaborators: Vec::new(),
        forked_from: None,
    }
}

async fn count(pool: &PgPool, table: &str) -> i64 {
    let row: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap_or_else(|e| panic!("{table} count failed: {e}"));
    row.0
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn create_then_read_back(pool: PgPool) {
    let repo = PgStoryRepo::new(pool.clone());
    let owner = ObjectId::new();
    let collaborator = ObjectId::new();
    let mut story = new_story(owner, "Western");
    story.collaborators = vec![collaborator];

    let id = repo.create(&story).await.unwrap();
    let details = repo.get_details(id).await.unwrap();

    assert_eq!(details.id, id);
    assert_eq!(details.owner_id, owner);
    assert_eq!(details.collaborators, vec![collaborator]);
    assert_eq!(details.created_at, details.updated_at);
    assert!(details.forked_from.is_none());
    assert_eq!(count(&pool, "story_content").await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn unknown_id_is_not_found(pool: PgPool) {
    let repo = PgStoryRepo::new(pool);
    let missing = ObjectId::new();

    assert_matches!(repo.get_details(missing).await, Err(StoreError::NotFound { .. }));
    assert_matches!(repo.get_content(missing).await, Err(StoreError::NotFound { .. }));
    assert_matches!(repo.edit_content(missing, "x").await, Err(StoreError::NotFound { .. }));
    assert_matches!(repo.delete(missing).await, Err(StoreError::NotFound { .. }));
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn edit_content_upserts_one_row(pool: PgPool) {
    let repo = PgStoryRepo::new(pool.clone());
    let id = repo.create(&new_story(ObjectId::new(), "Western")).await.unwrap();

    assert_eq!(repo.get_content(id).await.unwrap().content, "");
    repo.edit_content(id, "Chapter one").await.unwrap();
    repo.edit_content(id, "Chapter one, revised").await.unwrap();

    assert_eq!(count(&pool, "story_content").await, 1);
    assert_eq!(repo.get_content(id).await.unwrap().content, "Chapter one, revised");
    let details = repo.get_details(id).await.unwrap();
    assert!(details.updated_at > details.created_at);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn delete_all_by_owner_cascades_to_content(pool: PgPool) {
    let repo = PgStoryRepo::new(pool.clone());
    let (alice, bob) = (ObjectId::new(), ObjectId::new());
    let a = repo.create(&new_story(alice, "Western")).await.unwrap();
    let b = repo.create(&new_story(bob, "Western")).await.unwrap();
    repo.edit_content(a, "alice").await.unwrap();
    repo.edit_content(b, "bob").await.unwrap();

    assert!(repo.delete_all_by_owner(alice).await.unwrap());
    assert_eq!(count(&pool, "story_details").await, 1);
    assert_eq!(count(&pool, "story_content").await, 1);
    assert_eq!(repo.get_content(b).await.unwrap().content, "bob");
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn fork_uniqueness_is_enforced_by_the_database(pool: PgPool) {
    let repo = PgStoryRepo::new(pool);
    let source = repo.create(&new_story(ObjectId::new(), "Western")).await.unwrap();
    let forker = ObjectId::new();
    let source_details = repo.get_details(source).await.unwrap();
    let fork = NewStory::fork_of(&source_details, forker);

    let first = repo.create(&fork).await.unwrap();
    assert_matches!(repo.create(&fork).await, Err(StoreError::DuplicateFork { .. }));

    let found = repo.find_fork(source, forker).await.unwrap().unwrap();
    assert_eq!(found.id, first);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn listings_are_newest_first_and_filtered(pool: PgPool) {
    let repo = PgStoryRepo::new(pool);
    let owner = ObjectId::new();
    let older = repo.create(&new_story(owner, "Western")).await.unwrap();
    let newer = repo.create(&new_story(owner, "Noir")).await.unwrap();

    let all = repo.list(PageRequest::new(1, 10)).await.unwrap();
    assert_eq!(all.iter().map(|d| d.id).collect::<Vec<_>>(), vec![newer, older]);

    let noir = repo
        .list_by_genres(&["Noir".to_string()], PageRequest::new(1, 10))
        .await
        .unwrap();
    assert_eq!(noir.len(), 1);
    assert_eq!(noir[0].id, newer);

    let second_page = repo.list_by_owner(owner, PageRequest::new(2, 1)).await.unwrap();
    assert_eq!(second_page.len(), 1);
    assert_eq!(second_page[0].id, older);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn orphan_cleanup_primitives(pool: PgPool) {
    let repo = PgStoryRepo::new(pool.clone());
    let (gone, kept) = (ObjectId::new(), ObjectId::new());
    let doomed = repo.create(&new_story(gone, "Western")).await.unwrap();
    repo.edit_content(doomed, "to be removed").await.unwrap();

    let mut shared = new_story(kept, "Western");
    shared.collaborators = vec![gone, ObjectId::new()];
    let survivor = repo.create(&shared).await.unwrap();

    let mut owners = repo.distinct_owners().await.unwrap();
    owners.sort();
    let mut expected = vec![gone, kept];
    expected.sort();
    assert_eq!(owners, expected);

    let ids = repo.story_ids_by_owners(&[gone]).await.unwrap();
    assert_eq!(ids, vec![doomed]);
    assert_eq!(repo.delete_details_by_owners(&[gone]).await.unwrap(), 1);
    assert_eq!(repo.delete_content_by_story_ids(&ids).await.unwrap(), 1);
    assert_eq!(repo.pull_collaborators(&[gone]).await.unwrap(), 1);

    let remaining = repo.get_collaborators(survivor).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert!(!remaining.contains(&gone));
    assert_eq!(count(&pool, "story_content").await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn ping_succeeds(pool: PgPool) {
    storyhub_db::health_check(&pool).await.unwrap();
    PgStoryRepo::new(pool).ping().await.unwrap();
}
