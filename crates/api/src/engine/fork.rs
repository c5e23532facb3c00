//! Story forking.
//!
//! A fork copies the source story's title, genre, and description into a new
//! story owned by the forker, then clones the body text. The two writes are
//! sequenced, not atomic: a fork whose content insert failed is left without
//! content, which reads as an empty body.

use storyhub_core::types::ObjectId;
use storyhub_db::error::StoreError;
use storyhub_db::models::story::NewStory;
use storyhub_db::repositories::StoryRepository;

#[derive(Debug, thiserror::Error)]
pub enum ForkError {
    #[error("cannot fork your own story")]
    SelfForkRejected,

    /// Includes `NotFound` for a missing source and `DuplicateFork`.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Fork `source_id` on behalf of `forker`, returning the new story id.
///
/// At most one fork per (source, forker) pair exists. The pre-check catches
/// the common case; a concurrent fork that slips past it is rejected by the
/// store with the same `DuplicateFork` error.
pub async fn fork_story(
    stories: &dyn StoryRepository,
    source_id: ObjectId,
    forker: ObjectId,
) -> Result<ObjectId, ForkError> {
    let source = stories.get_details(source_id).await?;

    if source.owner_id == forker {
        return Err(ForkError::SelfForkRejected);
    }

    if stories.find_fork(source_id, forker).await?.is_some() {
        return Err(StoreError::DuplicateFork {
            source_id,
            owner_id: forker,
        }
        .into());
    }

    let new_id = stories.create(&NewStory::fork_of(&source, forker)).await?;

    if let Err(e) = clone_content(stories, source_id, new_id).await {
        tracing::warn!(
            source_id = %source_id,
            fork_id = %new_id,
            error = %e,
            "Fork created without content",
        );
    }

    Ok(new_id)
}

async fn clone_content(
    stories: &dyn StoryRepository,
    source_id: ObjectId,
    fork_id: ObjectId,
) -> Result<(), StoreError> {
    let content = stories.get_content(source_id).await?;
    if !content.content.is_empty() {
        stories.insert_content(fork_id, &content.content).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use storyhub_db::repositories::InMemoryStoryRepo;

    use super::*;

    async fn seed(repo: &InMemoryStoryRepo, owner: ObjectId, body: Option<&str>) -> ObjectId {
        let story = NewStory {
            title: "The Glass Orchard".into(),
            genre: "Fantasy".into(),
            description: "Fruit that shows the future, if you can bear it.".into(),
            owner_id: owner,
            collaborators: vec![ObjectId::new()],
            forked_from: None,
        };
        let id = repo.create(&story).await.unwrap();
        if let Some(body) = body {
            repo.edit_content(id, body).await.unwrap();
        }
        id
    }

    #[tokio::test]
    async fn fork_copies_metadata_and_content() {
        let repo = InMemoryStoryRepo::new();
        let (alice, bob) = (ObjectId::new(), ObjectId::new());
        let source = seed(&repo, alice, Some("Hello")).await;

        let fork_id = fork_story(&repo, source, bob).await.unwrap();

        let source_details = repo.get_details(source).await.unwrap();
        let fork = repo.get_details(fork_id).await.unwrap();
        assert_eq!(fork.owner_id, bob);
        assert_eq!(fork.forked_from, Some(source));
        assert_eq!(fork.title, source_details.title);
        assert_eq!(fork.genre, source_details.genre);
        assert_eq!(fork.description, source_details.description);
        assert!(fork.collaborators.is_empty());
        assert_eq!(repo.get_content(fork_id).await.unwrap().content, "Hello");
    }

    #[tokio::test]
    async fn empty_source_yields_no_content_row() {
        let repo = InMemoryStoryRepo::new();
        let source = seed(&repo, ObjectId::new(), None).await;

        let fork_id = fork_story(&repo, source, ObjectId::new()).await.unwrap();
        assert!(!repo.has_content(fork_id));
    }

    #[tokio::test]
    async fn second_fork_by_same_user_conflicts() {
        let repo = InMemoryStoryRepo::new();
        let source = seed(&repo, ObjectId::new(), Some("Hello")).await;
        let bob = ObjectId::new();

        fork_story(&repo, source, bob).await.unwrap();
        assert_matches!(
            fork_story(&repo, source, bob).await,
            Err(ForkError::Store(StoreError::DuplicateFork { .. }))
        );
        assert_eq!(repo.details_count(), 2);

        // A different user may still fork.
        fork_story(&repo, source, ObjectId::new()).await.unwrap();
        assert_eq!(repo.details_count(), 3);
    }

    #[tokio::test]
    async fn self_fork_is_rejected_without_writes() {
        let repo = InMemoryStoryRepo::new();
        let alice = ObjectId::new();
        let source = seed(&repo, alice, Some("Hello")).await;

        assert_matches!(
            fork_story(&repo, source, alice).await,
            Err(ForkError::SelfForkRejected)
        );
        assert_eq!(repo.details_count(), 1);
        assert_eq!(repo.content_count(), 1);
    }

    #[tokio::test]
    async fn missing_source_is_not_found() {
        let repo = InMemoryStoryRepo::new();
        assert_matches!(
            fork_story(&repo, ObjectId::new(), ObjectId::new()).await,
            Err(ForkError::Store(StoreError::NotFound { .. }))
        );
    }

    #[tokio::test]
    async fn content_failure_still_returns_the_fork() {
        let repo = InMemoryStoryRepo::new();
        let source = seed(&repo, ObjectId::new(), Some("Hello")).await;
        repo.fail_on("insert_content");

        let fork_id = fork_story(&repo, source, ObjectId::new()).await.unwrap();

        assert!(repo.get_details(fork_id).await.is_ok());
        assert_eq!(repo.get_content(fork_id).await.unwrap().content, "");
    }
}
