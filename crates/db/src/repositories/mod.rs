//! Repository layer.
//!
//! [`StoryRepository`] is the single owner of both story tables. Two
//! implementations exist: [`PgStoryRepo`] for PostgreSQL and
//! [`InMemoryStoryRepo`] for tests and local runs without a database.
//!
//! Metadata and content are separate aggregates. Operations that touch both
//! define a safe partial state: content may lag behind metadata (an absent
//! content row reads as an empty body), but content is never left behind
//! once its metadata is gone.

use async_trait::async_trait;
use storyhub_core::pagination::PageRequest;
use storyhub_core::types::ObjectId;

use crate::error::StoreError;
use crate::models::story::{NewStory, StoryContent, StoryDetails};

pub mod memory;
pub mod story_repo;

pub use memory::InMemoryStoryRepo;
pub use story_repo::PgStoryRepo;

#[async_trait]
pub trait StoryRepository: Send + Sync {
    /// Insert story metadata with fresh timestamps. No content row is created.
    async fn create(&self, story: &NewStory) -> Result<ObjectId, StoreError>;

    async fn get_details(&self, id: ObjectId) -> Result<StoryDetails, StoreError>;

    /// Body text for a story. A story without a content row yields an empty
    /// body; a missing story is `NotFound`.
    async fn get_content(&self, id: ObjectId) -> Result<StoryContent, StoreError>;

    async fn list(&self, page: PageRequest) -> Result<Vec<StoryDetails>, StoreError>;

    /// Stories whose genre is one of `genres`. An empty slice means no filter.
    async fn list_by_genres(
        &self,
        genres: &[String],
        page: PageRequest,
    ) -> Result<Vec<StoryDetails>, StoreError>;

    async fn list_by_owner(
        &self,
        owner_id: ObjectId,
        page: PageRequest,
    ) -> Result<Vec<StoryDetails>, StoreError>;

    async fn list_by_collaborator(
        &self,
        user_id: ObjectId,
        page: PageRequest,
    ) -> Result<Vec<StoryDetails>, StoreError>;

    /// Upsert the content row, then touch the metadata `updated_at`.
    async fn edit_content(&self, id: ObjectId, body: &str) -> Result<bool, StoreError>;

    /// Delete metadata (`NotFound` if absent), then the content row if any.
    async fn delete(&self, id: ObjectId) -> Result<bool, StoreError>;

    /// Delete every story owned by `owner_id` along with its content.
    /// Succeeds without touching anything when the owner has no stories.
    async fn delete_all_by_owner(&self, owner_id: ObjectId) -> Result<bool, StoreError>;

    async fn get_collaborators(&self, id: ObjectId) -> Result<Vec<ObjectId>, StoreError>;

    /// Append `user_id` to the collaborator list unless already present.
    async fn add_collaborator(
        &self,
        id: ObjectId,
        user_id: ObjectId,
    ) -> Result<StoryDetails, StoreError>;

    /// Remove every occurrence of `user_id`. Returns `false` when the user was
    /// not a collaborator.
    async fn remove_collaborator(&self, id: ObjectId, user_id: ObjectId)
        -> Result<bool, StoreError>;

    /// The fork of `source_id` owned by `owner_id`, if one exists.
    async fn find_fork(
        &self,
        source_id: ObjectId,
        owner_id: ObjectId,
    ) -> Result<Option<StoryDetails>, StoreError>;

    /// Insert a content row for a story that has none yet.
    async fn insert_content(&self, story_id: ObjectId, body: &str) -> Result<ObjectId, StoreError>;

    /// Every owner id that appears on at least one story.
    async fn distinct_owners(&self) -> Result<Vec<ObjectId>, StoreError>;

    async fn story_ids_by_owners(&self, owners: &[ObjectId]) -> Result<Vec<ObjectId>, StoreError>;

    /// Returns the number of metadata rows deleted.
    async fn delete_details_by_owners(&self, owners: &[ObjectId]) -> Result<u64, StoreError>;

    /// Returns the number of content rows deleted.
    async fn delete_content_by_story_ids(&self, story_ids: &[ObjectId]) -> Result<u64, StoreError>;

    /// Strip `users` from every collaborator list. Returns the number of
    /// stories changed. Stories themselves are never deleted here.
    async fn pull_collaborators(&self, users: &[ObjectId]) -> Result<u64, StoreError>;

    /// Liveness round-trip.
    async fn ping(&self) -> Result<(), StoreError>;
}
