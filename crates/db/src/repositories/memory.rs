//! In-process [`StoryRepository`] used by tests and database-less local runs.
//!
//! Mirrors the PostgreSQL semantics: lazy content, one content row per story,
//! one fork per (source, forker), newest-first listing. Individual operations
//! can be made to fail with [`InMemoryStoryRepo::fail_on`] to exercise the
//! partial-failure paths of multi-step callers.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use storyhub_core::pagination::PageRequest;
use storyhub_core::types::ObjectId;

use crate::error::StoreError;
use crate::models::story::{NewStory, StoryContent, StoryDetails};
use crate::repositories::StoryRepository;

#[derive(Debug, Default)]
struct State {
    details: BTreeMap<ObjectId, StoryDetails>,
    /// Keyed by `story_id`.
    contents: HashMap<ObjectId, StoryContent>,
    failing: HashSet<&'static str>,
}

impl State {
    fn check(&self, op: &'static str) -> Result<(), StoreError> {
        if self.failing.contains(op) {
            return Err(StoreError::Unavailable(format!("{op} failed (injected)")));
        }
        Ok(())
    }

    fn page<F>(&self, page: PageRequest, mut keep: F) -> Vec<StoryDetails>
    where
        F: FnMut(&StoryDetails) -> bool,
    {
        let mut matching: Vec<&StoryDetails> = self.details.values().filter(|d| keep(d)).collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit()).unwrap_or(0);
        matching.into_iter().skip(offset).take(limit).cloned().collect()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStoryRepo {
    state: Mutex<State>,
}

impl InMemoryStoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call of the named trait method fail with
    /// [`StoreError::Unavailable`] until [`Self::recover`] is called.
    pub fn fail_on(&self, op: &'static str) {
        self.lock().failing.insert(op);
    }

    pub fn recover(&self, op: &'static str) {
        self.lock().failing.remove(op);
    }

    /// Number of stored metadata rows.
    pub fn details_count(&self) -> usize {
        self.lock().details.len()
    }

    /// Number of stored content rows.
    pub fn content_count(&self) -> usize {
        self.lock().contents.len()
    }

    /// Whether a content row exists for the story.
    pub fn has_content(&self, story_id: ObjectId) -> bool {
        self.lock().contents.contains_key(&story_id)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means a test thread panicked mid-operation; the
        // maps themselves are still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl StoryRepository for InMemoryStoryRepo {
    async fn create(&self, story: &NewStory) -> Result<ObjectId, StoreError> {
        let mut state = self.lock();
        state.check("create")?;

        if let Some(source_id) = story.forked_from {
            let duplicate = state
                .details
                .values()
                .any(|d| d.forked_from == Some(source_id) && d.owner_id == story.owner_id);
            if duplicate {
                return Err(StoreError::DuplicateFork {
                    source_id,
                    owner_id: story.owner_id,
                });
            }
        }

        let id = ObjectId::new();
        let now = Utc::now();
        state.details.insert(
            id,
            StoryDetails {
                id,
                title: story.title.clone(),
                genre: story.genre.clone(),
                description: story.description.clone(),
                owner_id: story.owner_id,
                collaborators: story.collaborators.clone(),
                created_at: now,
                updated_at: now,
                forked_from: story.forked_from,
            },
        );
        Ok(id)
    }

    async fn get_details(&self, id: ObjectId) -> Result<StoryDetails, StoreError> {
        let state = self.lock();
        state.check("get_details")?;
        state
            .details
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::story_not_found(id))
    }

    async fn get_content(&self, id: ObjectId) -> Result<StoryContent, StoreError> {
        let state = self.lock();
        state.check("get_content")?;
        if !state.details.contains_key(&id) {
            return Err(StoreError::story_not_found(id));
        }
        Ok(state
            .contents
            .get(&id)
            .cloned()
            .unwrap_or_else(|| StoryContent::empty(id)))
    }

    async fn list(&self, page: PageRequest) -> Result<Vec<StoryDetails>, StoreError> {
        let state = self.lock();
        state.check("list")?;
        Ok(state.page(page, |_| true))
    }

    async fn list_by_genres(
        &self,
        genres: &[String],
        page: PageRequest,
    ) -> Result<Vec<StoryDetails>, StoreError> {
        let state = self.lock();
        state.check("list_by_genres")?;
        Ok(state.page(page, |d| genres.is_empty() || genres.contains(&d.genre)))
    }

    async fn list_by_owner(
        &self,
        owner_id: ObjectId,
        page: PageRequest,
    ) -> Result<Vec<StoryDetails>, StoreError> {
        let state = self.lock();
        state.check("list_by_owner")?;
        Ok(state.page(page, |d| d.owner_id == owner_id))
    }

    async fn list_by_collaborator(
        &self,
        user_id: ObjectId,
        page: PageRequest,
    ) -> Result<Vec<StoryDetails>, StoreError> {
        let state = self.lock();
        state.check("list_by_collaborator")?;
        Ok(state.page(page, |d| d.collaborators.contains(&user_id)))
    }

    async fn edit_content(&self, id: ObjectId, body: &str) -> Result<bool, StoreError> {
        let mut state = self.lock();
        state.check("edit_content")?;
        if !state.details.contains_key(&id) {
            return Err(StoreError::story_not_found(id));
        }

        state
            .contents
            .entry(id)
            .and_modify(|c| c.content = body.to_string())
            .or_insert_with(|| StoryContent {
                id: Some(ObjectId::new()),
                story_id: id,
                content: body.to_string(),
            });

        // Content is already written; a failure here only leaves the
        // timestamp stale.
        state.check("touch_updated_at")?;
        if let Some(details) = state.details.get_mut(&id) {
            details.updated_at = Utc::now();
        }
        Ok(true)
    }

    async fn delete(&self, id: ObjectId) -> Result<bool, StoreError> {
        let mut state = self.lock();
        state.check("delete")?;
        if state.details.remove(&id).is_none() {
            return Err(StoreError::story_not_found(id));
        }
        if state.contents.remove(&id).is_none() {
            tracing::debug!(story_id = %id, "Story had no content row to delete");
        }
        Ok(true)
    }

    async fn delete_all_by_owner(&self, owner_id: ObjectId) -> Result<bool, StoreError> {
        let mut state = self.lock();
        state.check("delete_all_by_owner")?;
        let ids: Vec<ObjectId> = state
            .details
            .values()
            .filter(|d| d.owner_id == owner_id)
            .map(|d| d.id)
            .collect();
        for id in &ids {
            state.details.remove(id);
            state.contents.remove(id);
        }
        Ok(true)
    }

    async fn get_collaborators(&self, id: ObjectId) -> Result<Vec<ObjectId>, StoreError> {
        let state = self.lock();
        state.check("get_collaborators")?;
        state
            .details
            .get(&id)
            .map(|d| d.collaborators.clone())
            .ok_or_else(|| StoreError::story_not_found(id))
    }

    async fn add_collaborator(
        &self,
        id: ObjectId,
        user_id: ObjectId,
    ) -> Result<StoryDetails, StoreError> {
        let mut state = self.lock();
        state.check("add_collaborator")?;
        let details = state
            .details
            .get_mut(&id)
            .ok_or_else(|| StoreError::story_not_found(id))?;
        if !details.collaborators.contains(&user_id) {
            details.collaborators.push(user_id);
        }
        details.updated_at = Utc::now();
        Ok(details.clone())
    }

    async fn remove_collaborator(
        &self,
        id: ObjectId,
        user_id: ObjectId,
    ) -> Result<bool, StoreError> {
        let mut state = self.lock();
        state.check("remove_collaborator")?;
        let details = state
            .details
            .get_mut(&id)
            .ok_or_else(|| StoreError::story_not_found(id))?;
        let before = details.collaborators.len();
        details.collaborators.retain(|c| *c != user_id);
        if details.collaborators.len() == before {
            return Ok(false);
        }
        details.updated_at = Utc::now();
        Ok(true)
    }

    async fn find_fork(
        &self,
        source_id: ObjectId,
        owner_id: ObjectId,
    ) -> Result<Option<StoryDetails>, StoreError> {
        let state = self.lock();
        state.check("find_fork")?;
        Ok(state
            .details
            .values()
            .find(|d| d.forked_from == Some(source_id) && d.owner_id == owner_id)
            .cloned())
    }

    async fn insert_content(&self, story_id: ObjectId, body: &str) -> Result<ObjectId, StoreError> {
        let mut state = self.lock();
        state.check("insert_content")?;
        if state.contents.contains_key(&story_id) {
            return Err(StoreError::Unavailable(format!(
                "content for story {story_id} already exists"
            )));
        }
        let id = ObjectId::new();
        state.contents.insert(
            story_id,
            StoryContent {
                id: Some(id),
                story_id,
                content: body.to_string(),
            },
        );
        Ok(id)
    }

    async fn distinct_owners(&self) -> Result<Vec<ObjectId>, StoreError> {
        let state = self.lock();
        state.check("distinct_owners")?;
        let owners: HashSet<ObjectId> = state.details.values().map(|d| d.owner_id).collect();
        let mut owners: Vec<ObjectId> = owners.into_iter().collect();
        owners.sort();
        Ok(owners)
    }

    async fn story_ids_by_owners(&self, owners: &[ObjectId]) -> Result<Vec<ObjectId>, StoreError> {
        let state = self.lock();
        state.check("story_ids_by_owners")?;
        Ok(state
            .details
            .values()
            .filter(|d| owners.contains(&d.owner_id))
            .map(|d| d.id)
            .collect())
    }

    async fn delete_details_by_owners(&self, owners: &[ObjectId]) -> Result<u64, StoreError> {
        let mut state = self.lock();
        state.check("delete_details_by_owners")?;
        let before = state.details.len();
        state.details.retain(|_, d| !owners.contains(&d.owner_id));
        Ok((before - state.details.len()) as u64)
    }

    async fn delete_content_by_story_ids(&self, story_ids: &[ObjectId]) -> Result<u64, StoreError> {
        let mut state = self.lock();
        state.check("delete_content_by_story_ids")?;
        let before = state.contents.len();
        state.contents.retain(|story_id, _| !story_ids.contains(story_id));
        Ok((before - state.contents.len()) as u64)
    }

    async fn pull_collaborators(&self, users: &[ObjectId]) -> Result<u64, StoreError> {
        let mut state = self.lock();
        state.check("pull_collaborators")?;
        let mut touched = 0;
        for details in state.details.values_mut() {
            let before = details.collaborators.len();
            details.collaborators.retain(|c| !users.contains(c));
            if details.collaborators.len() != before {
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().check("ping")
    }
}
