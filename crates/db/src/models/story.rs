//! Story metadata and content models.

use serde::{Deserialize, Serialize};
use storyhub_core::types::{ObjectId, Timestamp};
use validator::Validate;

// ---------------------------------------------------------------------------
// StoryDetails
// ---------------------------------------------------------------------------

/// A row from the `story_details` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoryDetails {
    pub id: ObjectId,
    pub title: String,
    pub genre: String,
    pub description: String,
    pub owner_id: ObjectId,
    /// Ordered; duplicates are not removed at this layer.
    pub collaborators: Vec<ObjectId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Source story of a fork. Never updated once set and may dangle after the
    /// source is deleted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forked_from: Option<ObjectId>,
}

/// Repository input for inserting a story. Id and timestamps are assigned on
/// insert.
#[derive(Debug, Clone)]
pub struct NewStory {
    pub title: String,
    pub genre: String,
    pub description: String,
    pub owner_id: ObjectId,
    pub collaborators: Vec<ObjectId>,
    pub forked_from: Option<ObjectId>,
}

impl NewStory {
    /// Metadata for a fork of `source` owned by `forker`.
    ///
    /// Title, genre, and description are copied verbatim; collaborators are
    /// not carried over.
    pub fn fork_of(source: &StoryDetails, forker: ObjectId) -> Self {
        Self {
            title: source.title.clone(),
            genre: source.genre.clone(),
            description: source.description.clone(),
            owner_id: forker,
            collaborators: Vec::new(),
            forked_from: Some(source.id),
        }
    }
}

/// DTO for creating a story. The owner is always the authenticated caller.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStory {
    #[validate(length(min = 3, max = 100))]
    pub title: String,
    #[validate(length(min = 3, max = 100))]
    pub genre: String,
    #[validate(length(min = 10, max = 500))]
    pub description: String,
    #[serde(default)]
    pub collaborators: Vec<ObjectId>,
}

impl CreateStory {
    pub fn into_new_story(self, owner_id: ObjectId) -> NewStory {
        NewStory {
            title: self.title,
            genre: self.genre,
            description: self.description,
            owner_id,
            collaborators: self.collaborators,
            forked_from: None,
        }
    }
}

// ---------------------------------------------------------------------------
// StoryContent
// ---------------------------------------------------------------------------

/// A row from the `story_content` table.
///
/// `id` is `None` when the story exists but has never been edited; the body
/// is then empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoryContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub story_id: ObjectId,
    pub content: String,
}

impl StoryContent {
    /// Placeholder for a story whose content has not been written yet.
    pub fn empty(story_id: ObjectId) -> Self {
        Self {
            id: None,
            story_id,
            content: String::new(),
        }
    }
}

/// DTO for replacing a story's body text.
#[derive(Debug, Deserialize)]
pub struct EditContent {
    pub content: String,
}

/// DTO for adding a collaborator to a story.
#[derive(Debug, Deserialize)]
pub struct AddCollaborator {
    pub user_id: ObjectId,
}
