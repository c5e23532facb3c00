use std::time::Duration;

use storyhub_core::types::{ObjectId, ObjectIdError};

/// Errors surfaced by [`crate::repositories::StoryRepository`] implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: ObjectId },

    /// A fork of `source_id` owned by `owner_id` already exists.
    #[error("story {source_id} has already been forked by user {owner_id}")]
    DuplicateFork {
        source_id: ObjectId,
        owner_id: ObjectId,
    },

    #[error("storage operation timed out after {0:?}")]
    Timeout(Duration),

    /// A stored row could not be mapped back into a model (e.g. a bad id).
    #[error("malformed row: {0}")]
    MalformedRow(String),

    /// The backing store refused the operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn story_not_found(id: ObjectId) -> Self {
        Self::NotFound { entity: "Story", id }
    }
}

impl From<ObjectIdError> for StoreError {
    fn from(err: ObjectIdError) -> Self {
        Self::MalformedRow(err.to_string())
    }
}
